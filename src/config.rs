use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};
use crate::stats::ReportFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STOP_WORD: &str = "stop";
pub const DEFAULT_TOP_N: usize = 3;
/// A ranking can hold at most one entry per byte value
pub const MAX_TOP_N: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub interval_secs: Option<f64>,
    pub session_secs: Option<f64>,
    pub stop_word: String,
    pub top_n: usize,
    pub format: ReportFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: None,
            session_secs: None,
            stop_word: DEFAULT_STOP_WORD.to_string(),
            top_n: DEFAULT_TOP_N,
            format: ReportFormat::Text,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

/// Parse a user-supplied number of seconds into a positive duration
pub fn parse_secs(field: &'static str, raw: &str) -> Result<Duration> {
    let malformed = || Error::MalformedConfiguration {
        field,
        value: raw.to_string(),
    };
    let secs: f64 = raw.trim().parse().map_err(|_| malformed())?;
    secs_to_duration(secs).ok_or_else(malformed)
}

/// Positive, finite seconds as a `Duration`
pub fn secs_to_duration(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// Validated, immutable parameters of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    interval: Duration,
    session: Duration,
    repetitions: usize,
    stop_word: Vec<u8>,
    top_n: usize,
}

impl SessionPlan {
    pub fn new(interval: Duration, session: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::invalid("interval duration must be greater than zero"));
        }
        if session < interval {
            return Err(Error::invalid(format!(
                "session duration ({:?}) must not be shorter than the interval ({:?})",
                session, interval
            )));
        }

        Ok(Self {
            interval,
            session,
            repetitions: repetition_count(interval, session),
            stop_word: DEFAULT_STOP_WORD.as_bytes().to_vec(),
            top_n: DEFAULT_TOP_N,
        })
    }

    pub fn with_stop_word(mut self, word: &str) -> Result<Self> {
        if word.is_empty() {
            return Err(Error::invalid("stop word must not be empty"));
        }
        self.stop_word = word.as_bytes().to_vec();
        Ok(self)
    }

    pub fn with_top_n(mut self, top_n: usize) -> Result<Self> {
        if top_n > MAX_TOP_N {
            return Err(Error::invalid(format!(
                "top must be at most {MAX_TOP_N}, got {top_n}"
            )));
        }
        self.top_n = top_n;
        Ok(self)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn session(&self) -> Duration {
        self.session
    }

    /// Number of interval iterations the scheduler attempts
    pub fn repetitions(&self) -> usize {
        self.repetitions
    }

    pub fn stop_word(&self) -> &[u8] {
        &self.stop_word
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }
}

/// `ceil(session / interval)` in whole nanoseconds
pub fn repetition_count(interval: Duration, session: Duration) -> usize {
    let interval = interval.as_nanos();
    let session = session.as_nanos();
    session.div_ceil(interval) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            interval_secs: Some(5.0),
            session_secs: Some(12.5),
            stop_word: "halt".into(),
            top_n: 5,
            format: ReportFormat::Json,
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn load_missing_or_garbage_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let missing = FileConfigStore::with_path(dir.path().join("nope.json"));
        assert_eq!(missing.load(), Config::default());

        let path = dir.path().join("bad.json");
        fs::write(&path, b"{not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn load_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, br#"{"interval_secs": 2}"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.interval_secs, Some(2.0));
        assert_eq!(cfg.stop_word, "stop");
        assert_eq!(cfg.top_n, 3);
    }

    #[test]
    fn test_repetition_count() {
        assert_eq!(repetition_count(secs(5), secs(12)), 3);
        assert_eq!(repetition_count(secs(4), secs(12)), 3);
        assert_eq!(repetition_count(secs(2), secs(5)), 3);
        assert_eq!(repetition_count(secs(5), secs(5)), 1);
        assert_eq!(
            repetition_count(Duration::from_millis(1500), Duration::from_millis(3001)),
            3
        );
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("interval", "5").unwrap(), secs(5));
        assert_eq!(parse_secs("interval", " 2.5\n").unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_parse_secs_rejects_garbage() {
        for raw in ["", "abc", "0", "-3", "NaN", "inf", "5s"] {
            assert_matches!(
                parse_secs("session", raw),
                Err(Error::MalformedConfiguration { field: "session", .. }),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn plan_rejects_zero_interval() {
        assert_matches!(
            SessionPlan::new(Duration::ZERO, secs(5)),
            Err(Error::InvalidConfiguration { .. })
        );
    }

    #[test]
    fn plan_rejects_session_shorter_than_interval() {
        assert_matches!(
            SessionPlan::new(secs(5), secs(4)),
            Err(Error::InvalidConfiguration { .. })
        );
    }

    #[test]
    fn plan_rejects_empty_stop_word() {
        let plan = SessionPlan::new(secs(1), secs(2)).unwrap();
        assert_matches!(plan.with_stop_word(""), Err(Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn plan_top_n_bounded_by_byte_values() {
        let plan = SessionPlan::new(secs(1), secs(2)).unwrap();
        assert_eq!(plan.clone().with_top_n(MAX_TOP_N).unwrap().top_n(), 256);
        assert_matches!(
            plan.clone().with_top_n(MAX_TOP_N + 1),
            Err(Error::InvalidConfiguration { .. })
        );
        assert_matches!(plan.with_top_n(usize::MAX), Err(Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn plan_defaults() {
        let plan = SessionPlan::new(secs(5), secs(12)).unwrap();
        assert_eq!(plan.repetitions(), 3);
        assert_eq!(plan.stop_word(), b"stop");
        assert_eq!(plan.top_n(), 3);
    }
}
