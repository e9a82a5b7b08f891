use clap::Parser;
use std::{
    io::{self, BufReader},
    path::PathBuf,
    process::ExitCode,
};
use tracing::{error, info};
use typetally::{
    config::{Config, ConfigStore, FileConfigStore, SessionPlan},
    logging, prompt,
    session::run_session,
    stats::{ReportFormat, SessionEnd},
    Error, Result,
};

/// timed typing sessions with interval and session character statistics
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Collects typed words over a session split into fixed intervals and reports typing speed and the most frequent characters at every interval boundary and when the session ends."
)]
pub struct Cli {
    /// interval length in seconds (prompted for when not set here or in the config file)
    #[clap(short = 'i', long = "interval")]
    interval_secs: Option<f64>,

    /// session length in seconds (prompted for when not set here or in the config file)
    #[clap(short = 's', long = "session")]
    session_secs: Option<f64>,

    /// any word containing this text ends the session early
    #[clap(long)]
    stop_word: Option<String>,

    /// number of ranked characters in each report
    #[clap(short = 't', long = "top")]
    top_n: Option<usize>,

    /// report output format
    #[clap(short = 'f', long, value_enum)]
    format: Option<ReportFormat>,

    /// config file to read settings from
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// write the effective settings back to the config file before starting
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Flags take precedence over the config file
    fn merge(&self, file: Config) -> Config {
        Config {
            interval_secs: self.interval_secs.or(file.interval_secs),
            session_secs: self.session_secs.or(file.session_secs),
            stop_word: self.stop_word.clone().unwrap_or(file.stop_word),
            top_n: self.top_n.unwrap_or(file.top_n),
            format: self.format.unwrap_or(file.format),
        }
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging();

    match run(&cli) {
        Ok(end) => {
            info!(ended_by = %end, "session finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "session aborted");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<SessionEnd> {
    let store = cli.config_store();
    let config = cli.merge(store.load());
    if cli.save_config {
        store.save(&config).map_err(Error::ConfigStore)?;
        info!(path = %store.path().display(), "config saved");
    }

    // One buffered reader serves the prompts and then the input producer
    let mut input = BufReader::new(io::stdin());
    let mut stdout = io::stdout();

    let interval =
        prompt::duration_or_prompt(config.interval_secs, "interval", &mut input, &mut stdout)?;
    let session =
        prompt::duration_or_prompt(config.session_secs, "session", &mut input, &mut stdout)?;
    let plan = SessionPlan::new(interval, session)?
        .with_stop_word(&config.stop_word)?
        .with_top_n(config.top_n)?;

    let sink = config.format.sink(io::stdout());
    let (end, _) = run_session(plan, input, &mut stdout, sink)?;
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_flags_override_config_file() {
        let cli = Cli::try_parse_from(["typetally", "-i", "2", "--stop-word", "halt", "-f", "json"])
            .unwrap();
        let file = Config {
            interval_secs: Some(10.0),
            session_secs: Some(30.0),
            top_n: 5,
            ..Config::default()
        };
        let merged = cli.merge(file);

        assert_eq!(merged.interval_secs, Some(2.0));
        assert_eq!(merged.session_secs, Some(30.0));
        assert_eq!(merged.stop_word, "halt");
        assert_eq!(merged.top_n, 5);
        assert_eq!(merged.format, ReportFormat::Json);
    }

    #[test]
    fn test_cli_defaults_leave_durations_unset() {
        let cli = Cli::try_parse_from(["typetally"]).unwrap();
        let merged = cli.merge(Config::default());
        assert_eq!(merged, Config::default());
        assert!(!cli.save_config);
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["typetally", "--format", "xml"]).is_err());
    }
}
