use crate::error::{Error, Result};
use crate::frequency::{top_n, RankedByte};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Floor applied to elapsed time before computing throughput
pub const MIN_ELAPSED_SECS: f64 = 0.001;

const BANNER: &str = "=============================================";

/// Characters per second over the given elapsed time
pub fn throughput(chars: usize, elapsed_secs: f64) -> f64 {
    chars as f64 / elapsed_secs.max(MIN_ELAPSED_SECS)
}

/// How a session came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    Elapsed,
    StopWord,
}

/// Snapshot taken at an interval boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalReport {
    /// 1-based interval number
    pub index: usize,
    pub elapsed_secs: f64,
    pub chars: usize,
    pub session_chars: usize,
    /// Session-wide characters per second
    pub throughput: f64,
    pub top: Vec<RankedByte>,
}

impl IntervalReport {
    pub fn new(
        index: usize,
        interval: &[u8],
        session: &[u8],
        elapsed_secs: f64,
        top: usize,
    ) -> Self {
        Self {
            index,
            elapsed_secs,
            chars: interval.len(),
            session_chars: session.len(),
            throughput: throughput(session.len(), elapsed_secs),
            top: top_n(interval, top),
        }
    }
}

/// Snapshot taken once the session is over
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Local>,
    pub elapsed_secs: f64,
    pub chars: usize,
    pub throughput: f64,
    pub top: Vec<RankedByte>,
    pub ended_by: SessionEnd,
}

impl SessionReport {
    pub fn new(
        started_at: DateTime<Local>,
        session: &[u8],
        elapsed_secs: f64,
        top: usize,
        ended_by: SessionEnd,
    ) -> Self {
        Self {
            started_at,
            elapsed_secs,
            chars: session.len(),
            throughput: throughput(session.len(), elapsed_secs),
            top: top_n(session, top),
            ended_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Interval(IntervalReport),
    Session(SessionReport),
}

/// Destination for boundary reports
pub trait ReportSink {
    fn publish(&mut self, report: Report) -> Result<()>;
}

impl ReportSink for Vec<Report> {
    fn publish(&mut self, report: Report) -> Result<()> {
        self.push(report);
        Ok(())
    }
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn publish(&mut self, report: Report) -> Result<()> {
        (**self).publish(report)
    }
}

#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn sink<W: Write + 'static>(self, out: W) -> Box<dyn ReportSink> {
        match self {
            ReportFormat::Text => Box::new(TextReporter::new(out)),
            ReportFormat::Json => Box::new(JsonReporter::new(out)),
        }
    }
}

/// Console layout: banner, throughput, count and the ranking
pub struct TextReporter<W: Write> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_interval(&mut self, r: &IntervalReport) -> std::io::Result<()> {
        writeln!(self.out, "\n{BANNER}")?;
        writeln!(
            self.out,
            "Typing speed of the session is: {:.3} characters/sec",
            r.throughput
        )?;
        writeln!(self.out, "Interval statistics:")?;
        writeln!(self.out, "\nCharacter count:  {}", r.chars)?;
        self.write_ranking(&r.top)?;
        writeln!(self.out, "{BANNER}")
    }

    fn write_session(&mut self, r: &SessionReport) -> std::io::Result<()> {
        writeln!(self.out, "\n{BANNER}")?;
        writeln!(self.out, "Session statistics:")?;
        writeln!(self.out, "\nCharacter count:  {}", r.chars)?;
        writeln!(
            self.out,
            "\nTyping speed of the session is: {:.3} characters/sec",
            r.throughput
        )?;
        self.write_ranking(&r.top)?;
        writeln!(self.out, "{BANNER}")
    }

    fn write_ranking(&mut self, top: &[RankedByte]) -> std::io::Result<()> {
        writeln!(
            self.out,
            "\nTop {} most frequent characters ranked in descending order: ",
            top.len()
        )?;
        for entry in top {
            write!(self.out, "Top  {} : ", entry.rank)?;
            // literal byte, not a decoded char
            self.out.write_all(&[entry.byte])?;
            writeln!(self.out, " | counted : {}  times", entry.count)?;
        }
        Ok(())
    }
}

impl<W: Write> ReportSink for TextReporter<W> {
    fn publish(&mut self, report: Report) -> Result<()> {
        match &report {
            Report::Interval(r) => self.write_interval(r),
            Report::Session(r) => self.write_session(r),
        }
        .and_then(|_| self.out.flush())
        .map_err(Error::Output)
    }
}

/// One JSON object per line
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonReporter<W> {
    fn publish(&mut self, report: Report) -> Result<()> {
        serde_json::to_writer(&mut self.out, &report)?;
        writeln!(self.out).map_err(Error::Output)?;
        self.out.flush().map_err(Error::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval_report() -> IntervalReport {
        IntervalReport::new(1, b"aab", b"xxaab", 2.0, 3)
    }

    #[test]
    fn test_throughput() {
        assert_eq!(throughput(10, 2.0), 5.0);
        assert_eq!(throughput(0, 2.0), 0.0);
    }

    #[test]
    fn test_throughput_floors_elapsed() {
        assert_eq!(throughput(1, 0.0), 1000.0);
        assert!(throughput(5, -1.0).is_finite());
    }

    #[test]
    fn test_interval_report_uses_session_for_throughput() {
        let r = interval_report();
        assert_eq!(r.chars, 3);
        assert_eq!(r.session_chars, 5);
        assert_eq!(r.throughput, 2.5);
        assert_eq!(r.top[0], RankedByte { rank: 1, byte: b'a', count: 2 });
        assert_eq!(r.top[1], RankedByte { rank: 2, byte: b'b', count: 1 });
        assert_eq!(r.top[2].count, 0);
    }

    #[test]
    fn test_text_interval_layout() {
        let mut reporter = TextReporter::new(Vec::new());
        reporter.publish(Report::Interval(interval_report())).unwrap();
        let out = String::from_utf8_lossy(&reporter.into_inner()).to_string();

        let expected = "\n=============================================\n\
            Typing speed of the session is: 2.500 characters/sec\n\
            Interval statistics:\n\
            \n\
            Character count:  3\n\
            \n\
            Top 3 most frequent characters ranked in descending order: \n\
            Top  1 : a | counted : 2  times\n\
            Top  2 : b | counted : 1  times\n\
            Top  3 : \0 | counted : 0  times\n\
            =============================================\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_text_session_layout() {
        let report = SessionReport::new(Local::now(), b"zz", 4.0, 1, SessionEnd::Elapsed);
        let mut reporter = TextReporter::new(Vec::new());
        reporter.publish(Report::Session(report)).unwrap();
        let out = String::from_utf8(reporter.into_inner()).unwrap();

        assert!(out.contains("Session statistics:\n"));
        assert!(out.contains("\nCharacter count:  2\n"));
        assert!(out.contains("\nTyping speed of the session is: 0.500 characters/sec\n"));
        assert!(out.contains("Top 1 most frequent characters"));
        assert!(out.contains("Top  1 : z | counted : 2  times\n"));
    }

    #[test]
    fn test_json_reporter_writes_one_line_per_report() {
        let mut reporter = JsonReporter::new(Vec::new());
        reporter.publish(Report::Interval(interval_report())).unwrap();
        reporter
            .publish(Report::Session(SessionReport::new(
                Local::now(),
                b"xxaab",
                2.0,
                3,
                SessionEnd::StopWord,
            )))
            .unwrap();
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "interval");
        assert_eq!(first["chars"], 3);
        assert_eq!(first["top"][0]["byte"], b'a');

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "session");
        assert_eq!(second["ended_by"], "stop_word");
        assert_eq!(second["top"][0]["byte"], b'x');
    }

    #[test]
    fn test_report_format_display() {
        assert_eq!(ReportFormat::Text.to_string(), "text");
        assert_eq!(ReportFormat::Json.to_string(), "json");
    }
}
