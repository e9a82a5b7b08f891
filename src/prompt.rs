//! Line-oriented prompts that run before a session starts.

use crate::config::{parse_secs, secs_to_duration};
use crate::error::{Error, Result};
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::debug;

pub const START_WORD: &str = "start";

fn say<W: Write>(out: &mut W, line: &str) -> Result<()> {
    writeln!(out, "{line}")
        .and_then(|_| out.flush())
        .map_err(Error::Output)
}

/// Read one line; end-of-stream is a failure, not an empty answer
fn read_line<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => Err(Error::StreamFailure(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "standard input closed",
        ))),
        Ok(_) => Ok(line),
        Err(e) => Err(Error::StreamFailure(e)),
    }
}

/// Ask for a duration in seconds, e.g. `label = "interval"`
pub fn read_duration<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &'static str,
) -> Result<Duration> {
    say(out, &format!("Input time of {label} in seconds:"))?;
    let line = read_line(input)?;
    parse_secs(label, &line)
}

/// Use a configured number of seconds, or ask for it when none was given
pub fn duration_or_prompt<R: BufRead, W: Write>(
    secs: Option<f64>,
    label: &'static str,
    input: &mut R,
    out: &mut W,
) -> Result<Duration> {
    match secs {
        Some(secs) => secs_to_duration(secs).ok_or_else(|| Error::MalformedConfiguration {
            field: label,
            value: secs.to_string(),
        }),
        None => read_duration(input, out, label),
    }
}

/// Block until the user enters exactly `start`
pub fn await_start<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<()> {
    loop {
        say(out, "Input 'start' to start session.")?;
        let line = read_line(input)?;
        let answer = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line.as_str());

        if answer == START_WORD {
            return Ok(());
        }
        debug!(input = answer, "rejected start input");
        say(out, "Input invalid: expected 'start'.")?;
    }
}
