use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is fatal to the session; callers propagate and exit.
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed {field} duration: {value:?} is not a positive number of seconds")]
    MalformedConfiguration { field: &'static str, value: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("input stream failure: {0}")]
    StreamFailure(#[source] io::Error),

    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),

    #[error("failed to encode report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to save config: {0}")]
    ConfigStore(#[source] io::Error),
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn is_stream_failure(&self) -> bool {
        matches!(self, Error::StreamFailure(_))
    }
}
