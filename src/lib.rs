// Library surface for the binary and the integration tests.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod frequency;
pub mod logging;
pub mod prompt;
pub mod runtime;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
