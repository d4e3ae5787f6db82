//! Configuration errors; all of them abort a session before compiling

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A well-known declaration the compiler depends on was not found
    #[error("required declaration `{name}` could not be resolved; is the runtime package installed?")]
    MissingSymbol { name: String },

    #[error("invalid compiler options: {reason}")]
    InvalidOptions { reason: String },
}
