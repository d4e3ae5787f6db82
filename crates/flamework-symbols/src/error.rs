//! Error types for frontend operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FrontendError>;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("source file not part of the program: {0}")]
    UnknownFile(PathBuf),

    #[error("program update failed: {0}")]
    Program(String),
}
