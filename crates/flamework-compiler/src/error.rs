//! Error types for compile sessions
//!
//! Diagnostics are not errors: a cycle that reports error diagnostics
//! still returns `Ok`. These variants are the failures that stop a
//! session.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use flamework_build::BuildError;
use flamework_symbols::FrontendError;
use flamework_transform::ConfigError;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Build state error: {0}")]
    Build(#[from] BuildError),

    #[error("Frontend error: {0}")]
    Frontend(#[from] FrontendError),

    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),
}
