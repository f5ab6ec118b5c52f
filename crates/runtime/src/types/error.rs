//! Error types for executable resolution, engine execution and request handling

use std::path::PathBuf;
use thiserror::Error;

use super::ExecutionMode;

/// Top-level error returned by the runners and orchestrators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Request(#[from] RequestError),
}

impl EngineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Timeout { .. }))
    }
}

/// The engine executable could not be located
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error(
        "ErgoAI executable not found. Please set the {env_var} environment variable \
         to the directory containing {executable} (e.g., /path/to/ErgoAI/ErgoAI), \
         or ensure {executable} is in your system PATH."
    )]
    NotFound { env_var: String, executable: String },
}

/// Failures while driving the engine process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("ErgoAI {mode} timed out after {timeout_ms}ms")]
    Timeout { mode: ExecutionMode, timeout_ms: u64 },

    #[error("Failed to spawn '{executable}': {message}")]
    Spawn { executable: String, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

/// Problems with the caller's request, raised before any process starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("{0}")]
    Validation(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to prepare temporary source file: {0}")]
    Artifact(String),
}
