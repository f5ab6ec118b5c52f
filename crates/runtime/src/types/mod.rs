//! Core types shared by the engine runners and the operation orchestrators

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{DEFAULT_QUERY_TIMEOUT_MS, DEFAULT_SESSION_TIMEOUT_MS, MAX_TIMEOUT_MS};

pub mod error;

pub use error::*;

/// Module every unqualified command runs against.
pub const DEFAULT_MODULE: &str = "main";

/// Namespace tag used to qualify commands and file loads inside the engine.
///
/// Blank names collapse to [`DEFAULT_MODULE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            Self::default()
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Build from an optional caller-supplied name.
    pub fn from_option(name: Option<&str>) -> Self {
        name.map(Self::new).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether commands against this module need no qualification.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_MODULE
    }
}

impl Default for ModuleName {
    fn default() -> Self {
        Self(DEFAULT_MODULE.to_string())
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the engine process is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One command passed on the command line with `-e`.
    SingleShot,
    /// Commands written to stdin, closed by a halt directive.
    Session,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleShot => f.write_str("execution"),
            Self::Session => f.write_str("session"),
        }
    }
}

/// Commands handed to the engine for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandInput {
    Single(String),
    Session(Vec<String>),
}

impl CommandInput {
    pub fn mode(&self) -> ExecutionMode {
        match self {
            Self::Single(_) => ExecutionMode::SingleShot,
            Self::Session(_) => ExecutionMode::Session,
        }
    }
}

/// One engine invocation. Built once, never mutated by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub input: CommandInput,
    /// Working directory for the child; `None` inherits ours.
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    /// Executable override, tried before any other lookup.
    pub executable: Option<PathBuf>,
}

impl ExecutionRequest {
    /// Single-shot request with the default 30s deadline.
    pub fn single(command: impl Into<String>) -> Self {
        Self {
            input: CommandInput::Single(command.into()),
            working_dir: None,
            timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
            executable: None,
        }
    }

    /// Session request with the default 60s deadline.
    pub fn session(commands: Vec<String>) -> Self {
        Self {
            input: CommandInput::Session(commands),
            working_dir: None,
            timeout: Duration::from_millis(DEFAULT_SESSION_TIMEOUT_MS),
            executable: None,
        }
    }

    /// Set the deadline, clamped to the hard ceiling.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(Duration::from_millis(MAX_TIMEOUT_MS));
        self
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_executable(mut self, executable: Option<PathBuf>) -> Self {
        self.executable = executable;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.input.mode()
    }
}

/// Captured outcome of one engine process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error
    pub stderr: String,
    /// Exit code; 0 when the process ended without reporting one
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds
    pub execution_time_ms: u64,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Both streams joined the way the classifier expects them.
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_defaults() {
        assert!(ModuleName::default().is_default());
        assert!(ModuleName::new("  ").is_default());
        assert!(ModuleName::from_option(None).is_default());
        assert_eq!(ModuleName::from_option(Some(" family ")).as_str(), "family");
        assert!(!ModuleName::new("family").is_default());
    }

    #[test]
    fn test_request_defaults_and_clamp() {
        let single = ExecutionRequest::single("foo.");
        assert_eq!(single.timeout, Duration::from_millis(30_000));
        assert_eq!(single.mode(), ExecutionMode::SingleShot);

        let session = ExecutionRequest::session(vec!["a.".into()])
            .with_timeout(Duration::from_secs(900));
        assert_eq!(session.timeout, Duration::from_millis(300_000));
        assert_eq!(session.mode(), ExecutionMode::Session);
    }

    #[test]
    fn test_combined_output() {
        let result = ExecutionResult {
            stdout: "Yes".into(),
            stderr: "".into(),
            ..Default::default()
        };
        assert_eq!(result.combined_output(), "Yes\n");
        assert!(result.succeeded());
    }
}
