//! Configuration management for the ErgoAI bridge
//!
//! Built-in defaults are layered with an optional TOML file and then with
//! environment variables. The binary applies its command-line flags last and
//! calls [`Config::validate`] before anything runs.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Installation root of ErgoAI (the directory holding `runergo`).
pub const INSTALL_ROOT_ENV: &str = "ERGOAI_PATH";
/// Explicit path to the engine launcher.
pub const EXECUTABLE_ENV: &str = "ERGO_MCP_EXECUTABLE";
/// Ceiling applied to every caller-supplied timeout.
pub const MAX_TIMEOUT_ENV: &str = "ERGO_MCP_MAX_TIMEOUT_MS";
pub const LOG_LEVEL_ENV: &str = "ERGO_MCP_LOG_LEVEL";

pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SYNTAX_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HELP_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 60_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("IO error reading config file: {message}")]
    IoError { message: String },

    #[error("Configuration parsing error: {message}")]
    ParseError { message: String },
}

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where to find the engine
    pub engine: EngineConfig,
    /// Per-operation deadlines
    pub timeouts: TimeoutConfig,
    /// Process handling
    pub execution: ExecutionConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Engine discovery settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit launcher path, used when it exists
    pub executable: Option<PathBuf>,
    /// Installation root, joined with the launcher file name
    pub install_root: Option<PathBuf>,
    /// Extra launcher candidates checked after the built-in install paths
    pub extra_search_paths: Vec<PathBuf>,
}

/// Deadlines in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub query_ms: u64,
    pub syntax_check_ms: u64,
    pub help_ms: u64,
    /// File loads and inline code
    pub session_ms: u64,
    pub max_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            query_ms: DEFAULT_QUERY_TIMEOUT_MS,
            syntax_check_ms: DEFAULT_SYNTAX_TIMEOUT_MS,
            help_ms: DEFAULT_HELP_TIMEOUT_MS,
            session_ms: DEFAULT_SESSION_TIMEOUT_MS,
            max_ms: MAX_TIMEOUT_MS,
        }
    }
}

impl TimeoutConfig {
    /// Turn a caller-supplied timeout into the deadline actually used.
    ///
    /// Absent or zero means `default_ms`; the result never exceeds `max_ms`.
    pub fn resolve(&self, requested_ms: Option<u64>, default_ms: u64) -> Duration {
        let ms = requested_ms.filter(|ms| *ms > 0).unwrap_or(default_ms);
        Duration::from_millis(ms.min(self.max_ms))
    }
}

/// What to do with an engine that outlives its deadline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPolicy {
    /// SIGTERM only; an engine that ignores it keeps running
    #[default]
    Graceful,
    /// SIGTERM, then SIGKILL once `kill_grace_ms` has passed
    Escalate,
}

/// Process handling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Per-stream capture limit before truncation
    pub max_output_bytes: usize,
    pub termination: TerminationPolicy,
    /// Grace period between SIGTERM and SIGKILL under `Escalate`
    pub kill_grace_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: 10 * 1024 * 1024, // 10 MB
            termination: TerminationPolicy::Graceful,
            kill_grace_ms: 2_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// Defaults, then the optional file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay the process environment onto this configuration.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| env::var(key).ok())
    }

    /// Overlay values from `lookup`; empty values are ignored.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(root) = lookup(INSTALL_ROOT_ENV) {
            self.engine.install_root = Some(PathBuf::from(root));
        }

        if let Some(executable) = lookup(EXECUTABLE_ENV) {
            self.engine.executable = Some(PathBuf::from(executable));
        }

        if let Some(max) = lookup(MAX_TIMEOUT_ENV) {
            self.timeouts.max_ms = max.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: MAX_TIMEOUT_ENV.to_string(),
                reason: "Expected a number of milliseconds".to_string(),
            })?;
        }

        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.logging.level = level.trim().to_lowercase();
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timeouts;
        if t.max_ms == 0 || t.max_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::InvalidValue {
                key: "timeouts.max_ms".to_string(),
                reason: format!("Must be between 1 and {}", MAX_TIMEOUT_MS),
            });
        }

        for (key, value) in [
            ("timeouts.query_ms", t.query_ms),
            ("timeouts.syntax_check_ms", t.syntax_check_ms),
            ("timeouts.help_ms", t.help_ms),
            ("timeouts.session_ms", t.session_ms),
        ] {
            if value == 0 || value > t.max_ms {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("Must be between 1 and {} (timeouts.max_ms)", t.max_ms),
                });
            }
        }

        if self.execution.max_output_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "execution.max_output_bytes".to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                reason: format!("Must be one of: {}", VALID_LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timeouts.query_ms, 30_000);
        assert_eq!(config.timeouts.help_ms, 15_000);
        assert_eq!(config.timeouts.session_ms, 60_000);
        assert_eq!(config.timeouts.max_ms, 300_000);
        assert_eq!(config.execution.termination, TerminationPolicy::Graceful);
        assert_eq!(config.logging.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_resolution() {
        let t = TimeoutConfig::default();
        assert_eq!(t.resolve(None, t.query_ms), Duration::from_millis(30_000));
        assert_eq!(t.resolve(Some(0), t.session_ms), Duration::from_millis(60_000));
        assert_eq!(t.resolve(Some(5_000), t.query_ms), Duration::from_millis(5_000));
        assert_eq!(
            t.resolve(Some(10_000_000), t.query_ms),
            Duration::from_millis(300_000)
        );
    }

    #[test]
    fn test_apply_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (INSTALL_ROOT_ENV, "/opt/ergo/ErgoAI"),
            (EXECUTABLE_ENV, ""),
            (MAX_TIMEOUT_ENV, "120000"),
            (LOG_LEVEL_ENV, "DEBUG"),
        ]);
        let mut config = Config::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.engine.install_root,
            Some(PathBuf::from("/opt/ergo/ErgoAI"))
        );
        assert_eq!(config.engine.executable, None);
        assert_eq!(config.timeouts.max_ms, 120_000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_apply_vars_rejects_bad_number() {
        let mut config = Config::default();
        let result = config.apply_vars(|key| {
            (key == MAX_TIMEOUT_ENV).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        env::set_var(INSTALL_ROOT_ENV, "/home/me/Coherent/ERGOAI/ErgoAI");
        env::set_var(LOG_LEVEL_ENV, "info");

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.engine.install_root,
            Some(PathBuf::from("/home/me/Coherent/ERGOAI/ErgoAI"))
        );
        assert_eq!(config.logging.level, "info");

        // Cleanup
        env::remove_var(INSTALL_ROOT_ENV);
        env::remove_var(LOG_LEVEL_ENV);
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[engine]
executable = "/opt/Coherent/ErgoAI/ErgoAI/runergo"

[timeouts]
query_ms = 5000

[execution]
termination = "escalate"
kill_grace_ms = 500
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(
            config.engine.executable,
            Some(PathBuf::from("/opt/Coherent/ErgoAI/ErgoAI/runergo"))
        );
        assert_eq!(config.timeouts.query_ms, 5_000);
        assert_eq!(config.timeouts.session_ms, 60_000);
        assert_eq!(config.execution.termination, TerminationPolicy::Escalate);
        assert_eq!(config.execution.kill_grace_ms, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timeouts\nquery_ms = ").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::ParseError { .. })
        ));
        assert!(matches!(
            Config::from_file("/definitely/not/here.toml"),
            Err(ConfigError::IoError { .. })
        ));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.timeouts.help_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timeouts.max_ms = 10_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timeouts.max_ms = 600_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.execution.max_output_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
