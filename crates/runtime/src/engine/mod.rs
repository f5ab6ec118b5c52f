//! Operation orchestrators
//!
//! Each operation validates its request, builds the engine commands, runs
//! them through an [`EngineRunner`] and classifies what came back:
//!
//! - query: one goal, single-shot
//! - file load: load a source file then run optional queries, as a session
//! - inline code: write code to a temporary file and load it, as a session
//! - syntax check: compile a temporary file without loading it, single-shot
//! - help: raw help text, single-shot

pub mod artifact;
pub mod directive;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::classifier::{classify, ClassifiedOutput};
use crate::config::{Config, TimeoutConfig};
use crate::executor::{EngineRunner, ProcessRunner};
use crate::types::{
    EngineError, ExecutionError, ExecutionRequest, ExecutionResult, ModuleName, RequestError,
};

pub use artifact::{ArtifactKind, TemporaryArtifact};

/// Returned by help when the engine printed nothing.
pub const NO_HELP_TEXT: &str = "No help available";

#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: String,
    pub module: Option<String>,
    pub timeout_ms: Option<u64>,
    pub working_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct FileRequest {
    /// Absolute, or relative to the working directory
    pub file_path: String,
    pub module: Option<String>,
    pub queries: Vec<String>,
    pub timeout_ms: Option<u64>,
    /// Defaults to the directory containing the file
    pub working_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct CodeRequest {
    pub code: String,
    pub module: Option<String>,
    pub timeout_ms: Option<u64>,
    pub working_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxRequest {
    pub code: String,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct HelpRequest {
    pub topic: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub success: bool,
    /// The normalized query, before module qualification
    pub query: String,
    pub module: String,
    #[serde(flatten)]
    pub output: ClassifiedOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub success: bool,
    /// Absolute path of the loaded file
    pub file: String,
    pub module: String,
    pub queries_executed: Vec<String>,
    #[serde(flatten)]
    pub output: ClassifiedOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeOutcome {
    pub success: bool,
    pub module: String,
    #[serde(flatten)]
    pub output: ClassifiedOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxOutcome {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub raw_output: String,
}

/// Composes executable resolution, process running and classification.
#[derive(Clone)]
pub struct ErgoEngine {
    runner: Arc<dyn EngineRunner>,
    timeouts: TimeoutConfig,
    artifact_dir: PathBuf,
}

impl ErgoEngine {
    pub fn new(runner: Arc<dyn EngineRunner>, timeouts: TimeoutConfig) -> Self {
        Self {
            runner,
            timeouts,
            artifact_dir: std::env::temp_dir(),
        }
    }

    /// Engine backed by real processes.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ProcessRunner::from_config(config)),
            config.timeouts.clone(),
        )
    }

    /// Directory for temporary source files; the platform temp dir by default.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// Run one query, single-shot.
    pub async fn run_query(&self, request: QueryRequest) -> Result<QueryOutcome, EngineError> {
        let query = required(&request.query, "Query is required")?;
        let module = ModuleName::from_option(request.module.as_deref());
        let clean = directive::normalize_query(query);
        let command = directive::with_halt(&directive::qualify(&clean, &module));

        tracing::info!(%module, "Running ErgoAI query");
        let execution = ExecutionRequest::single(command)
            .with_timeout(self.timeouts.resolve(request.timeout_ms, self.timeouts.query_ms))
            .with_working_dir(request.working_directory);
        let result = self.runner.run(&execution).await?;
        let output = classify(&result.combined_output());

        Ok(QueryOutcome {
            success: succeeded(&result, &output),
            query: clean,
            module: module.to_string(),
            output,
        })
    }

    /// Load a file, then run `queries` in the same session.
    pub async fn run_file(&self, request: FileRequest) -> Result<FileOutcome, EngineError> {
        let file_path = required(&request.file_path, "file_path is required")?;
        let module = ModuleName::from_option(request.module.as_deref());

        let cwd = std::env::current_dir().map_err(|e| ExecutionError::Io(e.to_string()))?;
        let base = anchor_working_dir(&cwd, request.working_directory.as_deref());
        let absolute = resolve_file(&base, Path::new(file_path));
        if !tokio::fs::try_exists(&absolute).await.unwrap_or(false) {
            return Err(RequestError::FileNotFound(absolute).into());
        }

        let file_dir = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base.clone());
        let working_dir = match request.working_directory {
            Some(_) => base,
            None => file_dir.clone(),
        };

        // The basename only resolves when the engine runs in the file's directory.
        let load_target = match absolute.file_name() {
            Some(name) if working_dir == file_dir => name.to_string_lossy().into_owned(),
            _ => absolute.to_string_lossy().into_owned(),
        };

        let mut commands = vec![directive::load_directive(&load_target, &module)];
        commands.extend(
            request
                .queries
                .iter()
                .filter(|q| !q.trim().is_empty())
                .map(|q| directive::module_query(q, &module)),
        );

        tracing::info!(file = %absolute.display(), %module, queries = request.queries.len(), "Loading ErgoAI file");
        let execution = ExecutionRequest::session(commands)
            .with_timeout(self.timeouts.resolve(request.timeout_ms, self.timeouts.session_ms))
            .with_working_dir(Some(working_dir));
        let result = self.runner.run(&execution).await?;
        let output = classify(&result.combined_output());

        Ok(FileOutcome {
            success: succeeded(&result, &output),
            file: absolute.to_string_lossy().into_owned(),
            module: module.to_string(),
            queries_executed: request.queries,
            output,
        })
    }

    /// Load inline code from a temporary file, as a session.
    pub async fn run_code(&self, request: CodeRequest) -> Result<CodeOutcome, EngineError> {
        let code = required(&request.code, "code is required")?;
        let module = ModuleName::from_option(request.module.as_deref());

        // Dropped on every exit path, which removes the file.
        let artifact =
            TemporaryArtifact::create_in(&self.artifact_dir, ArtifactKind::InlineCode, code)?;
        let commands = vec![directive::load_directive(&artifact.path_text(), &module)];

        tracing::info!(%module, "Running inline ErgoAI code");
        let execution = ExecutionRequest::session(commands)
            .with_timeout(self.timeouts.resolve(request.timeout_ms, self.timeouts.session_ms))
            .with_working_dir(request.working_directory);
        let result = self.runner.run(&execution).await?;
        let output = classify(&result.combined_output());

        Ok(CodeOutcome {
            success: succeeded(&result, &output),
            module: module.to_string(),
            output,
        })
    }

    /// Compile code without loading it and report whether it is valid.
    pub async fn check_syntax(&self, request: SyntaxRequest) -> Result<SyntaxOutcome, EngineError> {
        let code = required(&request.code, "code is required")?;

        let artifact =
            TemporaryArtifact::create_in(&self.artifact_dir, ArtifactKind::SyntaxCheck, code)?;
        let command = directive::with_halt(&directive::compile_directive(&artifact.path_text()));

        tracing::info!("Checking ErgoAI syntax");
        let execution = ExecutionRequest::single(command).with_timeout(
            self.timeouts
                .resolve(request.timeout_ms, self.timeouts.syntax_check_ms),
        );
        let result = self.runner.run(&execution).await?;
        let output = classify(&result.combined_output());

        Ok(SyntaxOutcome {
            valid: !output.has_syntax_errors(),
            warnings: output.warnings,
            errors: output.errors,
            raw_output: output.raw,
        })
    }

    /// Raw help text, unclassified.
    pub async fn help(&self, request: HelpRequest) -> Result<String, EngineError> {
        let command = directive::with_halt(&directive::help_directive(request.topic.as_deref()));

        let execution = ExecutionRequest::single(command)
            .with_timeout(self.timeouts.resolve(request.timeout_ms, self.timeouts.help_ms));
        let result = self.runner.run(&execution).await?;

        Ok(if !result.stdout.is_empty() {
            result.stdout
        } else if !result.stderr.is_empty() {
            result.stderr
        } else {
            NO_HELP_TEXT.to_string()
        })
    }
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str, RequestError> {
    if value.trim().is_empty() {
        Err(RequestError::Validation(message.to_string()))
    } else {
        Ok(value)
    }
}

fn succeeded(result: &ExecutionResult, output: &ClassifiedOutput) -> bool {
    result.exit_code == 0 && !output.has_errors()
}

/// Absolute, normalized working directory: `dir` resolved against `cwd`, or
/// `cwd` itself when none was given.
fn anchor_working_dir(cwd: &Path, dir: Option<&Path>) -> PathBuf {
    match dir {
        Some(dir) => resolve_file(cwd, dir),
        None => cwd.to_path_buf(),
    }
}

/// Join onto `base` unless already absolute, then drop `.` and `..` lexically.
fn resolve_file(base: &Path, file: &Path) -> PathBuf {
    let joined = if file.is_absolute() {
        file.to_path_buf()
    } else {
        base.join(file)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}
