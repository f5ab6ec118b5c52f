//! Engine process runner
//!
//! Spawns the ErgoAI launcher in one of two modes: single-shot, where the
//! command travels as a `-e` argument, or session, where commands are written
//! to stdin followed by the halt directive. Both streams are captured into
//! separate buffers while the wall-clock deadline runs.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

use crate::config::{
    Config, ExecutionConfig, TerminationPolicy, DEFAULT_QUERY_TIMEOUT_MS,
    DEFAULT_SESSION_TIMEOUT_MS,
};
use crate::types::{
    CommandInput, EngineError, ExecutionError, ExecutionRequest, ExecutionResult,
};

use super::capture::{CapturedStream, StreamCapture};
use super::lifecycle::Lifecycle;
use super::resolver::ExecutableResolver;

/// Suppresses the interactive prompt in both modes.
pub const NOPROMPT_FLAG: &str = "--noprompt";
/// Evaluates the following argument as a command.
pub const EVAL_FLAG: &str = "-e";
/// Cleanly ends an engine session.
pub const HALT_DIRECTIVE: &str = "\\halt.";

/// Exit code reported when the exit status could not be collected.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// How long a signalled engine gets to be reaped under the graceful policy.
const REAP_WINDOW: Duration = Duration::from_millis(200);

/// Runs engine invocations.
///
/// [`ProcessRunner`] spawns real processes; tests substitute scripted runners.
#[async_trait]
pub trait EngineRunner: Send + Sync {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult, EngineError>;
}

/// Per-call options for [`ProcessRunner::execute`] and
/// [`ProcessRunner::execute_session`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Deadline; mode default when `None` or zero, clamped to the ceiling
    pub timeout: Option<Duration>,
    pub working_dir: Option<PathBuf>,
    pub executable: Option<PathBuf>,
}

/// Launch arguments for a request.
pub fn launch_args(input: &CommandInput) -> Vec<String> {
    match input {
        CommandInput::Single(command) => vec![
            NOPROMPT_FLAG.to_string(),
            EVAL_FLAG.to_string(),
            command.clone(),
        ],
        CommandInput::Session(_) => vec![NOPROMPT_FLAG.to_string()],
    }
}

/// Stdin contents for a session: one command per line, halt last.
pub fn session_script(commands: &[String]) -> String {
    let mut script = String::new();
    for command in commands {
        script.push_str(command);
        script.push('\n');
    }
    script.push_str(HALT_DIRECTIVE);
    script.push('\n');
    script
}

/// Spawns the engine as a child process for every request.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    resolver: ExecutableResolver,
    config: ExecutionConfig,
}

impl ProcessRunner {
    pub fn new(resolver: ExecutableResolver, config: ExecutionConfig) -> Self {
        Self { resolver, config }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ExecutableResolver::from_config(&config.engine),
            config.execution.clone(),
        )
    }

    pub fn resolver(&self) -> &ExecutableResolver {
        &self.resolver
    }

    /// Run one command passed as `--noprompt -e <command>`.
    pub async fn execute(
        &self,
        command: impl Into<String>,
        options: RunOptions,
    ) -> Result<ExecutionResult, EngineError> {
        let request = ExecutionRequest::single(command);
        self.run(&Self::apply(request, options, DEFAULT_QUERY_TIMEOUT_MS))
            .await
    }

    /// Feed `commands` to an interactive `--noprompt` session.
    pub async fn execute_session(
        &self,
        commands: Vec<String>,
        options: RunOptions,
    ) -> Result<ExecutionResult, EngineError> {
        let request = ExecutionRequest::session(commands);
        self.run(&Self::apply(request, options, DEFAULT_SESSION_TIMEOUT_MS))
            .await
    }

    fn apply(request: ExecutionRequest, options: RunOptions, default_ms: u64) -> ExecutionRequest {
        request
            .with_timeout(
                options
                    .timeout
                    .filter(|t| !t.is_zero())
                    .unwrap_or_else(|| Duration::from_millis(default_ms)),
            )
            .with_working_dir(options.working_dir)
            .with_executable(options.executable)
    }

    /// Spawn, feed, capture and wait, racing the request deadline.
    async fn spawn_and_monitor(
        &self,
        executable: &Path,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mode = request.mode();
        let args = launch_args(&request.input);
        let script = match &request.input {
            CommandInput::Session(commands) => Some(session_script(commands)),
            CommandInput::Single(_) => None,
        };

        let mut lifecycle = Lifecycle::new(executable.display().to_string());
        let mut command = build_command(executable, &args);
        if let Some(dir) = &request.working_dir {
            command.current_dir(dir);
        }
        command.stdin(if script.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        // Own process group so a termination signal reaches the engine behind
        // the launcher script too.
        #[cfg(unix)]
        command.process_group(0);

        tracing::debug!(
            executable = %executable.display(),
            ?args,
            %mode,
            timeout_ms = request.timeout.as_millis() as u64,
            "spawning engine"
        );

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                lifecycle.failed();
                tracing::error!("Failed to spawn '{}': {}", executable.display(), e);
                return Err(ExecutionError::Spawn {
                    executable: executable.display().to_string(),
                    message: e.to_string(),
                });
            }
        };
        lifecycle.spawned(child.id());

        let mut child_stdin = child.stdin.take();
        let mut child_stdout = child.stdout.take();
        let mut child_stderr = child.stderr.take();
        let capture = StreamCapture::new(self.config.max_output_bytes);

        let monitored = tokio::time::timeout(request.timeout, async {
            let feed = async {
                if let (Some(mut stdin), Some(script)) = (child_stdin.take(), script.as_deref()) {
                    if let Err(e) = stdin.write_all(script.as_bytes()).await {
                        tracing::debug!("Engine stopped reading stdin: {}", e);
                    }
                    // Dropping the handle closes stdin: end of input.
                }
            };

            let stdout = async {
                match child_stdout.as_mut() {
                    Some(out) => capture.collect(out).await,
                    None => CapturedStream::default(),
                }
            };

            let stderr = async {
                match child_stderr.as_mut() {
                    Some(err) => capture.collect(err).await,
                    None => CapturedStream::default(),
                }
            };

            let ((), stdout, stderr) = tokio::join!(feed, stdout, stderr);
            let status = child.wait().await;
            (stdout, stderr, status)
        })
        .await;

        match monitored {
            Ok((stdout, stderr, status)) => {
                let exit_code = match status {
                    Ok(status) => status.code().unwrap_or(0),
                    Err(e) => {
                        tracing::error!("Failed to wait on engine process: {}", e);
                        UNKNOWN_EXIT_CODE
                    }
                };
                lifecycle.exited(exit_code);

                if stdout.truncated || stderr.truncated {
                    tracing::warn!(
                        "Engine output truncated at {} bytes (stdout {} bytes, stderr {} bytes)",
                        self.config.max_output_bytes,
                        stdout.bytes_read,
                        stderr.bytes_read
                    );
                }

                Ok(ExecutionResult {
                    stdout: stdout.data.trim().to_string(),
                    stderr: stderr.data.trim().to_string(),
                    exit_code,
                    execution_time_ms: lifecycle.elapsed().as_millis() as u64,
                    stdout_truncated: stdout.truncated,
                    stderr_truncated: stderr.truncated,
                })
            }
            Err(_) => {
                lifecycle.terminating();
                tracing::warn!(
                    pid = ?lifecycle.pid(),
                    "ErgoAI {} exceeded {:?} for '{}', terminating",
                    mode,
                    request.timeout,
                    executable.display()
                );
                self.terminate(&mut child).await;
                lifecycle.timed_out();
                Err(ExecutionError::Timeout {
                    mode,
                    timeout_ms: request.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Signal a timed-out engine according to the termination policy.
    async fn terminate(&self, child: &mut Child) {
        send_graceful_signal(child);

        match self.config.termination {
            TerminationPolicy::Graceful => {
                // Reap promptly if it complied; never escalate.
                if tokio::time::timeout(REAP_WINDOW, child.wait()).await.is_err() {
                    tracing::warn!(
                        "Engine process {:?} did not exit after SIGTERM and may still be running",
                        child.id()
                    );
                }
            }
            TerminationPolicy::Escalate => {
                let grace = Duration::from_millis(self.config.kill_grace_ms);
                if tokio::time::timeout(grace, child.wait()).await.is_err() {
                    tracing::warn!(
                        "Engine process ignored SIGTERM for {:?}, killing",
                        grace
                    );
                    force_kill(child).await;
                }
            }
        }
    }
}

#[async_trait]
impl EngineRunner for ProcessRunner {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult, EngineError> {
        let executable = self.resolver.resolve(request.executable.as_deref())?;
        Ok(self.spawn_and_monitor(&executable, request).await?)
    }
}

#[cfg(windows)]
fn build_command(executable: &Path, args: &[String]) -> Command {
    // runergo.bat needs the command interpreter.
    let mut command = Command::new("cmd");
    command.arg("/C").arg(executable).args(args);
    command
}

#[cfg(not(windows))]
fn build_command(executable: &Path, args: &[String]) -> Command {
    let mut command = Command::new(executable);
    command.args(args);
    command
}

#[cfg(unix)]
fn send_graceful_signal(child: &mut Child) {
    if let Some(pid) = child.id() {
        // The child leads its own process group (process_group(0) above).
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            tracing::debug!(
                "SIGTERM to process group {} failed: {}",
                pid,
                std::io::Error::last_os_error()
            );
        }
    }
}

#[cfg(not(unix))]
fn send_graceful_signal(child: &mut Child) {
    // No graceful signal available; this is already a hard stop.
    if let Err(e) = child.start_kill() {
        tracing::debug!("Failed to stop engine process: {}", e);
    }
}

async fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                tracing::debug!(
                    "SIGKILL to process group {} failed: {}",
                    pid,
                    std::io::Error::last_os_error()
                );
            }
        }
    }
    if let Err(e) = child.kill().await {
        tracing::debug!("Failed to kill engine process: {}", e);
    }
}
