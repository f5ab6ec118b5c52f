//! Engine executor
//!
//! Finds the ErgoAI launcher and drives it as a child process, either with a
//! single inline command or as a stdin-fed session. Every invocation is a
//! fresh process whose lifetime is bounded by a wall-clock deadline.

pub mod capture;
pub mod lifecycle;
pub mod process;
pub mod resolver;

pub use capture::{CapturedStream, StreamCapture};
pub use lifecycle::{Lifecycle, ProcessState};
pub use process::{
    launch_args, session_script, EngineRunner, ProcessRunner, RunOptions, EVAL_FLAG,
    HALT_DIRECTIVE, NOPROMPT_FLAG,
};
pub use resolver::{well_known_paths, ExecutableResolver, EXECUTABLE_NAME};
