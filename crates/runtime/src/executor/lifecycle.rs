//! Engine process lifecycle
//!
//! ```text
//! Spawning ──> Running ──> Exited(code)
//!    │            │
//!    │            ├──> Terminating ──> TimedOut
//!    │            │
//!    └────────────┴──> Failed
//! ```

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Spawning,
    Running,
    /// Deadline passed; termination signal sent.
    Terminating,
    Exited(i32),
    TimedOut,
    Failed,
}

impl ProcessState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited(_) | Self::TimedOut | Self::Failed)
    }

    fn can_become(&self, next: ProcessState) -> bool {
        use ProcessState::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (*self, next),
            (Spawning, Running)
                | (Spawning, Failed)
                | (Running, Exited(_))
                | (Running, Terminating)
                | (Running, Failed)
                | (Terminating, TimedOut)
        )
    }
}

/// Tracks one engine process from spawn to its terminal state.
#[derive(Debug)]
pub struct Lifecycle {
    executable: String,
    state: ProcessState,
    pid: Option<u32>,
    started: Instant,
}

impl Lifecycle {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            state: ProcessState::Spawning,
            pid: None,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Time since the lifecycle was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn spawned(&mut self, pid: Option<u32>) {
        self.pid = pid;
        self.transition(ProcessState::Running);
    }

    pub fn exited(&mut self, code: i32) {
        self.transition(ProcessState::Exited(code));
    }

    pub fn terminating(&mut self) {
        self.transition(ProcessState::Terminating);
    }

    pub fn timed_out(&mut self) {
        self.transition(ProcessState::TimedOut);
    }

    pub fn failed(&mut self) {
        self.transition(ProcessState::Failed);
    }

    fn transition(&mut self, next: ProcessState) {
        debug_assert!(
            self.state.can_become(next),
            "invalid engine process transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(
            executable = %self.executable,
            pid = ?self.pid,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "engine process {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }
}
