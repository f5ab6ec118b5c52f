//! ErgoAI engine runtime
//!
//! Locates the `runergo` launcher, runs it under a deadline in single-shot or
//! session mode, and turns its console output into structured results for
//! queries, file loads, inline code, syntax checks and help.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod executor;
pub mod types;

pub use classifier::{classify, ClassifiedOutput, LineClass};
pub use config::{Config, ConfigError, TimeoutConfig};
pub use engine::{
    CodeOutcome, CodeRequest, ErgoEngine, FileOutcome, FileRequest, HelpRequest, QueryOutcome,
    QueryRequest, SyntaxOutcome, SyntaxRequest,
};
pub use executor::{EngineRunner, ExecutableResolver, ProcessRunner, RunOptions};
pub use types::*;
