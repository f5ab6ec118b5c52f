use std::path::Path;

use anyhow::Context;
use ergo_runtime::{Config, ErgoEngine, SyntaxRequest};

/// Syntax-check a source file without loading it.
pub async fn run(config: &Config, file: &Path, timeout_ms: Option<u64>) -> anyhow::Result<()> {
    let code = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let engine = ErgoEngine::from_config(config);
    let outcome = engine
        .check_syntax(SyntaxRequest { code, timeout_ms })
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.valid {
        std::process::exit(1);
    }
    Ok(())
}
