use std::path::PathBuf;

use ergo_runtime::{Config, ErgoEngine, QueryRequest};

/// Run one query and print the structured payload.
pub async fn run(
    config: &Config,
    query: String,
    module: Option<String>,
    timeout_ms: Option<u64>,
    working_directory: Option<PathBuf>,
) -> anyhow::Result<()> {
    let engine = ErgoEngine::from_config(config);
    let outcome = engine
        .run_query(QueryRequest {
            query,
            module,
            timeout_ms,
            working_directory,
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
