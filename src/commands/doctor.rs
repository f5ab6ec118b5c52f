use std::time::Duration;

use ergo_runtime::engine::{ArtifactKind, TemporaryArtifact};
use ergo_runtime::executor::HALT_DIRECTIVE;
use ergo_runtime::{Config, ProcessRunner, RunOptions};

pub async fn run(config: &Config) {
    println!("🔍 Checking ErgoAI setup...\n");

    let mut all_ok = true;
    let runner = ProcessRunner::from_config(config);

    // Check executable
    print!("• Checking ErgoAI executable... ");
    let executable = match runner.resolver().resolve(None) {
        Ok(path) => {
            println!("✓ Found {}", path.display());
            Some(path)
        }
        Err(e) => {
            println!("✗ Not found");
            println!("  {}", e);
            for candidate in runner.resolver().candidates() {
                println!("  Searched: {}", candidate.display());
            }
            if let Some(root) = runner.resolver().install_root() {
                println!("  Searched install root: {}", root.display());
            }
            all_ok = false;
            None
        }
    };

    // Check the engine starts and halts
    if let Some(executable) = executable {
        print!("• Checking engine startup... ");
        let options = RunOptions {
            timeout: Some(Duration::from_millis(config.timeouts.help_ms)),
            working_dir: None,
            executable: Some(executable),
        };
        match runner.execute(HALT_DIRECTIVE, options).await {
            Ok(result) if result.succeeded() => {
                println!("✓ Engine exited cleanly in {} ms", result.execution_time_ms);
            }
            Ok(result) => {
                println!("✗ Engine exited with code {}", result.exit_code);
                if !result.stderr.is_empty() {
                    println!("  {}", result.stderr.lines().next().unwrap_or_default());
                }
                all_ok = false;
            }
            Err(e) => {
                println!("✗ {}", e);
                all_ok = false;
            }
        }
    }

    // Check temp directory
    print!("• Checking temp directory... ");
    let temp_dir = std::env::temp_dir();
    match TemporaryArtifact::create_in(&temp_dir, ArtifactKind::SyntaxCheck, "") {
        Ok(_) => println!("✓ {} is writable", temp_dir.display()),
        Err(e) => {
            println!("✗ {}", e);
            all_ok = false;
        }
    }

    let t = &config.timeouts;
    println!(
        "• Timeouts: query {} ms, syntax {} ms, help {} ms, session {} ms, max {} ms",
        t.query_ms, t.syntax_check_ms, t.help_ms, t.session_ms, t.max_ms
    );

    println!();
    if all_ok {
        println!("✅ All checks passed! Register `ergo-mcp mcp` with your MCP client");
    } else {
        println!("⚠️  Some checks failed. Set ERGOAI_PATH or pass --executable");
        std::process::exit(1);
    }
}
