use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Output always goes to stderr without ANSI colors: in `mcp` mode stdout is
/// the protocol channel. `RUST_LOG` wins over `level` when set.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Tests and repeated calls may already have a subscriber installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
