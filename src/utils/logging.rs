use tracing_subscriber::EnvFilter;

/// Map a configured level name onto a filter directive. Unknown names fall
/// back to `info`.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => "off",
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when it is set and parses; otherwise the configured
/// `log.level` (see `PUBTRIE__LOG__LEVEL`) applies to every target.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(default_level)));

    // try_init: tests and the CLI may call this more than once
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
