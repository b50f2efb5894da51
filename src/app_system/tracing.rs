use tracing_subscriber::EnvFilter;

/// Installs the process-wide subscriber. `RUST_LOG` overrides the default
/// `info` filter.
pub fn setup_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .compact()
        .init();
}
