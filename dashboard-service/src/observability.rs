use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` replaces the default directives.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,dashboard_service=info,monitor_client=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
