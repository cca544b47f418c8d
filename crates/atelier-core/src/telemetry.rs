use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with an env-filter and fmt layer.
///
/// Honors `RUST_LOG`; defaults to debug for atelier crates.
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "atelier=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
