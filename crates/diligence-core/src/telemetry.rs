use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with an env-filter and a fmt layer.
///
/// Safe to call once per process; controlled by `RUST_LOG`.
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "diligence=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
