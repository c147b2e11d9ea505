// src/telemetry.rs

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber for the host process.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. "info" or
/// "oidc_edge_gate=debug") is used. Fails if a global subscriber already exists.
pub fn init_tracing(
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directive))?;
    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}
