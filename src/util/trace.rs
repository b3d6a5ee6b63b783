//! Logging setup.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Filter variable consulted before `RUST_LOG`.
const LOG_ENV: &str = "ALEMBIC_POINTS_LOG";

/// Install a fmt subscriber filtered by `ALEMBIC_POINTS_LOG` (or `RUST_LOG`).
///
/// Defaults to `warn`, so degraded channels are visible without extra setup.
/// Returns false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false));

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
