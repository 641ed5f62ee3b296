//! Optional subscriber bootstrap for binaries and tests embedding the crate.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::AuthzError;

/// Installs a global fmt subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) -> Result<(), AuthzError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| AuthzError::Config(e.to_string()))?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .map_err(|e| AuthzError::Config(e.to_string()))
}
