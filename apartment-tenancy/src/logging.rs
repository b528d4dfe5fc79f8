//! Logging setup
//!
//! All crates in the workspace log through `tracing`. Applications that do not
//! install their own subscriber can call [`init_tracing`].

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "APARTMENT_LOG";

/// Install a fmt subscriber filtered by `APARTMENT_LOG`, then `RUST_LOG`,
/// then `info`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    init_with_filter(filter)
}

/// Install a fmt subscriber with an explicit filter directive (e.g. `"apartment_tenancy=debug"`).
pub fn init_tracing_with_level(directive: &str) -> bool {
    init_with_filter(EnvFilter::new(directive))
}

fn init_with_filter(filter: EnvFilter) -> bool {
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_tracing_with_level("apartment_tenancy=debug");
        assert!(!init_tracing());
    }
}
