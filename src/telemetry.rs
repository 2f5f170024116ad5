//! Logging initialization (SPEC_FULL.md §6b).

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Initializes the global tracing subscriber. `env_filter` is typically
/// sourced from `RUST_LOG`; `json` switches between the pretty dev formatter
/// and the structured formatter used in production.
pub fn initialize(env_filter: &str, json: bool) {
    let filter = EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = Registry::default().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
            .try_init()
    }
    .expect("tracing subscriber already initialized");
}
