//! Tracing subscriber setup shared by the server binary and tools.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter` (e.g. `"parley_server=info"`).
/// With `log_json` every event is written as one JSON object per line.
///
/// Fails if a global subscriber is already installed or the filter does not
/// parse.
pub fn init_tracing(default_filter: &str, log_json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| Error::Config(format!("Invalid log filter {default_filter:?}: {e}")))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    installed.map_err(|e| Error::Config(format!("Tracing already initialised: {e}")))
}
