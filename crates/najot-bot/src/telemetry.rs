// najot-bot/src/telemetry.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparsable. Connection-level chatter
/// from the HTTP client stays at warn so chat turns remain readable.
pub const DEFAULT_FILTER: &str = "info,najot_bot=debug,tower_http=debug,hyper=warn,reqwest=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
