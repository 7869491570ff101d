// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod insights;
pub mod metrics;
pub mod retry;
pub mod translate;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::error::ProviderError;
pub use crate::insights::{InsightAggregator, InsightRecord, Severity};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter; `LOG_FORMAT=json` switches to JSON lines. Safe to call twice (the
/// second call is a no-op).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("traffic_insights=info,tower_http=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

/// Build the full in-process app (API + `/metrics`) from a loaded config.
pub fn app_with_config(cfg: &AppConfig) -> anyhow::Result<axum::Router> {
    let metrics = metrics::Metrics::init(cfg.feed.fresh_window_secs)?;

    let insights =
        InsightAggregator::from_config(cfg).context("building insight aggregator")?;
    let translator = translate::SarvamTranslator::from_config(&cfg.translate)
        .context("building translator")?;

    let state = AppState {
        insights: Arc::new(insights),
        translator: Arc::new(translator),
    };
    Ok(router(state).merge(metrics.router()))
}

/// Load `.env` + config file and build the app.
pub async fn app() -> anyhow::Result<axum::Router> {
    let _ = dotenvy::dotenv();
    let cfg = AppConfig::load_default()?;
    app_with_config(&cfg)
}
