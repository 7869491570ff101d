//! Traffic insights service: binary entrypoint.
//! Boots the Axum HTTP server with the insight aggregator, translator and
//! metrics wired in.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    traffic_insights::init_tracing();

    let router = traffic_insights::app()
        .await
        .map_err(shuttle_runtime::Error::Custom)?;

    Ok(router.into())
}
