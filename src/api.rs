use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use crate::insights::{InsightAggregator, InsightRecord};
use crate::translate::Translator;

/// Diagnostics header: where the served posts came from.
pub const INSIGHTS_SOURCE_HEADER: &str = "X-Insights-Source";

pub const NO_TRANSLATION: &str = "No translation found";

#[derive(Clone)]
pub struct AppState {
    pub insights: Arc<InsightAggregator>,
    pub translator: Arc<dyn Translator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/social-insights", get(social_insights))
        .route("/api/translate", post(translate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn social_insights(
    State(state): State<AppState>,
) -> (HeaderMap, Json<Vec<InsightRecord>>) {
    let batch = state.insights.get_insights().await;

    let mut headers = HeaderMap::new();
    headers.insert(
        INSIGHTS_SOURCE_HEADER,
        HeaderValue::from_static(batch.origin.as_str()),
    );
    info!(
        origin = batch.origin.as_str(),
        count = batch.records.len(),
        "served social insights"
    );
    (headers, Json(batch.records))
}

#[derive(Debug, Default, Deserialize)]
struct TranslateReq {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "targetLanguage")]
    target_language: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateResp {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

async fn translate(
    State(state): State<AppState>,
    body: Result<Json<TranslateReq>, JsonRejection>,
) -> axum::response::Response {
    // Missing, non-JSON or unparseable bodies are treated as empty.
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "translate body rejected");
            TranslateReq::default()
        }
    };
    let text = body.text.as_deref().map(str::trim).unwrap_or_default();
    let target = body
        .target_language
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if text.is_empty() || target.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "text and targetLanguage are required" })),
        )
            .into_response();
    }

    match state.translator.translate(text, target).await {
        Ok(out) => Json(TranslateResp {
            translated_text: out.unwrap_or_else(|| NO_TRANSLATION.to_string()),
        })
        .into_response(),
        Err(e) => {
            error!(
                provider = state.translator.name(),
                kind = e.kind(),
                error = %e,
                "translation failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Translation failed" })),
            )
                .into_response()
        }
    }
}
