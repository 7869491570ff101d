// src/insights/feed.rs
//! Post feed: provider abstraction, the X recent-search provider, and the
//! fixed fallback set served when the provider is unavailable.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::config::FeedConfig;
use crate::error::ProviderError;
use crate::insights::types::RawPost;

pub const PLATFORM_X: &str = "X";

#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch the most recent incident-related posts, newest first as the
    /// provider orders them. An empty result is not an error.
    async fn fetch_recent(&self) -> Result<Vec<RawPost>, ProviderError>;
    fn name(&self) -> &'static str;
}

/// Current time in the `2025-01-01T08:30:00.000Z` shape.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode HTML entities (the search API escapes `&`, `<`, `>`), collapse
/// whitespace and trim.
pub fn normalize_post_text(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let decoded = html_escape::decode_html_entities(s);
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// Two illustrative posts with stable ids `"1"` and `"2"`.
pub fn fallback_posts() -> Vec<RawPost> {
    let ts = now_iso();
    vec![
        RawPost {
            id: "1".to_string(),
            text: "Massive accident on I-95, multiple lanes blocked!".to_string(),
            platform: PLATFORM_X.to_string(),
            timestamp: ts.clone(),
        },
        RawPost {
            id: "2".to_string(),
            text: "Traffic jam due to vehicle fire near Brooklyn Bridge.".to_string(),
            platform: PLATFORM_X.to_string(),
            timestamp: ts,
        },
    ]
}

// ------------------------------------------------------------
// X recent search
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Tweet>>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    #[serde(default)]
    created_at: Option<String>,
}

/// `GET {base}/2/tweets/search/recent` with a bearer token.
pub struct XRecentSearch {
    http: reqwest::Client,
    base_url: String,
    query: String,
    max_results: u32,
    bearer_token: Option<String>,
}

impl XRecentSearch {
    pub fn from_config(cfg: &FeedConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("traffic-insights/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(cfg.timeout().min(std::time::Duration::from_secs(4)))
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            query: cfg.query.clone(),
            max_results: cfg.max_results,
            bearer_token: cfg.bearer_token.clone(),
        })
    }

    fn parse_body(body: &[u8]) -> Result<Vec<RawPost>, ProviderError> {
        let t0 = std::time::Instant::now();
        let parsed: SearchResponse =
            serde_json::from_slice(body).map_err(|e| ProviderError::Malformed {
                provider: "x",
                detail: e.to_string(),
            })?;

        let out: Vec<RawPost> = parsed
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|t| RawPost {
                id: t.id,
                text: normalize_post_text(&t.text),
                platform: PLATFORM_X.to_string(),
                timestamp: t.created_at.unwrap_or_else(now_iso),
            })
            .collect();

        histogram!("insights_feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("insights_feed_posts_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl PostSource for XRecentSearch {
    async fn fetch_recent(&self) -> Result<Vec<RawPost>, ProviderError> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or(ProviderError::MissingCredentials { provider: "x" })?;

        let max_results = self.max_results.to_string();
        let resp = self
            .http
            .get(format!("{}/2/tweets/search/recent", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("query", self.query.as_str()),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at,author_id"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: "x",
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await?;
        Self::parse_body(&body)
    }

    fn name(&self) -> &'static str {
        "x"
    }
}
