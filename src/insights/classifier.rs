// src/insights/classifier.rs
//! Severity classifier: model abstraction, Gemini provider, fixed mock model,
//! and the prompt/verdict helpers shared by all of them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::error::ProviderError;
use crate::insights::types::Severity;

/// Low-level text model: one prompt in, free text out.
#[async_trait]
pub trait SeverityModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
    fn name(&self) -> &'static str;
}

/// Fixed prompt asking for exactly one verdict word.
pub fn severity_prompt(text: &str) -> String {
    format!(
        "Analyze the following social media post and classify the traffic severity as one of:\n\
         low, moderate, high, or critical.\n\
         Post: \"{text}\"\n\
         Return only one word (no explanation)."
    )
}

/// Trim, lowercase, keep the first word of the first non-empty line, drop
/// trailing punctuation (`"High.\n"` → `"high"`).
pub fn normalize_verdict(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// Normalize a model answer and map it onto the verdict vocabulary. Empty or
/// off-vocabulary answers are malformed payloads.
pub fn parse_verdict(provider: &'static str, raw: &str) -> Result<Severity, ProviderError> {
    let word = normalize_verdict(raw);
    if word.is_empty() {
        return Err(ProviderError::Malformed {
            provider,
            detail: "empty verdict".to_string(),
        });
    }
    word.parse::<Severity>()
        .map_err(|_| ProviderError::Malformed {
            provider,
            detail: format!("unexpected verdict '{word}'"),
        })
}

// ------------------------------------------------------------
// Gemini
// ------------------------------------------------------------

/// Gemini `generateContent`. Requires `GEMINI_API_KEY` (or `[classifier].api_key`).
pub struct GeminiModel {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiModel {
    pub fn from_config(cfg: &ClassifierConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("traffic-insights/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(cfg.timeout().min(std::time::Duration::from_secs(4)))
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[derive(Serialize)]
struct GenerateReq<'a> {
    contents: Vec<Content<'a>>,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}
#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}
#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl SeverityModel for GeminiModel {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials { provider: "gemini" })?;

        let req = GenerateReq {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: "gemini",
                status: status.as_u16(),
            });
        }

        let body: GenerateResp = resp.json().await.map_err(|e| ProviderError::Malformed {
            provider: "gemini",
            detail: e.to_string(),
        })?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::Malformed {
                provider: "gemini",
                detail: "no candidate text".to_string(),
            });
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Mock
// ------------------------------------------------------------

/// Always answers with the same verdict; used with `AI_TEST_MODE=mock`.
#[derive(Debug, Clone)]
pub struct FixedModel {
    pub verdict: Severity,
}

#[async_trait]
impl SeverityModel for FixedModel {
    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Ok(self.verdict.as_str().to_string())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
