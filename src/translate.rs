// src/translate.rs
//! UI text translation through the Sarvam translate API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TranslateConfig;
use crate::error::ProviderError;

#[async_trait]
pub trait Translator: Send + Sync {
    /// `Ok(None)` when the provider answered but had no translation.
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<Option<String>, ProviderError>;
    fn name(&self) -> &'static str;
}

/// `POST {base}/translate` with `api-subscription-key`; source language is
/// auto-detected.
pub struct SarvamTranslator {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SarvamTranslator {
    pub fn from_config(cfg: &TranslateConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("traffic-insights/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(cfg.timeout().min(std::time::Duration::from_secs(4)))
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[derive(Serialize)]
struct TranslateReq<'a> {
    input: &'a str,
    source_language_code: &'a str,
    target_language_code: &'a str,
}

#[derive(Deserialize)]
struct TranslateResp {
    #[serde(default)]
    translated_text: Option<String>,
}

#[async_trait]
impl Translator for SarvamTranslator {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<Option<String>, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials { provider: "sarvam" })?;

        let resp = self
            .http
            .post(format!("{}/translate", self.base_url))
            .header("api-subscription-key", key)
            .json(&TranslateReq {
                input: text,
                source_language_code: "auto",
                target_language_code: target_language,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: "sarvam",
                status: status.as_u16(),
            });
        }

        let body: TranslateResp = resp.json().await.map_err(|e| ProviderError::Malformed {
            provider: "sarvam",
            detail: e.to_string(),
        })?;
        Ok(body.translated_text.filter(|t| !t.trim().is_empty()))
    }

    fn name(&self) -> &'static str {
        "sarvam"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let cfg = TranslateConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: None,
            timeout_secs: 1,
        };
        let t = SarvamTranslator::from_config(&cfg).unwrap();
        let err = t.translate("hello", "hi-IN").await.unwrap_err();
        assert_eq!(err.kind(), "missing_credentials");
    }
}
