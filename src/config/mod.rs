// src/config/mod.rs
//! Service configuration: optional TOML file + environment secrets.
//!
//! Lookup order for the file:
//! 1) `$INSIGHTS_CONFIG_PATH` (must exist when set)
//! 2) `config/insights.toml`
//! 3) built-in defaults
//!
//! Secrets (`TWITTER_BEARER_TOKEN`, `GEMINI_API_KEY`, `SARVAM_API_KEY`) are
//! read from the environment when the file leaves them out or says `"ENV"`.

pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use ai::ClassifierConfig;

pub const ENV_CONFIG_PATH: &str = "INSIGHTS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/insights.toml";
pub const ENV_TWITTER_BEARER_TOKEN: &str = "TWITTER_BEARER_TOKEN";
pub const ENV_SARVAM_API_KEY: &str = "SARVAM_API_KEY";

/// Incident keywords in English, no reposts.
pub const DEFAULT_FEED_QUERY: &str = "accident OR crash OR traffic -is:retweet lang:en";

fn default_feed_base_url() -> String {
    "https://api.twitter.com".to_string()
}
fn default_feed_query() -> String {
    DEFAULT_FEED_QUERY.to_string()
}
fn default_max_results() -> u32 {
    10
}
fn default_fresh_window_secs() -> u64 {
    15 * 60
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_translate_base_url() -> String {
    "https://api.sarvam.ai".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
}

/// Post-source settings (`[feed]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,
    #[serde(default = "default_feed_query")]
    pub query: String,
    /// The search endpoint accepts 10..=100.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// How long a successful batch is served without refetching.
    #[serde(default = "default_fresh_window_secs")]
    pub fresh_window_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            query: default_feed_query(),
            max_results: default_max_results(),
            bearer_token: None,
            fresh_window_secs: default_fresh_window_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FeedConfig {
    fn finalize(&mut self) {
        self.bearer_token = resolve_secret(self.bearer_token.take(), ENV_TWITTER_BEARER_TOKEN);
        self.max_results = self.max_results.clamp(10, 100);
        if self.fresh_window_secs == 0 {
            self.fresh_window_secs = default_fresh_window_secs();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        if self.query.trim().is_empty() {
            self.query = default_feed_query();
        }
    }

    pub fn fresh_window(&self) -> Duration {
        Duration::from_secs(self.fresh_window_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Translation provider settings (`[translate]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    #[serde(default = "default_translate_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            base_url: default_translate_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TranslateConfig {
    fn finalize(&mut self) {
        self.api_key = resolve_secret(self.api_key.take(), ENV_SARVAM_API_KEY);
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Parse a TOML document and resolve secrets/defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing insights config")?;
        cfg.finalize();
        Ok(cfg)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading insights config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        let mut cfg = AppConfig::default();
        cfg.finalize();
        Ok(cfg)
    }

    fn finalize(&mut self) {
        self.feed.finalize();
        self.classifier.finalize();
        self.translate.finalize();
    }
}

/// `None`, blank or `"ENV"` → read `env_key`; anything else is the literal
/// secret. Blank env values count as absent.
pub(crate) fn resolve_secret(value: Option<String>, env_key: &str) -> Option<String> {
    let literal = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("env"));
    literal.or_else(|| {
        std::env::var(env_key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}
