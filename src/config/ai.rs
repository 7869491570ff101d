// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_step_ms() -> u64 {
    2_000
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_cache_capacity() -> usize {
    10_000
}

/// Severity classifier settings (`[classifier]` in the TOML file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" (or absent) means: read from GEMINI_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Total attempts per uncached text.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Linear back-off step: wait `attempt × step` after a failed attempt.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Max memoized verdicts; 0 = unbounded.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Use the deterministic fixed-verdict model instead of Gemini.
    #[serde(default)]
    pub mock: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
            timeout_secs: default_timeout_secs(),
            cache_capacity: default_cache_capacity(),
            mock: false,
        }
    }
}

impl ClassifierConfig {
    /// Resolve env-backed secrets and repair nonsensical numbers.
    pub(crate) fn finalize(&mut self) {
        self.api_key = super::resolve_secret(self.api_key.take(), ENV_GEMINI_API_KEY);

        if env::var(ENV_AI_TEST_MODE).is_ok_and(|v| v.eq_ignore_ascii_case("mock")) {
            self.mock = true;
        }

        if self.max_attempts == 0 {
            self.max_attempts = default_max_attempts();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.model = self.model.trim().to_string();
        if self.model.is_empty() {
            self.model = default_model();
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(
            self.max_attempts,
            Duration::from_millis(self.backoff_step_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
