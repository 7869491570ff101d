// tests/common/mod.rs
//
// Stub providers shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use traffic_insights::error::ProviderError;
use traffic_insights::insights::classifier::SeverityModel;
use traffic_insights::insights::feed::PostSource;
use traffic_insights::insights::{AggregatorSettings, InsightAggregator, RawPost};
use traffic_insights::translate::Translator;

pub fn post(id: &str, text: &str) -> RawPost {
    RawPost {
        id: id.to_string(),
        text: text.to_string(),
        platform: "X".to_string(),
        timestamp: "2025-03-01T10:00:00.000Z".to_string(),
    }
}

pub fn aggregator(feed: Arc<dyn PostSource>, model: Arc<dyn SeverityModel>) -> InsightAggregator {
    InsightAggregator::new(feed, model, AggregatorSettings::default())
}

// ---------------------------------------------------------------- feeds

/// Returns its posts, or a 503 while failing.
pub struct StubFeed {
    calls: AtomicUsize,
    failing: AtomicBool,
    posts: Vec<RawPost>,
}

impl StubFeed {
    pub fn new(posts: Vec<RawPost>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            posts,
        })
    }

    pub fn failing() -> Arc<Self> {
        let f = Self::new(vec![post("99", "never served")]);
        f.set_failing(true);
        f
    }

    pub fn set_failing(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostSource for StubFeed {
    async fn fetch_recent(&self) -> Result<Vec<RawPost>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                provider: "stub",
                status: 503,
            });
        }
        Ok(self.posts.clone())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Blocks each fetch until `release()` while the gate is closed.
pub struct GatedFeed {
    calls: AtomicUsize,
    open: AtomicBool,
    gate: Notify,
    posts: Vec<RawPost>,
}

impl GatedFeed {
    pub fn closed(posts: Vec<RawPost>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            open: AtomicBool::new(false),
            gate: Notify::new(),
            posts,
        })
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    /// Let one blocked fetch through.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl PostSource for GatedFeed {
    async fn fetch_recent(&self) -> Result<Vec<RawPost>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.open.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        Ok(self.posts.clone())
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

// ---------------------------------------------------------------- models

#[derive(Debug, Clone)]
pub enum ModelMode {
    /// Answer with this text unless a rule matches the prompt.
    Answer(String),
    /// HTTP 503 on every call.
    Unavailable,
    /// No API key.
    Unconfigured,
}

pub struct StubModel {
    calls: AtomicUsize,
    mode: Mutex<ModelMode>,
    rules: Vec<(String, String)>,
    delay: Duration,
}

impl StubModel {
    pub fn answering(answer: &str) -> Arc<Self> {
        Self::build(ModelMode::Answer(answer.to_string()), Vec::new(), Duration::ZERO)
    }

    /// First rule whose needle appears in the prompt decides the answer.
    pub fn with_rules(rules: &[(&str, &str)]) -> Arc<Self> {
        let rules = rules
            .iter()
            .map(|(n, a)| (n.to_string(), a.to_string()))
            .collect();
        Self::build(ModelMode::Answer("moderate".to_string()), rules, Duration::ZERO)
    }

    pub fn unavailable() -> Arc<Self> {
        Self::build(ModelMode::Unavailable, Vec::new(), Duration::ZERO)
    }

    pub fn unconfigured() -> Arc<Self> {
        Self::build(ModelMode::Unconfigured, Vec::new(), Duration::ZERO)
    }

    pub fn slow(answer: &str, delay: Duration) -> Arc<Self> {
        Self::build(ModelMode::Answer(answer.to_string()), Vec::new(), delay)
    }

    fn build(mode: ModelMode, rules: Vec<(String, String)>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            mode: Mutex::new(mode),
            rules,
            delay,
        })
    }

    pub fn set_mode(&self, mode: ModelMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeverityModel for StubModel {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            ModelMode::Unavailable => Err(ProviderError::Status {
                provider: "stub",
                status: 503,
            }),
            ModelMode::Unconfigured => Err(ProviderError::MissingCredentials { provider: "stub" }),
            ModelMode::Answer(default) => Ok(self
                .rules
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .map(|(_, answer)| answer.clone())
                .unwrap_or(default)),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

// ---------------------------------------------------------------- translators

pub enum StubTranslator {
    Answer(Option<String>),
    Failing,
}

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<Option<String>, ProviderError> {
        match self {
            StubTranslator::Answer(Some(prefix)) => {
                Ok(Some(format!("{prefix}[{target_language}] {text}")))
            }
            StubTranslator::Answer(None) => Ok(None),
            StubTranslator::Failing => Err(ProviderError::Status {
                provider: "stub",
                status: 500,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
