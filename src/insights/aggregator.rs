// src/insights/aggregator.rs
//! The insight pipeline: freshness-bounded post cache with a non-blocking
//! in-flight guard, memoized severity classification with linear back-off,
//! and assembly of the records served to the UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::ProviderError;
use crate::insights::classifier::{
    parse_verdict, severity_prompt, FixedModel, GeminiModel, SeverityModel,
};
use crate::insights::feed::{fallback_posts, PostSource, XRecentSearch};
use crate::insights::severity_cache::SeverityCache;
use crate::insights::types::{
    BatchOrigin, InsightBatch, InsightRecord, PostBatch, RawPost, Severity,
};
use crate::insights::{ensure_metrics_described, text_fingerprint};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Tunables for [`InsightAggregator`].
#[derive(Debug, Clone, Copy)]
pub struct AggregatorSettings {
    pub fresh_window: Duration,
    pub feed_timeout: Duration,
    pub classify_timeout: Duration,
    pub retry: RetryPolicy,
    /// 0 = unbounded.
    pub verdict_capacity: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            fresh_window: Duration::from_secs(15 * 60),
            feed_timeout: Duration::from_secs(10),
            classify_timeout: Duration::from_secs(10),
            retry: RetryPolicy::linear(3, Duration::from_millis(2_000)),
            verdict_capacity: 10_000,
        }
    }
}

impl AggregatorSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            fresh_window: cfg.feed.fresh_window(),
            feed_timeout: cfg.feed.timeout(),
            classify_timeout: cfg.classifier.timeout(),
            retry: cfg.classifier.retry_policy(),
            verdict_capacity: cfg.classifier.cache_capacity,
        }
    }
}

#[derive(Debug)]
struct CachedBatch {
    posts: Vec<RawPost>,
    fetched_at: Instant,
}

/// Set while a feed request is outstanding; cleared on drop, so every exit
/// path (error, timeout, panic, cancelled future) releases it.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Constructed once at startup and shared (`Arc`) with request handlers.
pub struct InsightAggregator {
    feed: Arc<dyn PostSource>,
    model: Arc<dyn SeverityModel>,
    settings: AggregatorSettings,
    batch: RwLock<Option<CachedBatch>>,
    fetching: AtomicBool,
    verdicts: SeverityCache,
}

impl InsightAggregator {
    pub fn new(
        feed: Arc<dyn PostSource>,
        model: Arc<dyn SeverityModel>,
        settings: AggregatorSettings,
    ) -> Self {
        ensure_metrics_described();
        Self {
            feed,
            model,
            verdicts: SeverityCache::with_capacity(settings.verdict_capacity),
            settings,
            batch: RwLock::new(None),
            fetching: AtomicBool::new(false),
        }
    }

    /// X recent search + Gemini (or the fixed mock model when configured).
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ProviderError> {
        let feed: Arc<dyn PostSource> = Arc::new(XRecentSearch::from_config(&cfg.feed)?);
        let model: Arc<dyn SeverityModel> = if cfg.classifier.mock {
            Arc::new(FixedModel {
                verdict: Severity::Moderate,
            })
        } else {
            Arc::new(GeminiModel::from_config(&cfg.classifier)?)
        };
        info!(
            feed = feed.name(),
            model = model.name(),
            fresh_window_secs = cfg.feed.fresh_window_secs,
            feed_token = cfg.feed.bearer_token.is_some(),
            model_key = cfg.classifier.api_key.is_some(),
            "insight aggregator configured"
        );
        Ok(Self::new(feed, model, AggregatorSettings::from_config(cfg)))
    }

    /// Number of memoized verdicts.
    pub fn cached_verdicts(&self) -> usize {
        self.verdicts.len()
    }

    /// Recent posts: cached inside the freshness window, otherwise fetched.
    /// Never fails; provider problems yield the fallback set.
    pub async fn fetch_posts(&self) -> PostBatch {
        if let Some(posts) = self.fresh_posts() {
            return Self::cached(posts);
        }
        self.refresh().await
    }

    async fn refresh(&self) -> PostBatch {
        let Some(_in_flight) = InFlight::acquire(&self.fetching) else {
            let posts = self.current_posts();
            debug!(count = posts.len(), "feed fetch in flight; serving current cache");
            counter!("insights_feed_batches_total", "origin" => "stale").increment(1);
            return PostBatch {
                posts,
                origin: BatchOrigin::Stale,
            };
        };

        // A fetch may have completed between the freshness check and the acquire.
        if let Some(posts) = self.fresh_posts() {
            return Self::cached(posts);
        }

        let started = Instant::now();
        let timeout = self.settings.feed_timeout;
        let result = match tokio::time::timeout(timeout, self.feed.fetch_recent()).await {
            Ok(r) => r,
            Err(_) => Err(ProviderError::Timeout {
                provider: self.feed.name(),
                after: timeout,
            }),
        };
        histogram!("insights_feed_fetch_ms").record(started.elapsed().as_secs_f64() * 1_000.0);

        match result {
            Ok(posts) => {
                info!(provider = self.feed.name(), count = posts.len(), "post feed refreshed");
                *self.write_batch() = Some(CachedBatch {
                    posts: posts.clone(),
                    fetched_at: started,
                });
                counter!("insights_feed_batches_total", "origin" => "live").increment(1);
                PostBatch {
                    posts,
                    origin: BatchOrigin::Live,
                }
            }
            Err(e) => {
                warn!(
                    provider = self.feed.name(),
                    kind = e.kind(),
                    error = %e,
                    "post feed failed; serving fallback set"
                );
                counter!("insights_feed_errors_total", "kind" => e.kind()).increment(1);
                counter!("insights_feed_batches_total", "origin" => "fallback").increment(1);
                PostBatch {
                    posts: fallback_posts(),
                    origin: BatchOrigin::Fallback,
                }
            }
        }
    }

    /// Verdict for `text`, memoized by exact content. Failures degrade to a
    /// permanently cached [`Severity::Unknown`].
    pub async fn classify_severity(&self, text: &str) -> Severity {
        if let Some(hit) = self.verdicts.get(text) {
            counter!("insights_severity_cache_hits_total").increment(1);
            return hit;
        }
        counter!("insights_severity_cache_misses_total").increment(1);

        let provider = self.model.name();
        let timeout = self.settings.classify_timeout;
        let outcome = retry_with_backoff(
            &self.settings.retry,
            ProviderError::is_retryable,
            |attempt| async move {
                counter!("insights_classify_attempts_total").increment(1);
                debug!(attempt, provider, "classifying post severity");
                let prompt = severity_prompt(text);
                let raw = match tokio::time::timeout(timeout, self.model.complete(&prompt)).await
                {
                    Ok(Ok(raw)) => raw,
                    Ok(Err(e)) => return Err(e),
                    Err(_) => {
                        return Err(ProviderError::Timeout {
                            provider,
                            after: timeout,
                        })
                    }
                };
                parse_verdict(provider, &raw)
            },
        )
        .await;

        let verdict = match outcome {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    post = %text_fingerprint(text),
                    provider,
                    kind = e.kind(),
                    error = %e,
                    "severity classification failed; caching unknown"
                );
                counter!("insights_classify_fallback_total").increment(1);
                Severity::Unknown
            }
        };

        self.verdicts.insert(text, verdict);
        gauge!("insights_severity_cache_entries").set(self.verdicts.len() as f64);
        verdict
    }

    /// Fetch, classify every post concurrently, assemble in feed order.
    pub async fn get_insights(&self) -> InsightBatch {
        let batch = self.fetch_posts().await;
        let verdicts =
            join_all(batch.posts.iter().map(|p| self.classify_severity(&p.text))).await;
        let records = batch
            .posts
            .into_iter()
            .zip(verdicts)
            .map(|(post, severity)| InsightRecord::from_post(post, severity))
            .collect();
        InsightBatch {
            records,
            origin: batch.origin,
        }
    }

    fn cached(posts: Vec<RawPost>) -> PostBatch {
        counter!("insights_feed_batches_total", "origin" => "cached").increment(1);
        PostBatch {
            posts,
            origin: BatchOrigin::Cached,
        }
    }

    // Only non-empty batches count as fresh: an empty success is refetched
    // on the next call.
    fn fresh_posts(&self) -> Option<Vec<RawPost>> {
        let g = self.read_batch();
        g.as_ref()
            .filter(|b| {
                !b.posts.is_empty() && b.fetched_at.elapsed() < self.settings.fresh_window
            })
            .map(|b| b.posts.clone())
    }

    fn current_posts(&self) -> Vec<RawPost> {
        self.read_batch()
            .as_ref()
            .map(|b| b.posts.clone())
            .unwrap_or_default()
    }

    fn read_batch(&self) -> RwLockReadGuard<'_, Option<CachedBatch>> {
        match self.batch.read() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    fn write_batch(&self) -> RwLockWriteGuard<'_, Option<CachedBatch>> {
        match self.batch.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}
