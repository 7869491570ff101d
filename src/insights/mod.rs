// src/insights/mod.rs
//! Social insights: recent incident posts with AI severity verdicts.

pub mod aggregator;
pub mod classifier;
pub mod feed;
pub mod severity_cache;
pub mod types;

pub use aggregator::{AggregatorSettings, InsightAggregator};
pub use types::{BatchOrigin, InsightBatch, InsightRecord, PostBatch, RawPost, Severity};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "insights_feed_batches_total",
            "Post batches served, by origin (live/cached/stale/fallback)."
        );
        describe_counter!(
            "insights_feed_errors_total",
            "Post feed failures, by error kind."
        );
        describe_counter!("insights_feed_posts_total", "Posts parsed from the feed.");
        describe_histogram!("insights_feed_fetch_ms", "Feed request time in milliseconds.");
        describe_histogram!("insights_feed_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!(
            "insights_severity_cache_hits_total",
            "Severity lookups answered from memory."
        );
        describe_counter!(
            "insights_severity_cache_misses_total",
            "Severity lookups that went to the model."
        );
        describe_counter!(
            "insights_classify_attempts_total",
            "Model calls made for severity classification."
        );
        describe_counter!(
            "insights_classify_fallback_total",
            "Texts whose classification ended as unknown."
        );
        describe_gauge!(
            "insights_severity_cache_entries",
            "Memoized severity verdicts."
        );
    });
}

/// Short anonymized id for a post text; raw text never goes to the logs.
pub(crate) fn text_fingerprint(text: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
