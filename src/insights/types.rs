// src/insights/types.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder for fields the post feed does not expose.
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";

/// A social post as fetched from the feed (or the fallback set).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawPost {
    pub id: String,
    pub text: String,
    pub platform: String, // e.g. "X"
    pub timestamp: String, // ISO-8601
}

/// Traffic severity verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
    /// Classification failed; terminal.
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ();

    /// Accepts only the four verdicts a model may answer with; `unknown` is
    /// ours to assign, not the model's.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "moderate" => Ok(Severity::Moderate),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(()),
        }
    }
}

/// Where a batch of posts came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchOrigin {
    /// Fetched from the provider during this call.
    Live,
    /// Served from a batch inside the freshness window.
    Cached,
    /// Another fetch was in flight; whatever the cache held (maybe nothing).
    Stale,
    /// Provider failed; fixed sample data.
    Fallback,
}

impl BatchOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOrigin::Live => "live",
            BatchOrigin::Cached => "cached",
            BatchOrigin::Stale => "stale",
            BatchOrigin::Fallback => "fallback",
        }
    }
}

/// Ordered posts plus their provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostBatch {
    pub posts: Vec<RawPost>,
    pub origin: BatchOrigin,
}

/// One classified post, as served to the UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InsightRecord {
    pub id: String,
    pub platform: String,
    pub content: String,
    pub author: String,
    pub timestamp: String,
    pub severity: Severity,
    pub location: String,
}

impl InsightRecord {
    pub fn from_post(post: RawPost, severity: Severity) -> Self {
        Self {
            id: post.id,
            platform: post.platform,
            content: post.text,
            author: UNKNOWN_PLACEHOLDER.to_string(),
            timestamp: post.timestamp,
            severity,
            location: UNKNOWN_PLACEHOLDER.to_string(),
        }
    }
}

/// Records in feed order; `origin` is for operators, not for the JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightBatch {
    pub records: Vec<InsightRecord>,
    pub origin: BatchOrigin,
}
