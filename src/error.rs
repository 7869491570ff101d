// src/error.rs
use std::time::Duration;

use thiserror::Error;

/// Failure of an outbound provider call (post feed, AI classifier, translator).
///
/// Callers in this crate never hand these to HTTP clients directly; they are
/// absorbed into fallback paths and surface only in logs and metrics.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: credentials not configured")]
    MissingCredentials { provider: &'static str },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider}: unexpected status {status}")]
    Status {
        provider: &'static str,
        status: u16,
    },

    #[error("{provider}: no response within {after:?}")]
    Timeout {
        provider: &'static str,
        after: Duration,
    },

    #[error("{provider}: malformed payload: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },
}

impl ProviderError {
    /// Missing credentials cannot fix themselves between attempts; everything
    /// else (transport, status, timeout, odd payloads) is worth another try.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::MissingCredentials { .. })
    }

    /// Short, stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::MissingCredentials { .. } => "missing_credentials",
            ProviderError::Http(_) => "http",
            ProviderError::Status { .. } => "status",
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::Malformed { .. } => "malformed",
        }
    }
}
