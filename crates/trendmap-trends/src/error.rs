use std::time::Duration;

use thiserror::Error;

/// Errors returned by a trends source.
///
/// Callers treat every variant the same way: the region or topic being
/// fetched is skipped and nothing is cached.
#[derive(Debug, Error)]
pub enum TrendsError {
    /// Network or TLS failure, or a non-2xx status from the upstream.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base URL could not be parsed.
    #[error("invalid trends base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The response body was not the JSON shape we expect.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response parsed but is missing data we need.
    #[error("malformed trends response: {0}")]
    Malformed(String),

    /// The upstream did not answer in time.
    #[error("trends request timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

impl TrendsError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout }
        } else {
            Self::Http(err)
        }
    }
}
