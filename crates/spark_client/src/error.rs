//! Error taxonomy for the client.
//!
//! Fatal conditions for an exchange surface here; missing usage blocks and
//! protocol violations are recovered locally and only logged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SparkError {
    /// The configured service URL could not be parsed or lacks a host.
    #[error("invalid service url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Credential or signing misconfiguration. No exchange was attempted.
    #[error("authentication setup failed: {0}")]
    Auth(String),

    /// The service answered with a non-zero error code. The message comes
    /// from the configured error-code table.
    #[error("service error {code}: {message}")]
    Service { code: i64, message: String },

    /// Connection-level failure: cannot connect, closed before a terminal
    /// fragment, or a frame that does not parse.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl SparkError {
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        SparkError::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
