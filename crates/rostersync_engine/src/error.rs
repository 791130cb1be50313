//! Error types for the sync engine.

use rostersync_model::EntityKind;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, SyncError>;

/// Markers that identify a throttling response from the remote API.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "429",
    "rate limit",
    "ratelimit",
    "rate_limit",
    "quota",
    "resource_exhausted",
    "too many requests",
];

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote target is not set up.
    #[error("remote sheet is not configured: {0}")]
    NotConfigured(String),

    /// The remote API is throttling requests.
    #[error("remote rate limit exceeded: {0}")]
    RateLimited(String),

    /// Connectivity failure (DNS, timeout, refused).
    #[error("network error: {0}; check the connection and try again")]
    Network(String),

    /// The remote API rejected a request.
    #[error("remote error: {0}")]
    Remote(String),

    /// The remote returned data with an unexpected shape.
    #[error("remote protocol error: {0}")]
    Protocol(String),

    /// A row id could not be found on the remote sheet.
    #[error("{kind} row with id {remote_id} not found on remote sheet")]
    RowNotFound {
        /// Entity kind.
        kind: EntityKind,
        /// Remote id that was looked up.
        remote_id: String,
    },

    /// A local store write failed.
    #[error("local store error: {0}")]
    LocalPersistence(String),

    /// The deletion ledger could not be read or written.
    #[error("deletion ledger error: {0}")]
    Ledger(String),

    /// The operation was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Creates a local persistence error.
    pub fn local(message: impl Into<String>) -> Self {
        Self::LocalPersistence(message.into())
    }

    /// Creates a remote error, classifying throttling messages.
    pub fn remote(message: impl Into<String>) -> Self {
        let message = message.into();
        if has_rate_limit_marker(&message) {
            Self::RateLimited(message)
        } else {
            Self::Remote(message)
        }
    }

    /// Returns true if this error signals remote throttling.
    ///
    /// Only throttling is retried; network failures are not.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            SyncError::RateLimited(_) => true,
            SyncError::Remote(message) => has_rate_limit_marker(message),
            _ => false,
        }
    }
}

fn has_rate_limit_marker(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lowered.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_classification() {
        assert!(SyncError::RateLimited("slow down".into()).is_rate_limited());
        assert!(SyncError::Remote("HTTP 429 Too Many Requests".into()).is_rate_limited());
        assert!(SyncError::Remote("Quota exceeded for quota metric".into()).is_rate_limited());
        assert!(SyncError::Remote("RESOURCE_EXHAUSTED".into()).is_rate_limited());
        assert!(!SyncError::Remote("permission denied".into()).is_rate_limited());
        assert!(!SyncError::Network("connection refused".into()).is_rate_limited());
        assert!(!SyncError::NotConfigured("no spreadsheet id".into()).is_rate_limited());
    }

    #[test]
    fn remote_constructor_classifies() {
        assert!(matches!(
            SyncError::remote("Rate Limit Exceeded"),
            SyncError::RateLimited(_)
        ));
        assert!(matches!(SyncError::remote("bad range"), SyncError::Remote(_)));
    }

    #[test]
    fn error_display() {
        let err = SyncError::RowNotFound {
            kind: EntityKind::Guest,
            remote_id: "12".into(),
        };
        assert_eq!(err.to_string(), "guest row with id 12 not found on remote sheet");

        let err = SyncError::Network("timed out".into());
        assert!(err.to_string().contains("try again"));
    }
}
