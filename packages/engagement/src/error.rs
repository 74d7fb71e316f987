//! Typed errors for the engagement pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match on
//! the failure taxonomy: source unavailable, malformed response, persistence.

use thiserror::Error;

/// Errors raised at the engagement source boundary (one page fetch).
#[derive(Debug, Error)]
pub enum SourceError {
    /// Upstream answered with a non-success status
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Transport-level failure (DNS, connection reset, TLS...)
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The page fetch exceeded its bounded wait
    #[error("page fetch timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The page body was missing expected fields or could not be decoded
    #[error("malformed response: {reason}")]
    Malformed { reason: String },
}

impl SourceError {
    /// Upstream HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the upstream signalled rate limiting (HTTP 429).
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// Whether this failure is a malformed page rather than an unavailable source.
    pub fn is_malformed(&self) -> bool {
        matches!(self, SourceError::Malformed { .. })
    }
}

/// Errors raised by the deduplicating store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected a write or a query failed
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A persisted row could not be decoded
    #[error("corrupt row for {target_id}: {reason}")]
    CorruptRow { target_id: String, reason: String },

    /// Write explicitly refused (e.g. lock poisoned, read-only store)
    #[error("write rejected for {target_id}: {reason}")]
    Rejected { target_id: String, reason: String },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum EngagementError {
    /// Network/HTTP failure or non-2xx status from the source
    #[error("source unavailable for {target_id}: {source}")]
    SourceUnavailable {
        target_id: String,
        #[source]
        source: SourceError,
    },

    /// Page or actor record missing expected fields
    #[error("malformed response for {target_id}: {reason}")]
    MalformedResponse { target_id: String, reason: String },

    /// Store write rejected
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    /// Operation was cancelled by the caller's stop signal
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl EngagementError {
    /// Wrap a source failure for a target, splitting out malformed pages.
    pub fn from_source(target_id: impl Into<String>, err: SourceError) -> Self {
        let target_id = target_id.into();
        match err {
            SourceError::Malformed { reason } => {
                EngagementError::MalformedResponse { target_id, reason }
            }
            other => EngagementError::SourceUnavailable {
                target_id,
                source: other,
            },
        }
    }
}

/// Result type alias for source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EngagementError>;
