//! Error types for the mediator engine.
//!
//! Only the remote strategy and startup configuration can fail. The rule-based
//! path is total, so none of these errors ever reaches the composer.

use thiserror::Error;

/// Central error type for all mediator operations.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// No credential configured, or the backend reports itself disabled.
    #[error("Remote analyzer unavailable")]
    RemoteUnavailable,

    /// Remote service returned an error status or unexpected reply.
    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    /// Rate limited by the remote service.
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Milliseconds to wait before retry.
        retry_after_ms: u64,
    },

    /// Remote reply did not contain a payload matching the expected schema.
    #[error("Malformed remote response: {0}")]
    ResponseParse(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rule pattern compilation error.
    #[error("Regex pattern error: {0}")]
    RegexPattern(#[from] regex::Error),

    /// Caller supplied something unusable (blank message text).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error (unreadable files, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal state error (lock poisoning, task failures).
    #[error("Internal state error: {0}")]
    InternalState(String),
}

/// The three ways a remote analysis can fail, as seen by the fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Expected: capability not configured. Silent fallback.
    Unavailable,
    /// Transient network or service failure.
    CallError,
    /// Reply was not well-formed structured data.
    ParseError,
    /// Not a remote failure at all.
    Local,
}

impl MediatorError {
    /// Classify this error for the fallback policy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::RemoteUnavailable => FailureKind::Unavailable,
            Self::RemoteCall(_) | Self::RateLimited { .. } | Self::Http(_) => {
                FailureKind::CallError
            }
            Self::ResponseParse(_) | Self::Json(_) => FailureKind::ParseError,
            Self::RegexPattern(_)
            | Self::Config(_)
            | Self::InvalidInput(_)
            | Self::InternalState(_) => FailureKind::Local,
        }
    }

    /// Log error with full context using tracing.
    pub fn log_with_context(&self, context: &ErrorContext) {
        match self.failure_kind() {
            FailureKind::Unavailable => {
                tracing::debug!(
                    request_id = %context.request_id,
                    operation = %context.operation,
                    sequence = ?context.sequence,
                    content_hash = ?context.content_hash,
                    "Remote analyzer unavailable, using rule-based fallback"
                );
            }
            FailureKind::CallError => {
                tracing::warn!(
                    error = %self,
                    request_id = %context.request_id,
                    operation = %context.operation,
                    sequence = ?context.sequence,
                    content_hash = ?context.content_hash,
                    "Remote call failed, using rule-based fallback"
                );
            }
            FailureKind::ParseError => {
                tracing::warn!(
                    error = %self,
                    request_id = %context.request_id,
                    operation = %context.operation,
                    sequence = ?context.sequence,
                    content_hash = ?context.content_hash,
                    "Remote response malformed, using rule-based fallback"
                );
            }
            FailureKind::Local => {
                tracing::error!(
                    error = %self,
                    request_id = %context.request_id,
                    operation = %context.operation,
                    "Configuration or internal error"
                );
            }
        }
    }

    /// Get user-friendly error message (hides internal details).
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RemoteUnavailable => "AI analysis is not configured",
            Self::RemoteCall(_) | Self::Http(_) => "AI service temporarily unavailable",
            Self::RateLimited { .. } => "Too many requests, please try again later",
            Self::ResponseParse(_) | Self::Json(_) => "AI service returned an unexpected reply",
            Self::RegexPattern(_) => "Invalid rule configuration",
            Self::InvalidInput(_) => "Message text must not be blank",
            Self::Config(_) => "Service configuration error",
            Self::InternalState(_) => "Internal service error",
        }
    }
}

/// Context information for error logging.
///
/// Carries a content hash rather than the message itself; drafts never end
/// up in logs.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Unique request identifier for correlation.
    pub request_id: String,
    /// Operation being performed.
    pub operation: String,
    /// Debounce sequence number, when the analysis came from the composer.
    pub sequence: Option<u64>,
    /// SHA-256 of the analysed text.
    pub content_hash: Option<String>,
}

impl ErrorContext {
    /// Create a new error context.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            sequence: None,
            content_hash: None,
        }
    }

    /// Set debounce sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Set content hash.
    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    /// Set request ID.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

/// Result type alias for mediator operations.
pub type Result<T> = std::result::Result<T, MediatorError>;
