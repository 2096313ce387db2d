//! Error types for video-harvest
//!
//! This module provides comprehensive error handling for the library, including:
//! - Domain-specific error types (Source, Database, Config, etc.)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for video-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for video-harvest
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "credentials.api_keys")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Search source error (the external quota-metered API)
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// All credentials in the pool are exhausted or unavailable
    #[error("all credentials have reached their daily quota limit or are unavailable")]
    CredentialsExhausted,

    /// An extraction run is already in progress
    #[error("an extraction run is already in progress")]
    AlreadyRunning,

    /// No extraction run is currently active
    #[error("no extraction run is currently active")]
    NoActiveRun,

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Sink rejected or failed to persist a batch
    #[error("sink error: {0}")]
    Sink(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new runs
    #[error("shutdown in progress: not accepting new runs")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Errors reported by the external search source
///
/// The variants encode the retry taxonomy: [`SourceError::Transient`] failures
/// are retried with backoff, [`SourceError::QuotaExceeded`] triggers credential
/// rotation without consuming a backoff delay, and the remaining variants are
/// fatal for the current call.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transient failure (network hiccup, 5xx, timeout) - safe to retry
    #[error("transient source failure: {0}")]
    Transient(String),

    /// The current credential's quota is exhausted or the caller is rate limited
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Access denied without a quota signal - not retryable
    #[error("access denied: {0}")]
    Denied(String),

    /// The request itself was malformed - not retryable
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The response body could not be decoded - not retryable
    #[error("malformed response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Classify a raw error message as a quota/rate signal.
    ///
    /// The external API reports quota exhaustion either as a structured reason
    /// or as free text; a case-insensitive match on "quota"/"rate" covers both.
    pub fn is_quota_message(message: &str) -> bool {
        let lower = message.to_lowercase();
        lower.contains("quota") || lower.contains("rate")
    }
}

impl Error {
    /// Returns true if this error carries a quota/rate-limit signal.
    ///
    /// Quota errors are handled by rotating to the next credential rather than
    /// by backoff, so the executor needs to tell them apart from ordinary
    /// transient failures.
    pub fn is_quota(&self) -> bool {
        match self {
            Error::Source(SourceError::QuotaExceeded(_)) => true,
            Error::Source(SourceError::Denied(msg)) => SourceError::is_quota_message(msg),
            _ => false,
        }
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
/// It follows a standard format with machine-readable error codes,
/// human-readable messages, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "already_running",
///     "message": "an extraction run is already in progress"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "already_running")
    ///
    /// Clients can use this for programmatic error handling.
    pub code: String,

    /// Human-readable error message
    ///
    /// This is suitable for displaying to end users.
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Source(SourceError::BadRequest(_)) => 400,

            // 403 Forbidden - upstream denied access
            Error::Source(SourceError::Denied(_)) => 403,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict - single-flight violation / nothing to stop
            Error::AlreadyRunning => 409,
            Error::NoActiveRun => 409,

            // 429 Too Many Requests - upstream quota signal surfaced directly
            Error::Source(SourceError::QuotaExceeded(_)) => 429,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Sink(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Network(_) => 502,
            Error::Source(SourceError::Transient(_)) => 502,
            Error::Source(SourceError::Decode(_)) => 502,

            // 503 Service Unavailable
            Error::CredentialsExhausted => 503,
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Source(e) => match e {
                SourceError::Transient(_) => "source_unavailable",
                SourceError::QuotaExceeded(_) => "quota_exceeded",
                SourceError::Denied(_) => "access_denied",
                SourceError::BadRequest(_) => "bad_request",
                SourceError::Decode(_) => "malformed_response",
            },
            Error::Network(_) => "network_error",
            Error::CredentialsExhausted => "credentials_exhausted",
            Error::AlreadyRunning => "already_running",
            Error::NoActiveRun => "no_active_run",
            Error::NotFound(_) => "not_found",
            Error::Sink(_) => "sink_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
