//! Error types for Zyph
//!
//! This module defines the crate-wide error enum and the typed error returned
//! by the remote API client, using `thiserror` for ergonomic error handling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Zyph operations
///
/// Covers configuration loading, persistence, page parsing and remote API
/// failures. Most library functions return [`Result`], which wraps this type
/// in `anyhow::Error` for context-rich propagation.
#[derive(Error, Debug)]
pub enum ZyphError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key-value storage errors (sled, serialization of stored values)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Page or HTML parsing errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Content capture errors (restricted pages, missing documents)
    #[error("Capture error: {0}")]
    Capture(String),

    /// Message bus errors (closed channel, unknown action)
    #[error("Message bus error: {0}")]
    Bus(String),

    /// Typed remote API failure
    #[error(transparent)]
    Api(#[from] ApiError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Zyph operations
///
/// Uses `anyhow::Error` as the error type, allowing rich error context and
/// easy propagation. The API client uses [`ApiResult`] instead so that
/// callers can branch on [`ApiErrorCode`].
pub type Result<T> = anyhow::Result<T>;

/// Result type returned by every [`crate::api::ApiClient`] method.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Machine-readable classification of API client failures.
///
/// Callers branch on this code rather than on raw HTTP status. The
/// serialized form matches the codes stored in the sync queue
/// (`NO_AUTH`, `AUTH_REJECTED`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    /// No credential is available; the user must authenticate.
    NoAuth,
    /// The backend rejected the stored credential (401/403). The credential
    /// has already been cleared locally.
    AuthRejected,
    /// Key validation could not be completed (server error, bad response).
    ValidationFailed,
    /// The key being validated is empty or was rejected by the backend.
    InvalidKey,
    /// A write payload failed local validation; no request was sent.
    BadPayload,
    /// The request never produced an HTTP response.
    NetworkError,
    /// The backend answered with a non-success status.
    RequestFailed,
}

impl ApiErrorCode {
    /// Wire name of the code, e.g. `"NO_AUTH"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorCode::NoAuth => "NO_AUTH",
            ApiErrorCode::AuthRejected => "AUTH_REJECTED",
            ApiErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ApiErrorCode::InvalidKey => "INVALID_KEY",
            ApiErrorCode::BadPayload => "BAD_PAYLOAD",
            ApiErrorCode::NetworkError => "NETWORK_ERROR",
            ApiErrorCode::RequestFailed => "REQUEST_FAILED",
        }
    }
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the remote API client.
///
/// # Examples
///
/// ```
/// use zyph::error::{ApiError, ApiErrorCode};
///
/// let err = ApiError::bad_payload("folder name is required");
/// assert_eq!(err.code, ApiErrorCode::BadPayload);
/// assert!(!err.is_retryable());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Classification callers branch on
    pub code: ApiErrorCode,
    /// Human readable detail (server `detail` field when available)
    pub message: String,
    /// HTTP status when the backend answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiError {
    /// Create an error with the given code and message
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    /// Attach the HTTP status that produced this error
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// No credential available
    pub fn no_auth() -> Self {
        Self::new(
            ApiErrorCode::NoAuth,
            "Authentication required: validate an API key first",
        )
    }

    /// Local payload validation failure
    pub fn bad_payload(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadPayload, message)
    }

    /// Transport failure before any response was received
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NetworkError, message)
    }

    /// Whether re-sending the same request later may succeed.
    ///
    /// Network failures, rate limiting and server errors are retryable;
    /// authentication and payload problems are not.
    pub fn is_retryable(&self) -> bool {
        match self.code {
            ApiErrorCode::NetworkError => true,
            ApiErrorCode::RequestFailed => match self.status {
                Some(status) => status == 408 || status == 429 || status >= 500,
                None => false,
            },
            _ => false,
        }
    }

    /// Whether the failure requires the user to authenticate again.
    pub fn is_auth(&self) -> bool {
        matches!(
            self.code,
            ApiErrorCode::NoAuth | ApiErrorCode::AuthRejected | ApiErrorCode::InvalidKey
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ZyphError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_storage_error_display() {
        let error = ZyphError::Storage("tree unavailable".to_string());
        assert_eq!(error.to_string(), "Storage error: tree unavailable");
    }

    #[test]
    fn test_api_error_display_includes_code() {
        let error = ApiError::new(ApiErrorCode::RequestFailed, "boom").with_status(500);
        assert_eq!(error.to_string(), "REQUEST_FAILED: boom");
        assert_eq!(error.status, Some(500));
    }

    #[test]
    fn test_api_error_wraps_transparently() {
        let error: ZyphError = ApiError::no_auth().into();
        assert!(error.to_string().starts_with("NO_AUTH"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::network("refused").is_retryable());
        assert!(ApiError::new(ApiErrorCode::RequestFailed, "x")
            .with_status(503)
            .is_retryable());
        assert!(ApiError::new(ApiErrorCode::RequestFailed, "x")
            .with_status(429)
            .is_retryable());
        assert!(!ApiError::new(ApiErrorCode::RequestFailed, "x")
            .with_status(404)
            .is_retryable());
        assert!(!ApiError::no_auth().is_retryable());
        assert!(!ApiError::bad_payload("x").is_retryable());
    }

    #[test]
    fn test_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ApiErrorCode::AuthRejected).unwrap();
        assert_eq!(json, "\"AUTH_REJECTED\"");
        let back: ApiErrorCode = serde_json::from_str("\"BAD_PAYLOAD\"").unwrap();
        assert_eq!(back, ApiErrorCode::BadPayload);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ZyphError = io_error.into();
        assert!(matches!(error, ZyphError::Io(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: ZyphError = yaml_error.into();
        assert!(matches!(error, ZyphError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ZyphError>();
        assert_send_sync::<ApiError>();
    }
}
