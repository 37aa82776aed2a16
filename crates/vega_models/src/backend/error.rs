//! Error types for backend invocations.

use core::time::Duration;

/// Errors returned by a single backend invocation.
///
/// The router classifies these into failure kinds. Typed variants are mapped
/// directly; everything else is classified by its rendered message.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Http error (e.g.: malformed status, unexpected redirect).
    #[error("http error: {0}")]
    Http(String),

    /// The connection to the provider could not be established or was dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend gave up waiting on the provider.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider refused access (bad credentials, region block, ban).
    #[error("access forbidden: {0}")]
    Auth(String),

    /// Rate limited by the provider.
    #[error("rate limited{}", .retry_after.map(|d| format!(", retry after {d:?}")).unwrap_or_default())]
    RateLimited {
        /// Suggested time to wait before retrying.
        retry_after: Option<Duration>,
    },

    /// Request contains content that the provider does not support.
    #[error("unsupported content: {0}")]
    UnsupportedContent(String),

    /// Error parsing the response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Error returned by the provider.
    #[error("provider error: {message}")]
    Provider {
        /// HTTP status code if available.
        status: Option<u16>,
        /// Error message.
        message: String,
        /// The underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BackendError {
    /// Creates a [`BackendError::Provider`] carrying only a message.
    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            status: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a [`BackendError::Provider`] with an HTTP status code.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status: Some(status),
            message: message.into(),
            source: None,
        }
    }
}
