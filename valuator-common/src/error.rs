//! Error types shared by the valuator crates.

use thiserror::Error;

/// Result type alias using the valuator error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for valuator components.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upstream service failure. `status` is the HTTP status when the
    /// service answered, `None` for transport failures.
    #[error("{service} request failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    External {
        service: String,
        status: Option<u16>,
        message: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for [`Error::External`].
    pub fn external(
        service: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::External {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    /// Whether repeating the operation may succeed: timeouts, transport
    /// failures, rate limiting, and upstream 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::External { status: None, .. } => true,
            Self::External {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            Self::WithContext { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::WithContext { source, .. } => source.is_config(),
            _ => false,
        }
    }

    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::Timeout => 504,
            Self::External { .. } => 502,
            Self::WithContext { source, .. } => source.status_code(),
            _ => 500,
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::NotFound("test".into()).status_code(), 404);
        assert_eq!(Error::InvalidInput("test".into()).status_code(), 400);
        assert_eq!(Error::external("llm", Some(503), "down").status_code(), 502);
        assert_eq!(Error::Timeout.status_code(), 504);
        assert_eq!(Error::Internal("test".into()).status_code(), 500);
        assert_eq!(Error::Config("test".into()).status_code(), 500);
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::NotFound("valuation 7".into());
        let with_ctx = err.with_context("loading record");
        assert!(matches!(with_ctx, Error::WithContext { .. }));
        assert_eq!(with_ctx.status_code(), 404);
        assert_eq!(with_ctx.to_string(), "loading record: Not found: valuation 7");
    }

    #[test]
    fn test_external_display() {
        let err = Error::external("azure-openai", Some(401), "bad key");
        assert_eq!(err.to_string(), "azure-openai request failed (HTTP 401): bad key");

        let err = Error::external("azure-openai", None, "connection refused");
        assert_eq!(err.to_string(), "azure-openai request failed: connection refused");
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Timeout.is_retryable());
        assert!(Error::external("llm", None, "reset").is_retryable());
        assert!(Error::external("llm", Some(429), "slow down").is_retryable());
        assert!(Error::external("llm", Some(503), "busy").is_retryable());
        assert!(!Error::external("llm", Some(401), "bad key").is_retryable());
        assert!(!Error::Config("missing endpoint".into()).is_retryable());
        assert!(Error::Timeout.with_context("narrative").is_retryable());
    }

    #[test]
    fn test_is_config_through_context() {
        let err = Error::Config("endpoint missing".into()).with_context("narrative");
        assert!(err.is_config());
        assert!(!Error::Timeout.is_config());
    }

    #[test]
    fn test_result_ext_context() {
        let parsed: std::result::Result<serde_json::Value, serde_json::Error> =
            serde_json::from_str("{not json");
        let err = parsed.context("parsing completion").unwrap_err();
        assert!(err.to_string().starts_with("parsing completion: JSON error"));
    }
}
