//! Error types for bili2text-monitor
//!
//! This module defines the single error type used by the status client, the
//! retry policy and the monitor:
//! - Transport failures (network, timeouts, unreadable bodies) that the retry
//!   policy may retry
//! - Application-level rejections (`success: false`) that end a monitor run
//!   immediately
//! - Configuration and URL errors

use thiserror::Error;

/// Result type alias for bili2text-monitor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bili2text-monitor
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll.tiers")
        key: Option<String>,
    },

    /// The HTTP request could not be completed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body was not valid JSON for the expected shape
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configured base URL or a derived endpoint URL is invalid
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-success HTTP status whose body could not be read as a report
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code returned by the server
        status: u16,
        /// Raw response body, truncated for logging
        body: String,
    },

    /// A well-formed JSON body that does not describe a usable report
    #[error("malformed status report: {0}")]
    MalformedReport(String),

    /// The server answered `success: false`
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, suitable for logs and UI messages
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Network(e) if e.is_timeout() => "timeout",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Http { .. } => "http_error",
            Error::MalformedReport(_) => "malformed_report",
            Error::Rejected(_) => "rejected",
            Error::Other(_) => "internal_error",
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let cases = [
            (Error::config("client.base_url", "bad"), "config_error"),
            (
                Error::Http {
                    status: 500,
                    body: String::new(),
                },
                "http_error",
            ),
            (Error::MalformedReport("x".into()), "malformed_report"),
            (Error::Rejected("x".into()), "rejected"),
            (Error::Other("x".into()), "internal_error"),
        ];

        for (error, code) in cases {
            assert_eq!(error.error_code(), code, "{error:?}");
        }
    }

    #[test]
    fn config_helper_records_key() {
        match Error::config("retry.max_retries", "too large") {
            Error::Config { message, key } => {
                assert_eq!(message, "too large");
                assert_eq!(key.as_deref(), Some("retry.max_retries"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn display_includes_context() {
        let err = Error::Http {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(err.to_string(), "HTTP 503: busy");
        assert_eq!(
            Error::Rejected("quota exceeded".into()).to_string(),
            "rejected by server: quota exceeded"
        );
    }
}
