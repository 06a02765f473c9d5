//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility: these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur while talking to the model backend.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// Non-2xx HTTP response from the model endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// SSE stream parsing or chunk-level error.
    #[error("stream error: {reason}")]
    StreamError {
        reason: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },

    /// Endpoint or API key is not configured.
    #[error("missing configuration: {field}")]
    MissingCredentials {
        field: &'static str,
    },
}

impl InferenceError {
    /// Pull a human-readable summary out of an OpenAI-style error body
    /// (`{"error": {"message": "..."}}`), falling back to the display text.
    pub fn summary(&self) -> String {
        let InferenceError::HttpError { status, body } = self else {
            return self.to_string();
        };
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .pointer("/error/message")
                    .or_else(|| value.get("message"))
                    .and_then(|m| m.as_str())
                    .map(|m| m.split_whitespace().collect::<Vec<_>>().join(" "))
            })
            .map(|message| format!("HTTP {status}: {message}"))
            .unwrap_or_else(|| self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_extracts_openai_message() {
        let err = InferenceError::HttpError {
            status: 401,
            body: r#"{"error":{"message":"Incorrect API key\n provided","type":"invalid_request_error"}}"#
                .to_string(),
        };
        assert_eq!(err.summary(), "HTTP 401: Incorrect API key provided");
    }

    #[test]
    fn test_summary_keeps_non_json_body() {
        let err = InferenceError::HttpError {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        assert_eq!(err.summary(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_summary_falls_back_to_display() {
        let err = InferenceError::MissingCredentials { field: "api_key" };
        assert_eq!(err.summary(), "missing configuration: api_key");
    }
}
