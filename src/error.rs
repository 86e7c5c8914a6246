//! Error types shared across the analyzer
//!
//! `BackendError` is what an individual provider client returns. The LLM
//! gateway folds those into a `GatewayError` after its retry and fallback
//! policy has run, and the pipeline surfaces everything to callers as an
//! `AnalysisError` carrying a stable `ErrorCode`.

use crate::pipeline::SessionError;
use crate::prompts::PromptError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur inside a single provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Authentication failed or credentials are invalid
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    TimeoutError { seconds: u64 },

    /// Rate limit exceeded, retry after the specified duration (in seconds)
    RateLimitError { retry_after: Option<u64> },

    /// The provider answered but the payload was unusable
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Configuration error (missing API keys, invalid settings, etc.)
    ConfigurationError { message: String },

    /// Network-related error
    NetworkError { message: String },

    /// Generic error for other cases
    Other { message: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::AuthenticationError { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            BackendError::RateLimitError { retry_after } => {
                if let Some(seconds) = retry_after {
                    write!(f, "Rate limit exceeded, retry after {} seconds", seconds)
                } else {
                    write!(f, "Rate limit exceeded")
                }
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "Invalid response from LLM: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BackendError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            BackendError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// How the gateway should treat a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Timeout, rate limit, connection or 5xx: worth retrying
    TransientTransport,
    /// Auth, configuration or 4xx: retrying the same provider is pointless
    PermanentTransport,
    /// The call succeeded but the payload is unusable
    Content,
}

impl BackendError {
    pub fn classify(&self) -> FailureClass {
        match self {
            BackendError::TimeoutError { .. }
            | BackendError::RateLimitError { .. }
            | BackendError::NetworkError { .. } => FailureClass::TransientTransport,
            BackendError::ApiError { status_code, .. } => match status_code {
                Some(code) if matches!(*code, 408 | 429) || *code >= 500 => {
                    FailureClass::TransientTransport
                }
                Some(_) => FailureClass::PermanentTransport,
                None => FailureClass::TransientTransport,
            },
            BackendError::AuthenticationError { .. }
            | BackendError::ConfigurationError { .. }
            | BackendError::Other { .. } => FailureClass::PermanentTransport,
            BackendError::InvalidResponse { .. } => FailureClass::Content,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            BackendError::RateLimitError { .. }
                | BackendError::ApiError {
                    status_code: Some(429),
                    ..
                }
        )
    }
}

/// Stable error signals surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    LlmTimeout,
    LlmRateLimit,
    LlmInvalidResponse,
    LlmProviderError,
    PipelineCancelled,
    ValidationError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::LlmTimeout => "LLM_TIMEOUT",
            ErrorCode::LlmRateLimit => "LLM_RATE_LIMIT",
            ErrorCode::LlmInvalidResponse => "LLM_INVALID_RESPONSE",
            ErrorCode::LlmProviderError => "LLM_PROVIDER_ERROR",
            ErrorCode::PipelineCancelled => "PIPELINE_CANCELLED",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by the LLM gateway once retries and fallback are exhausted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("LLM call to {provider} timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    #[error("LLM provider {provider} is rate limiting requests")]
    RateLimited { provider: String },

    #[error("LLM provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("LLM provider {provider} returned an unusable response: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::Timeout { .. } => ErrorCode::LlmTimeout,
            GatewayError::RateLimited { .. } => ErrorCode::LlmRateLimit,
            GatewayError::Provider { .. } => ErrorCode::LlmProviderError,
            GatewayError::InvalidResponse { .. } => ErrorCode::LlmInvalidResponse,
        }
    }

    /// Content failures are the orchestrator's to retry; everything else is transport
    pub fn is_content_failure(&self) -> bool {
        matches!(self, GatewayError::InvalidResponse { .. })
    }

    pub(crate) fn from_backend(provider: &str, error: &BackendError) -> Self {
        let provider = provider.to_string();
        match error {
            BackendError::TimeoutError { seconds } => GatewayError::Timeout {
                provider,
                seconds: *seconds,
            },
            e if e.is_rate_limit() => GatewayError::RateLimited { provider },
            BackendError::InvalidResponse { message, .. } => GatewayError::InvalidResponse {
                provider,
                message: message.clone(),
            },
            other => GatewayError::Provider {
                provider,
                message: other.to_string(),
            },
        }
    }
}

/// Errors surfaced by the analysis pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Llm(#[from] GatewayError),

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AnalysisError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AnalysisError::Validation(_) => ErrorCode::ValidationError,
            AnalysisError::Llm(e) => e.code(),
            AnalysisError::Cancelled => ErrorCode::PipelineCancelled,
            AnalysisError::Prompt(_) | AnalysisError::Session(_) => ErrorCode::ValidationError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        timeout = { BackendError::TimeoutError { seconds: 30 }, FailureClass::TransientTransport },
        rate_limit = { BackendError::RateLimitError { retry_after: None }, FailureClass::TransientTransport },
        network = { BackendError::NetworkError { message: "reset".into() }, FailureClass::TransientTransport },
        server_error = { BackendError::ApiError { message: "boom".into(), status_code: Some(503) }, FailureClass::TransientTransport },
        too_many_requests = { BackendError::ApiError { message: "slow down".into(), status_code: Some(429) }, FailureClass::TransientTransport },
        bad_request = { BackendError::ApiError { message: "bad".into(), status_code: Some(400) }, FailureClass::PermanentTransport },
        request_timeout = { BackendError::ApiError { message: "slow upstream".into(), status_code: Some(408) }, FailureClass::TransientTransport },
        auth = { BackendError::AuthenticationError { message: "no key".into() }, FailureClass::PermanentTransport },
        invalid = { BackendError::InvalidResponse { message: "empty".into(), raw_response: None }, FailureClass::Content },
    )]
    fn test_backend_error_classification(error: BackendError, expected: FailureClass) {
        assert_eq!(error.classify(), expected);
    }

    #[test]
    fn test_gateway_error_codes() {
        let timeout = GatewayError::from_backend("openai", &BackendError::TimeoutError { seconds: 45 });
        assert_eq!(timeout.code(), ErrorCode::LlmTimeout);

        let limited = GatewayError::from_backend(
            "openai",
            &BackendError::ApiError {
                message: "429".into(),
                status_code: Some(429),
            },
        );
        assert_eq!(limited.code(), ErrorCode::LlmRateLimit);

        let invalid = GatewayError::from_backend(
            "openai",
            &BackendError::InvalidResponse {
                message: "empty".into(),
                raw_response: None,
            },
        );
        assert!(invalid.is_content_failure());
        assert_eq!(invalid.code(), ErrorCode::LlmInvalidResponse);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::ValidationError).unwrap();
        assert_eq!(json, "\"VALIDATION_ERROR\"");
        assert_eq!(ErrorCode::PipelineCancelled.to_string(), "PIPELINE_CANCELLED");
        assert_eq!(AnalysisError::Cancelled.code(), ErrorCode::PipelineCancelled);
    }
}
