//! LLM gateway: timeout, retry, fallback and concurrency policy
//!
//! Every model call made by the pipeline goes through [`LlmGateway::complete`].
//! Transport failures (timeouts, rate limits, connection problems) are retried
//! with exponential backoff on the same provider, then handed to the fallback
//! provider if one is configured. Content failures are returned immediately:
//! the caller decides whether a stricter prompt is worth another attempt.
//! The gateway never invents a response.

use super::client::LLMClient;
use super::types::{LLMRequest, LLMResponse};
use crate::error::{BackendError, FailureClass, GatewayError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Attempts per provider for transport failures
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry
    pub backoff_base: Duration,
    /// Cap on simultaneous outbound calls across all sessions
    pub max_concurrent_calls: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            temperature: 0.1,
            max_tokens: 4096,
        }
    }
}

impl GatewayConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_max_concurrent_calls(mut self, max_concurrent_calls: usize) -> Self {
        self.max_concurrent_calls = max_concurrent_calls;
        self
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

/// One logical model call
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    /// Short label used in logs, usually the stage name
    pub label: String,
    pub system_prompt: String,
    pub prompt: String,
    pub timeout: Duration,
    pub provider_hint: Option<String>,
}

impl GatewayRequest {
    pub fn new(label: impl Into<String>, system_prompt: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            timeout: Duration::from_secs(60),
            provider_hint: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_provider_hint(mut self, hint: Option<String>) -> Self {
        self.provider_hint = hint;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub content: String,
    /// Name of the provider that produced the content
    pub provider: String,
    /// Total provider calls spent on this request, across primary and fallback
    pub attempts: u32,
    pub response_time: Duration,
}

pub struct LlmGateway {
    primary: Arc<dyn LLMClient>,
    fallback: Option<Arc<dyn LLMClient>>,
    config: GatewayConfig,
    limiter: Arc<Semaphore>,
}

impl LlmGateway {
    pub fn new(primary: Arc<dyn LLMClient>, config: GatewayConfig) -> Self {
        let permits = config.max_concurrent_calls.max(1);
        Self {
            primary,
            fallback: None,
            limiter: Arc::new(Semaphore::new(permits)),
            config,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn LLMClient>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn fallback_name(&self) -> Option<&str> {
        self.fallback.as_deref().map(|c| c.name())
    }

    /// Runs one logical call through retry and fallback policy
    pub async fn complete(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let providers = self.provider_order(request.provider_hint.as_deref());
        let mut spent = 0;
        let mut last_error = None;

        for (index, client) in providers.iter().enumerate() {
            match self.call_with_retry(client.as_ref(), request, &mut spent).await {
                Ok(response) => {
                    if index > 0 {
                        info!(
                            call = %request.label,
                            provider = %response.provider,
                            "Fallback provider answered"
                        );
                    }
                    return Ok(GatewayResponse {
                        attempts: spent,
                        ..response
                    });
                }
                Err(e) if e.is_content_failure() => return Err(e),
                Err(e) => {
                    if index + 1 < providers.len() {
                        warn!(
                            call = %request.label,
                            provider = %client.name(),
                            error = %e,
                            "Provider exhausted, failing over"
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GatewayError::Provider {
            provider: self.primary.name().to_string(),
            message: "no provider available".to_string(),
        }))
    }

    fn provider_order(&self, hint: Option<&str>) -> Vec<Arc<dyn LLMClient>> {
        let mut order = vec![self.primary.clone()];
        if let Some(fallback) = &self.fallback {
            order.push(fallback.clone());
        }

        let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
            return order;
        };

        match order.iter().position(|c| matches_hint(c.as_ref(), hint)) {
            Some(0) => {}
            Some(index) => order.swap(0, index),
            None => warn!(hint = %hint, "Provider hint matches no configured provider, ignoring"),
        }
        order
    }

    async fn call_with_retry(
        &self,
        client: &dyn LLMClient,
        request: &GatewayRequest,
        spent: &mut u32,
    ) -> Result<GatewayResponse, GatewayError> {
        let provider = client.name().to_string();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            *spent += 1;

            let started = Instant::now();
            let error = match self.call_once(client, request).await {
                Ok(response) if response.is_blank() => BackendError::InvalidResponse {
                    message: "empty response body".to_string(),
                    raw_response: Some(response.content),
                },
                Ok(response) => {
                    debug!(
                        call = %request.label,
                        provider = %provider,
                        attempt,
                        duration_ms = started.elapsed().as_millis(),
                        "LLM call succeeded"
                    );
                    return Ok(GatewayResponse {
                        content: response.content,
                        provider,
                        attempts: attempt,
                        response_time: response.response_time,
                    });
                }
                Err(e) => e,
            };

            match error.classify() {
                FailureClass::TransientTransport if attempt < max_attempts => {
                    let backoff = self.config.backoff_for(attempt);
                    warn!(
                        call = %request.label,
                        provider = %provider,
                        error = %error,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis(),
                        "Retrying LLM call"
                    );
                    tokio::time::sleep(backoff).await;
                }
                _ => return Err(GatewayError::from_backend(&provider, &error)),
            }
        }
    }

    async fn call_once(
        &self,
        client: &dyn LLMClient,
        request: &GatewayRequest,
    ) -> Result<LLMResponse, BackendError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| BackendError::Other {
                message: "concurrency limiter closed".to_string(),
            })?;

        let llm_request = LLMRequest::prompt(request.system_prompt.clone(), request.prompt.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_json_mode();

        match tokio::time::timeout(request.timeout, client.chat(llm_request)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::TimeoutError {
                seconds: request.timeout.as_secs(),
            }),
        }
    }
}

fn matches_hint(client: &dyn LLMClient, hint: &str) -> bool {
    client.name().eq_ignore_ascii_case(hint)
        || client
            .model_info()
            .is_some_and(|model| model.eq_ignore_ascii_case(hint))
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback_name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::llm::{MockLLMClient, MockResponse};

    fn fast_config() -> GatewayConfig {
        GatewayConfig::default().with_backoff_base(Duration::ZERO)
    }

    fn request() -> GatewayRequest {
        GatewayRequest::new("test", "system", "prompt").with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let primary = Arc::new(MockLLMClient::with_name("primary"));
        primary.add_response(MockResponse::text("{\"ok\":true}"));
        let gateway = LlmGateway::new(primary.clone(), fast_config());

        let response = gateway.complete(&request()).await.unwrap();
        assert_eq!(response.content, "{\"ok\":true}");
        assert_eq!(response.provider, "primary");
        assert_eq!(response.attempts, 1);
        assert!(primary.requests()[0].json_mode);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let primary = Arc::new(MockLLMClient::with_name("primary"));
        primary.add_responses(vec![
            MockResponse::error(BackendError::NetworkError {
                message: "reset".into(),
            }),
            MockResponse::text("{}"),
        ]);
        let gateway = LlmGateway::new(primary.clone(), fast_config());

        let response = gateway.complete(&request()).await.unwrap();
        assert_eq!(response.attempts, 2);
        assert_eq!(primary.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_primary_fails_over() {
        let primary = Arc::new(MockLLMClient::with_name("primary"));
        primary.add_responses(vec![
            MockResponse::error(BackendError::RateLimitError { retry_after: None }),
            MockResponse::error(BackendError::RateLimitError { retry_after: None }),
        ]);
        let fallback = Arc::new(MockLLMClient::with_name("fallback"));
        fallback.add_response(MockResponse::text("{}"));

        let gateway = LlmGateway::new(primary.clone(), fast_config()).with_fallback(fallback.clone());

        let response = gateway.complete(&request()).await.unwrap();
        assert_eq!(response.provider, "fallback");
        assert_eq!(response.attempts, 3);
        assert_eq!(primary.call_count(), 2);
        assert_eq!(fallback.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_without_fallback_surfaces_code() {
        let primary = Arc::new(MockLLMClient::with_name("primary"));
        primary.add_responses(vec![
            MockResponse::error(BackendError::RateLimitError { retry_after: Some(1) }),
            MockResponse::error(BackendError::RateLimitError { retry_after: Some(1) }),
        ]);
        let gateway = LlmGateway::new(primary.clone(), fast_config());

        let err = gateway.complete(&request()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::LlmRateLimit);
        assert_eq!(primary.call_count(), 2);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let primary = Arc::new(
            MockLLMClient::with_name("primary")
                .with_delay(Duration::from_millis(200))
                .with_fallback_response(MockResponse::text("{}")),
        );
        let gateway = LlmGateway::new(primary.clone(), fast_config());

        let err = gateway
            .complete(&request().with_timeout(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::LlmTimeout);
        assert_eq!(primary.call_count(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_skips_retry_and_fails_over() {
        let primary = Arc::new(MockLLMClient::with_name("primary"));
        primary.add_response(MockResponse::error(BackendError::AuthenticationError {
            message: "bad key".into(),
        }));
        let fallback = Arc::new(MockLLMClient::with_name("fallback"));
        fallback.add_response(MockResponse::text("{}"));

        let gateway = LlmGateway::new(primary.clone(), fast_config()).with_fallback(fallback.clone());

        let response = gateway.complete(&request()).await.unwrap();
        assert_eq!(response.provider, "fallback");
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_content_is_not_retried() {
        let primary = Arc::new(MockLLMClient::with_name("primary"));
        primary.add_response(MockResponse::text("   "));
        let fallback = Arc::new(MockLLMClient::with_name("fallback"));

        let gateway = LlmGateway::new(primary.clone(), fast_config()).with_fallback(fallback.clone());

        let err = gateway.complete(&request()).await.unwrap_err();
        assert!(err.is_content_failure());
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_hint_reorders_providers() {
        let primary = Arc::new(MockLLMClient::with_name("OpenAI"));
        let fallback = Arc::new(MockLLMClient::with_name("Anthropic"));
        fallback.add_response(MockResponse::text("{}"));

        let gateway = LlmGateway::new(primary.clone(), fast_config()).with_fallback(fallback.clone());

        let response = gateway
            .complete(&request().with_provider_hint(Some("anthropic".to_string())))
            .await
            .unwrap();
        assert_eq!(response.provider, "Anthropic");
        assert_eq!(primary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let client = Arc::new(
            MockLLMClient::new()
                .with_delay(Duration::from_millis(30))
                .with_fallback_response(MockResponse::text("{}")),
        );
        let gateway = Arc::new(LlmGateway::new(
            client.clone(),
            fast_config().with_max_concurrent_calls(2),
        ));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..6 {
            let gateway = gateway.clone();
            tasks.spawn(async move { gateway.complete(&request()).await });
        }
        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap().is_ok());
        }

        assert_eq!(client.call_count(), 6);
        assert!(client.peak_concurrency() <= 2);
    }

    #[test]
    fn test_backoff_doubles() {
        let config = GatewayConfig::default().with_backoff_base(Duration::from_millis(100));
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
    }
}
