//! Provider client backed by the `genai` crate
//!
//! Covers Ollama, OpenAI, Anthropic, Gemini, xAI and Groq with one code path.
//! Provider failures are mapped onto `BackendError` so the gateway can tell
//! transient problems from permanent ones.

use super::client::LLMClient;
use super::types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
use crate::error::BackendError;
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{
    ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest,
    ChatResponseFormat,
};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// One configured provider/model pair behind the `genai` crate
pub struct GenAIClient {
    client: Client,
    model: String,
    provider: AdapterKind,
    /// Hard ceiling for a single call; the gateway applies tighter per-stage limits
    timeout: Duration,
}

impl GenAIClient {
    /// `endpoint` overrides the provider's default base URL (self-hosted
    /// gateways, OpenAI-compatible proxies)
    pub fn new(
        provider: AdapterKind,
        model: String,
        timeout: Duration,
        endpoint: Option<String>,
    ) -> Result<Self, BackendError> {
        if model.trim().is_empty() {
            return Err(BackendError::ConfigurationError {
                message: format!("No model configured for {}", provider.as_str()),
            });
        }

        debug!(
            provider = provider.as_str(),
            model = %model,
            endpoint = endpoint.as_deref().unwrap_or("default"),
            "Creating GenAI client"
        );

        let client = match endpoint {
            Some(url) => client_for_endpoint(provider, model.clone(), url),
            None => Client::default(),
        };

        Ok(Self {
            client,
            model,
            provider,
            timeout,
        })
    }
}

/// Routes every call to `url`, keeping the provider's usual API key variable
fn client_for_endpoint(provider: AdapterKind, model: String, url: String) -> Client {
    let resolver = ServiceTargetResolver::from_resolver_fn(
        move |_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let auth = provider
                .default_key_env_name()
                .map(AuthData::from_env)
                .unwrap_or_else(|| AuthData::from_single(""));

            Ok(ServiceTarget {
                endpoint: Endpoint::from_owned(url.clone()),
                auth,
                model: ModelIden::new(provider, &model),
            })
        },
    );

    Client::builder()
        .with_service_target_resolver(resolver)
        .build()
}

fn to_genai_message(message: &ChatMessage) -> GenAIChatMessage {
    match message.role {
        MessageRole::System => GenAIChatMessage::system(&message.content),
        MessageRole::User => GenAIChatMessage::user(&message.content),
        MessageRole::Assistant => GenAIChatMessage::assistant(&message.content),
    }
}

fn chat_options(request: &LLMRequest) -> ChatOptions {
    let mut options = ChatOptions::default();
    if let Some(temperature) = request.temperature {
        options = options.with_temperature(f64::from(temperature));
    }
    if let Some(max_tokens) = request.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }
    if request.json_mode {
        options = options.with_response_format(ChatResponseFormat::JsonMode);
    }
    options
}

/// First three-digit token in the 4xx/5xx range, e.g. `400` in "400 Bad Request"
/// or `status: 503` in a failed-status debug dump
fn http_status_in(message: &str) -> Option<u16> {
    message
        .split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 3)
        .filter_map(|token| token.parse::<u16>().ok())
        .find(|code| (400..=599).contains(code))
}

/// Maps a provider error message onto the transport taxonomy
pub(crate) fn classify_provider_error(message: &str) -> BackendError {
    match http_status_in(message) {
        Some(429) => return BackendError::RateLimitError { retry_after: None },
        Some(401) | Some(403) => {
            return BackendError::AuthenticationError {
                message: message.to_string(),
            }
        }
        Some(status) => {
            return BackendError::ApiError {
                message: message.to_string(),
                status_code: Some(status),
            }
        }
        None => {}
    }

    let lower = message.to_lowercase();

    if lower.contains("rate limit") || lower.contains("too many requests") {
        return BackendError::RateLimitError { retry_after: None };
    }

    if lower.contains("unauthorized") || lower.contains("api key") {
        return BackendError::AuthenticationError {
            message: message.to_string(),
        };
    }

    if lower.contains("connect") || lower.contains("dns") || lower.contains("broken pipe") {
        return BackendError::NetworkError {
            message: message.to_string(),
        };
    }

    BackendError::ApiError {
        message: message.to_string(),
        status_code: None,
    }
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let started = Instant::now();
        let provider = self.provider.as_str();

        let chat_request =
            GenAIChatRequest::new(request.messages.iter().map(to_genai_message).collect());
        let options = chat_options(&request);

        let call = self.client.exec_chat(&self.model, chat_request, Some(&options));
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(provider, model = %self.model, error = %e, "Provider call failed");
                return Err(classify_provider_error(&e.to_string()));
            }
            Err(_) => {
                error!(
                    provider,
                    model = %self.model,
                    timeout_secs = self.timeout.as_secs(),
                    "Provider call timed out"
                );
                return Err(BackendError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let content = response.first_text().unwrap_or_default().to_string();
        Ok(LLMResponse::text(content, started.elapsed()))
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
