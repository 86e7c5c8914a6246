use super::types::{LLMRequest, LLMResponse};
use crate::error::BackendError;
use async_trait::async_trait;

/// A single model provider
///
/// Implementations perform exactly one call per `chat` and never retry;
/// timeout, retry and fallback policy belong to [`super::LlmGateway`].
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError>;

    /// Provider name, also what a request's provider hint is matched against
    fn name(&self) -> &str;

    fn model_info(&self) -> Option<String> {
        None
    }
}
