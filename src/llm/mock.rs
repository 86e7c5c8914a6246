use super::client::LLMClient;
use super::types::{LLMRequest, LLMResponse};
use crate::error::BackendError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted LLM client for deterministic tests
///
/// Responses are served in FIFO order. Every request is recorded so tests
/// can assert how many calls a pipeline made and what it sent.
pub struct MockLLMClient {
    responses: Mutex<VecDeque<MockResponse>>,
    fallback_response: Option<MockResponse>,
    requests: Mutex<Vec<LLMRequest>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    name: String,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: String,
    pub error: Option<BackendError>,
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: None,
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self::text(value.to_string())
    }

    pub fn error(error: BackendError) -> Self {
        Self {
            content: String::new(),
            error: Some(error),
        }
    }
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::with_name("MockLLM")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback_response: None,
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            name: name.into(),
        }
    }

    /// Served whenever the queue is empty, instead of failing
    pub fn with_fallback_response(mut self, response: MockResponse) -> Self {
        self.fallback_response = Some(response);
        self
    }

    /// Simulated latency of every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn add_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        let mut queue = self.responses.lock().unwrap();
        for response in responses {
            queue.push_back(response);
        }
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of calls that were executing at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        self.requests.lock().unwrap().push(request);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let response = next
            .or_else(|| self.fallback_response.clone())
            .ok_or_else(|| BackendError::Other {
                message: "MockLLMClient: No more responses in queue".to_string(),
            })?;

        if let Some(error) = response.error {
            return Err(error);
        }

        Ok(LLMResponse::text(response.content, self.delay))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_info(&self) -> Option<String> {
        Some("mock-model".to_string())
    }
}

impl std::fmt::Debug for MockLLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLLMClient")
            .field("name", &self.name)
            .field("remaining_responses", &self.remaining_responses())
            .field("calls", &self.call_count())
            .finish()
    }
}
