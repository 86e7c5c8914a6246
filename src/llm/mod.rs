//! LLM client abstraction layer
//!
//! This module provides a trait-based abstraction for LLM communication,
//! allowing different backends (GenAI, Mock) to be used interchangeably,
//! and the gateway that applies timeout, retry and fallback policy on top.

mod client;
mod gateway;
mod genai;
mod mock;
mod types;

pub use ::genai::adapter::AdapterKind;
pub use client::LLMClient;
pub use gateway::{
    GatewayConfig, GatewayRequest, GatewayResponse, LlmGateway, DEFAULT_BACKOFF_BASE,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENT_CALLS,
};
pub use genai::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
