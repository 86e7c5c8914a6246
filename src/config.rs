//! Configuration management for proposal-analyzer
//!
//! Settings are loaded from environment variables with sensible defaults and
//! then injected into the gateway and pipeline at construction time. Nothing
//! reads ambient state after that point.
//!
//! # Environment Variables
//!
//! - `PROPOSAL_PROVIDER`: primary provider (ollama|openai|anthropic|gemini|xai|groq|deepseek) - default: "ollama"
//! - `PROPOSAL_MODEL`: model for the primary provider - default depends on provider
//! - `PROPOSAL_FALLBACK_PROVIDER`, `PROPOSAL_FALLBACK_MODEL`: optional fallback provider
//! - `PROPOSAL_API_BASE_URL`: optional endpoint override for the primary provider
//! - `PROPOSAL_REQUEST_TIMEOUT`: hard ceiling per provider call in seconds - default: "120"
//! - `PROPOSAL_MAX_CONCURRENCY`: simultaneous LLM calls across all sessions - default: "4"
//! - `PROPOSAL_MAX_ATTEMPTS`: transport attempts per provider - default: "2"
//! - `PROPOSAL_BACKOFF_MS`: first retry backoff, doubled per attempt - default: "500"
//! - `PROPOSAL_MIN_JUSTIFICATION_WORDS`: quality floor per criterion - default: "30"
//! - `PROPOSAL_MAX_TOKENS`, `PROPOSAL_TEMPERATURE`: generation settings
//! - `PROPOSAL_LOG_LEVEL`: logging level - default: "info"
//!
//! Provider credentials are read by genai itself (`OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`, `OLLAMA_HOST`, ...).

use crate::error::BackendError;
use crate::llm::{AdapterKind, GatewayConfig, GenAIClient, LlmGateway};
use crate::pipeline::PipelineConfig;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_MAX_ATTEMPTS: u32 = 2;
const DEFAULT_BACKOFF_MS: u64 = 500;
const DEFAULT_MIN_JUSTIFICATION_WORDS: usize = 30;
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: ollama, openai, anthropic, gemini, xai, groq, deepseek")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Backend initialization failed: {0}")]
    BackendInitError(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub provider: AdapterKind,
    pub model: String,
    pub fallback_provider: Option<AdapterKind>,
    pub fallback_model: Option<String>,
    pub api_base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub max_concurrent_llm_calls: usize,
    pub max_transport_attempts: u32,
    pub backoff_base_ms: u64,
    pub min_justification_words: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub log_level: String,
}

impl Default for AnalyzerConfig {
    /// Loads `PROPOSAL_*` variables; unparsable values fall back to defaults with a warning
    fn default() -> Self {
        let provider = env_value("PROPOSAL_PROVIDER")
            .and_then(|s| lenient(parse_provider(&s), "PROPOSAL_PROVIDER"))
            .unwrap_or(AdapterKind::Ollama);

        let model = env_value("PROPOSAL_MODEL")
            .unwrap_or_else(|| default_model(provider).to_string());

        let fallback_provider = env_value("PROPOSAL_FALLBACK_PROVIDER")
            .and_then(|s| lenient(parse_provider(&s), "PROPOSAL_FALLBACK_PROVIDER"));

        let fallback_model = env_value("PROPOSAL_FALLBACK_MODEL").or_else(|| {
            fallback_provider
                .map(default_model)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
        });

        Self {
            provider,
            model,
            fallback_provider,
            fallback_model,
            api_base_url: env_value("PROPOSAL_API_BASE_URL"),
            request_timeout_secs: env_or("PROPOSAL_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrent_llm_calls: env_or("PROPOSAL_MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY),
            max_transport_attempts: env_or("PROPOSAL_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            backoff_base_ms: env_or("PROPOSAL_BACKOFF_MS", DEFAULT_BACKOFF_MS),
            min_justification_words: env_or(
                "PROPOSAL_MIN_JUSTIFICATION_WORDS",
                DEFAULT_MIN_JUSTIFICATION_WORDS,
            ),
            max_tokens: env_or("PROPOSAL_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            temperature: env_or("PROPOSAL_TEMPERATURE", DEFAULT_TEMPERATURE),
            log_level: env_value("PROPOSAL_LOG_LEVEL")
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
        }
    }
}

impl AnalyzerConfig {
    /// Validates the configuration
    ///
    /// Provider credentials are not checked here; genai reports them on the
    /// first call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(format!(
                "No model configured for {}. Set PROPOSAL_MODEL",
                self.provider.as_str()
            )));
        }

        if self.fallback_provider.is_some()
            && self.fallback_model.as_deref().map_or(true, |m| m.trim().is_empty())
        {
            return Err(ConfigError::ValidationFailed(
                "PROPOSAL_FALLBACK_MODEL is required when a fallback provider is set".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be between 1 second and 10 minutes".to_string(),
            ));
        }

        if self.max_concurrent_llm_calls == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max concurrency must be at least 1".to_string(),
            ));
        }

        if !(1..=5).contains(&self.max_transport_attempts) {
            return Err(ConfigError::ValidationFailed(
                "Max attempts must be between 1 and 5".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Replaces the primary provider; without an explicit model the provider default is used
    pub fn with_provider(mut self, provider: AdapterKind, model: Option<String>) -> Self {
        if provider != self.provider && model.is_none() {
            self.model = default_model(provider).to_string();
        }
        self.provider = provider;
        if let Some(model) = model {
            self.model = model;
        }
        self
    }

    pub fn to_gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            max_attempts: self.max_transport_attempts,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            max_concurrent_calls: self.max_concurrent_llm_calls,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default().with_min_justification_words(self.min_justification_words)
    }

    /// Builds the gateway with a genai client for the primary and optional fallback provider
    pub fn create_gateway(&self) -> Result<Arc<LlmGateway>, ConfigError> {
        self.validate()?;
        let timeout = Duration::from_secs(self.request_timeout_secs);

        let primary = GenAIClient::new(
            self.provider,
            self.model.clone(),
            timeout,
            self.api_base_url.clone(),
        )?;
        let mut gateway = LlmGateway::new(Arc::new(primary), self.to_gateway_config());

        if let (Some(provider), Some(model)) = (self.fallback_provider, &self.fallback_model) {
            let fallback = GenAIClient::new(provider, model.clone(), timeout, None)?;
            gateway = gateway.with_fallback(Arc::new(fallback));
        }

        Ok(Arc::new(gateway))
    }

    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        if let Some(provider) = self.fallback_provider {
            map.insert("fallback_provider".to_string(), provider.as_str().to_string());
        }
        if let Some(ref model) = self.fallback_model {
            map.insert("fallback_model".to_string(), model.clone());
        }
        if let Some(ref url) = self.api_base_url {
            map.insert("api_base_url".to_string(), url.clone());
        }
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "max_concurrent_llm_calls".to_string(),
            self.max_concurrent_llm_calls.to_string(),
        );
        map.insert(
            "max_transport_attempts".to_string(),
            self.max_transport_attempts.to_string(),
        );
        map.insert("backoff_base_ms".to_string(), self.backoff_base_ms.to_string());
        map.insert(
            "min_justification_words".to_string(),
            self.min_justification_words.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Proposal Analyzer Configuration:")?;
        writeln!(f, "  Provider: {} ({})", self.provider.as_str(), self.model)?;
        if let (Some(provider), Some(model)) = (self.fallback_provider, &self.fallback_model) {
            writeln!(f, "  Fallback: {} ({})", provider.as_str(), model)?;
        }
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Max Concurrency: {}", self.max_concurrent_llm_calls)?;
        writeln!(
            f,
            "  Retries: {} attempts, {}ms backoff",
            self.max_transport_attempts, self.backoff_base_ms
        )?;
        writeln!(f, "  Min Justification: {} words", self.min_justification_words)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

pub fn parse_provider(s: &str) -> Result<AdapterKind, ConfigError> {
    let lower = s.trim().to_lowercase();
    let name = match lower.as_str() {
        "claude" => "anthropic",
        "grok" => "xai",
        other => other,
    };
    AdapterKind::from_lower_str(name).ok_or_else(|| ConfigError::InvalidProvider(s.to_string()))
}

fn default_model(provider: AdapterKind) -> &'static str {
    match provider {
        AdapterKind::Ollama => "qwen2.5:7b",
        AdapterKind::OpenAI => "gpt-4o-mini",
        AdapterKind::Anthropic => "claude-3-5-haiku-latest",
        AdapterKind::Gemini => "gemini-2.0-flash",
        AdapterKind::Groq => "llama-3.3-70b-versatile",
        _ => "",
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T
where
    T::Err: fmt::Display,
{
    env_value(key)
        .and_then(|raw| {
            lenient(
                raw.parse::<T>().map_err(|e| ConfigError::ParseError {
                    field: key.to_string(),
                    error: e.to_string(),
                }),
                key,
            )
        })
        .unwrap_or(default)
}

fn lenient<T>(result: Result<T, ConfigError>, key: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(variable = key, error = %e, "Ignoring invalid configuration value");
            None
        }
    }
}
