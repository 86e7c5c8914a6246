//! Provider-neutral request and response types

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// One provider call
///
/// Generation settings left as `None` use the provider defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct LLMRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask for a bare JSON object where the provider supports it
    pub json_mode: bool,
}

impl LLMRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            json_mode: false,
        }
    }

    /// System instructions followed by a single user turn
    pub fn prompt(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::system(system), ChatMessage::user(user)])
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn system_content(&self) -> String {
        self.content_of(MessageRole::System)
    }

    pub fn user_content(&self) -> String {
        self.content_of(MessageRole::User)
    }

    fn content_of(&self, role: MessageRole) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == role)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub response_time: Duration,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>, response_time: Duration) -> Self {
        Self {
            content: content.into(),
            response_time,
        }
    }

    /// Whitespace-only bodies count as no answer at all
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_request() {
        let request = LLMRequest::prompt("You are a procurement analyst", "Compare TZ and KP")
            .with_temperature(0.2)
            .with_max_tokens(1024)
            .with_json_mode();

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.system_content(), "You are a procurement analyst");
        assert_eq!(request.user_content(), "Compare TZ and KP");
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(1024));
        assert!(request.json_mode);
    }

    #[test]
    fn test_user_content_joins_turns() {
        let request = LLMRequest::new(vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("ok"),
            ChatMessage::user("second"),
        ]);
        assert_eq!(request.user_content(), "first\nsecond");
        assert_eq!(request.system_content(), "");
    }

    #[test]
    fn test_blank_response() {
        assert!(LLMResponse::text("  \n", Duration::ZERO).is_blank());
        assert!(!LLMResponse::text("{}", Duration::ZERO).is_blank());
    }
}
