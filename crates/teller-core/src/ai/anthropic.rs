//! Anthropic Messages API wire types and HTTP backend
//!
//! The tool-calling protocol the orchestrator drives: a conversation of
//! user/assistant messages whose content is either plain text or typed
//! blocks (`text`, `tool_use`, `tool_result`).
//!
//! Configuration comes from the environment:
//! - `ANTHROPIC_API_KEY`: required
//! - `ANTHROPIC_HOST`: optional, defaults to the hosted API; point it at any
//!   Anthropic-compatible server for local models
//! - `TELLER_MODEL`: optional model override

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::extract::require_env;

use super::ChatBackend;

const DEFAULT_HOST: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Messages API request body
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

/// One message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// Assistant turn echoed back with its original content blocks
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: "assistant".into(),
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Tool results travel as a user message of result blocks
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: "user".into(),
            content: MessageContent::Blocks(results),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: None,
        }
    }

    pub fn tool_error(tool_use_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: error.into(),
            is_error: Some(true),
        }
    }
}

/// A tool advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Messages API response
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub id: String,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

impl MessagesResponse {
    /// All tool_use blocks, in order
    pub fn tool_uses(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }

    /// Concatenated text content, if any
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

/// HTTP chat backend speaking the Messages API
#[derive(Clone)]
pub struct AnthropicBackend {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Create from environment; fails with a plain-language message naming
    /// the missing variable
    pub fn from_env() -> Result<Self> {
        let api_key = require_env("ANTHROPIC_API_KEY")?;
        let base_url =
            std::env::var("ANTHROPIC_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let model = std::env::var("TELLER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(&base_url, &api_key, &model))
    }

    /// Same host and key, different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: model.to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    async fn messages(
        &self,
        system: Option<&str>,
        messages: Vec<Message>,
        tools: Option<&[Tool]>,
    ) -> Result<MessagesResponse> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages,
            system: system.map(String::from),
            tools: tools.map(|t| t.to_vec()),
        };

        debug!(
            model = %self.model,
            tools = tools.map(|t| t.len()).unwrap_or(0),
            "Sending chat request"
        );

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %body, "Chat backend rejected the request");
            return Err(Error::Backend(format!("chat request failed with HTTP {status}")));
        }

        let parsed: MessagesResponse = response.json().await?;

        debug!(
            stop_reason = ?parsed.stop_reason,
            tool_uses = parsed.tool_uses().len(),
            "Received chat response"
        );

        Ok(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_accessors() {
        let json = r#"{
            "id": "msg_1",
            "content": [
                {"type": "text", "text": "Looking that up."},
                {"type": "tool_use", "id": "tu_1", "name": "summarize_statement", "input": {}}
            ],
            "model": "m",
            "stop_reason": "tool_use"
        }"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("Looking that up."));
        let uses = response.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].1, "summarize_statement");
    }

    #[test]
    fn test_tool_result_round_trip() {
        let block = ContentBlock::tool_error("tu_1", "Invalid request: unknown tool");
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"is_error\":true"));
        assert!(json.contains("\"tool_use_id\":\"tu_1\""));

        let ok = ContentBlock::tool_result("tu_2", "{}");
        let json = serde_json::to_string(&ok).unwrap();
        // Absent, not false, when the call succeeded
        assert!(!json.contains("is_error"));
    }

    #[test]
    fn test_plain_text_message_serializes_as_string() {
        let msg = Message::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hello"}"#);
    }
}
