//! Scripted chat backend for tests
//!
//! Returns a fixed sequence of responses, one per `messages` call, so
//! orchestrator behavior can be exercised without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::anthropic::{ContentBlock, Message, MessagesResponse, Tool};
use super::ChatBackend;

pub struct ScriptedBackend {
    responses: Mutex<VecDeque<MessagesResponse>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<MessagesResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    /// A final text-only turn
    pub fn text_turn(text: &str) -> MessagesResponse {
        Self::turn(vec![ContentBlock::text(text)], "end_turn")
    }

    /// A turn requesting one tool call
    pub fn tool_use_turn(id: &str, name: &str, input: serde_json::Value) -> MessagesResponse {
        Self::turn(vec![ContentBlock::tool_use(id, name, input)], "tool_use")
    }

    fn turn(content: Vec<ContentBlock>, stop_reason: &str) -> MessagesResponse {
        MessagesResponse {
            id: "msg_scripted".to_string(),
            content,
            model: "scripted".to_string(),
            stop_reason: Some(stop_reason.to_string()),
            usage: None,
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn messages(
        &self,
        _system: Option<&str>,
        _messages: Vec<Message>,
        _tools: Option<&[Tool]>,
    ) -> Result<MessagesResponse> {
        self.responses
            .lock()
            .expect("script lock")
            .pop_front()
            .ok_or_else(|| Error::Backend("scripted backend exhausted".into()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
