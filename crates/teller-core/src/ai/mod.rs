//! Chat backend abstraction for the question-answering loop
//!
//! - `ChatBackend` trait: the one operation the orchestrator needs
//! - `AnthropicBackend`: Messages-API implementation over HTTP
//! - `ScriptedBackend`: deterministic backend for tests
//! - `Orchestrator`: the tool-calling loop over a statement ledger
//!
//! Backends speak the Anthropic Messages wire format, so any compatible
//! server (hosted or local) works by pointing `ANTHROPIC_HOST` at it.

pub mod anthropic;
pub mod mock;
pub mod orchestrator;

pub use anthropic::{AnthropicBackend, ContentBlock, Message, MessagesResponse, Tool, Usage};
pub use mock::ScriptedBackend;
pub use orchestrator::{AnswerResult, Orchestrator, ToolCallRecord};

use async_trait::async_trait;

use crate::error::Result;

/// Interface every chat backend implements
///
/// Backends are Send + Sync so the orchestrator can hold them behind a
/// trait object.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one Messages request, optionally advertising tools
    async fn messages(
        &self,
        system: Option<&str>,
        messages: Vec<Message>,
        tools: Option<&[Tool]>,
    ) -> Result<MessagesResponse>;

    /// Model name, for logging
    fn model(&self) -> &str;
}
