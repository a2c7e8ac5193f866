//! The question-answering loop
//!
//! Drives a chat backend with the ledger's tool definitions until the model
//! stops asking for tools:
//!
//! 1. Send the system prompt, question, and tool definitions
//! 2. Execute every `tool_use` block against the ledger
//! 3. Feed the results (or errors) back as `tool_result` blocks
//! 4. Repeat until a text-only response or the step bound
//!
//! Tool failures (`InvalidRequest`, `EmptyLedger`) go back to the model as
//! error tool results so it can rephrase or caveat; they never abort the
//! session. Every tool invocation is recorded for diagnostics.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ledger::StatementLedger;
use crate::tools::{invoke, tool_definitions, ToolRequest};

use super::anthropic::{ContentBlock, Message};
use super::ChatBackend;

const SYSTEM_PROMPT: &str = "You are a careful assistant answering questions about one bank \
statement. Use the provided tools to look up transactions and summary figures; base every \
number in your answer on tool results, not on memory. Debits are negative amounts, credits \
positive. Answer concisely in plain language and never output raw JSON. When tool results \
carry warnings that affect the answer (for example skipped rows in the requested period), \
mention the limitation.";

const DEFAULT_MAX_STEPS: usize = 8;

/// Record of one tool invocation made during a session
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: serde_json::Value,
    pub success: bool,
    pub output: Option<String>,
}

/// Outcome of a question-answering session
#[derive(Debug)]
pub struct AnswerResult {
    /// The final natural-language answer
    pub answer: String,
    /// Every tool call made, in order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Backend round trips used
    pub iterations: usize,
}

/// Tool-calling loop over a read-only statement ledger
pub struct Orchestrator {
    backend: Box<dyn ChatBackend>,
    max_iterations: usize,
}

impl Orchestrator {
    pub fn new(backend: Box<dyn ChatBackend>) -> Self {
        Self {
            backend,
            max_iterations: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Answer one question against the ledger
    pub async fn answer(&self, ledger: &StatementLedger, question: &str) -> Result<AnswerResult> {
        let tools = tool_definitions();
        let mut messages = vec![Message::user(question)];
        let mut tool_calls: Vec<ToolCallRecord> = Vec::new();

        info!(
            model = %self.backend.model(),
            tools = tools.len(),
            transactions = ledger.len(),
            "Starting question-answering session"
        );

        for iteration in 0..self.max_iterations {
            let response = self
                .backend
                .messages(Some(SYSTEM_PROMPT), messages.clone(), Some(&tools))
                .await?;

            let requested: Vec<(String, String, serde_json::Value)> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            if requested.is_empty() {
                let answer = response
                    .text()
                    .ok_or_else(|| Error::Backend("response contained no text".into()))?;
                info!(
                    iterations = iteration + 1,
                    tool_calls = tool_calls.len(),
                    "Session complete"
                );
                return Ok(AnswerResult {
                    answer,
                    tool_calls,
                    iterations: iteration + 1,
                });
            }

            messages.push(Message::assistant_blocks(response.content.clone()));

            let mut results = Vec::new();
            for (id, name, input) in requested {
                debug!(tool = %name, %input, "Executing tool");

                let outcome = ToolRequest::from_call(&name, &input)
                    .and_then(|request| invoke(ledger, request))
                    .and_then(|result| result.to_json());

                match outcome {
                    Ok(json) => {
                        debug!(tool = %name, output_len = json.len(), "Tool succeeded");
                        results.push(ContentBlock::tool_result(&id, &json));
                        tool_calls.push(ToolCallRecord {
                            name,
                            input,
                            success: true,
                            output: Some(json),
                        });
                    }
                    Err(e) => {
                        warn!(tool = %name, error = %e, "Tool failed");
                        results.push(ContentBlock::tool_error(&id, e.to_string()));
                        tool_calls.push(ToolCallRecord {
                            name,
                            input,
                            success: false,
                            output: Some(e.to_string()),
                        });
                    }
                }
            }

            messages.push(Message::tool_results(results));
        }

        Err(Error::Backend(format!(
            "no final answer after {} step(s)",
            self.max_iterations
        )))
    }
}
