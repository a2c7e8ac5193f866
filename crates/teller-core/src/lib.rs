//! Teller Core Library
//!
//! Shared functionality for the Teller statement question-answering tool:
//! - Raw document-extraction boundary (tables + key/value entities)
//! - Transaction normalizer with structured warnings
//! - Read-only statement ledger with derived summary fields
//! - Closed query tool contract exposed to the reasoning loop
//! - Chat backend abstraction and the tool-calling orchestrator

pub mod ai;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod normalize;
pub mod tools;

pub use ai::{
    AnswerResult, AnthropicBackend, ChatBackend, Orchestrator, ScriptedBackend, ToolCallRecord,
};
pub use error::{Error, Result};
pub use extract::{
    DocAiExtractor, DocumentExtractor, MockExtractor, RawCell, RawDocument, RawEntity, RawRow,
    RawTable,
};
pub use ledger::{StatementHeader, StatementLedger, Summary, Transaction, TransactionFilter};
pub use normalize::{normalize, Warning, WarningKind};
pub use tools::{
    invoke, tool_definitions, ToolPayload, ToolRequest, ToolResult, TransactionKind,
};
