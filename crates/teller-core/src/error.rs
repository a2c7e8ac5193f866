//! Error types for Teller

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Extraction service error: {0}")]
    Adapter(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing configuration: {0}")]
    Config(String),

    #[error("No transaction table recognized ({} table(s) seen and rejected)", rejected.len())]
    ExtractionEmpty { rejected: Vec<String> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("The statement contains no transactions")]
    EmptyLedger,

    #[error("Chat backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
