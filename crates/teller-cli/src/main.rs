//! Teller CLI - ask questions about a bank statement PDF
//!
//! Usage:
//!   teller statement.pdf how much did I spend on rent in January
//!   teller --check-env
//!
//! The answer goes to stdout; all diagnostics go to the log stream on
//! stderr, so the two never mix.


use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use teller_core::{
    AnthropicBackend, ChatBackend, DocAiExtractor, DocumentExtractor, Error, Orchestrator,
};

#[derive(Parser, Debug)]
#[command(name = "teller", version, about = "Ask questions about a bank statement PDF")]
pub struct Cli {
    /// Path to the statement PDF
    #[arg(required_unless_present = "check_env")]
    pub pdf: Option<PathBuf>,

    /// The question to ask; remaining words are joined with spaces
    #[arg(required_unless_present = "check_env")]
    pub question: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate environment configuration and exit
    #[arg(long)]
    pub check_env: bool,

    /// Override the chat model
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum reasoning steps before giving up
    #[arg(long, default_value_t = 8)]
    pub max_steps: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    if cli.check_env {
        return cmd_check_env();
    }

    // clap guarantees both are present when --check-env is absent
    let Some(pdf) = cli.pdf else {
        bail!("a PDF path is required");
    };
    let question = cli.question.join(" ");

    if !pdf.is_file() {
        bail!("PDF file not found at {}", pdf.display());
    }

    info!(pdf = %pdf.display(), question = %question, "New session");

    let extractor = DocAiExtractor::from_env()?;
    let raw = extractor
        .process(&pdf)
        .await
        .context("document extraction failed")?;

    let ledger = match teller_core::normalize(&raw) {
        Ok(ledger) => ledger,
        Err(Error::ExtractionEmpty { rejected }) => {
            for label in &rejected {
                warn!(%label, "Rejected table");
            }
            bail!(
                "no transaction table was recognized in the document ({} table(s) seen)",
                rejected.len()
            );
        }
        Err(e) => return Err(e.into()),
    };

    for warning in ledger.warnings() {
        warn!(
            kind = ?warning.kind,
            table = ?warning.table_index,
            row = ?warning.row_index,
            "{}",
            warning.detail
        );
    }

    let mut backend = AnthropicBackend::from_env()?;
    if let Some(ref model) = cli.model {
        backend = backend.with_model(model);
    }

    let orchestrator =
        Orchestrator::new(Box::new(backend)).with_max_iterations(cli.max_steps);
    let result = orchestrator
        .answer(&ledger, &question)
        .await
        .context("question answering failed")?;

    for call in &result.tool_calls {
        debug!(tool = %call.name, success = call.success, "Tool call");
    }

    println!("{}", result.answer);
    Ok(())
}

/// Report whether both external boundaries are configured
fn cmd_check_env() -> Result<()> {
    let mut ok = true;

    match DocAiExtractor::from_env() {
        Ok(_) => println!("document extraction: OK"),
        Err(e) => {
            ok = false;
            println!("document extraction: {e}");
        }
    }

    match AnthropicBackend::from_env() {
        Ok(backend) => println!("chat backend: OK (model {})", backend.model()),
        Err(e) => {
            ok = false;
            println!("chat backend: {e}");
        }
    }

    if !ok {
        bail!("environment is not fully configured");
    }
    Ok(())
}
