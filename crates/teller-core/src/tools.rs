//! Query tool contract
//!
//! The closed request/response interface the ledger exposes to the reasoning
//! loop. Requests form a tagged enum, never free-form code: an unsupported
//! operation is a validation error at this seam, not a runtime surprise.
//! Every operation is a pure read over the ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ai::Tool;
use crate::error::{Error, Result};
use crate::ledger::{StatementLedger, Summary, Transaction, TransactionFilter};
use crate::normalize::Warning;

pub const LIST_TRANSACTIONS: &str = "list_transactions";
pub const SUMMARIZE_STATEMENT: &str = "summarize_statement";
pub const LARGEST_TRANSACTION: &str = "largest_transaction";
pub const TOTAL_BY_FILTER: &str = "total_by_filter";

/// Debit or credit, as the reasoning loop names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Debit,
    Credit,
}

/// Filter parameters shared by `list_transactions` and `total_by_filter`
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct FilterParams {
    /// Earliest transaction date to include (YYYY-MM-DD)
    #[schemars(description = "Earliest transaction date to include, YYYY-MM-DD")]
    pub start_date: Option<String>,

    /// Latest transaction date to include (YYYY-MM-DD)
    #[schemars(description = "Latest transaction date to include, YYYY-MM-DD")]
    pub end_date: Option<String>,

    /// Minimum signed amount (debits are negative)
    #[schemars(description = "Minimum signed amount; debits are negative numbers")]
    pub min_amount: Option<f64>,

    /// Maximum signed amount (debits are negative)
    #[schemars(description = "Maximum signed amount; debits are negative numbers")]
    pub max_amount: Option<f64>,

    /// Case-insensitive substring of the description
    #[schemars(description = "Case-insensitive substring to match in the description")]
    pub description_contains: Option<String>,
}

/// Parameters for `largest_transaction`
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LargestParams {
    /// Which kind to rank: debit (money out) or credit (money in)
    #[schemars(description = "Which kind to rank: 'debit' (money out) or 'credit' (money in)")]
    pub kind: TransactionKind,

    #[schemars(description = "Earliest transaction date to consider, YYYY-MM-DD")]
    pub start_date: Option<String>,

    #[schemars(description = "Latest transaction date to consider, YYYY-MM-DD")]
    pub end_date: Option<String>,
}

/// One validated request against the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    ListTransactions(TransactionFilter),
    Summarize,
    LargestOfKind {
        kind: TransactionKind,
        within_range: Option<(NaiveDate, NaiveDate)>,
    },
    TotalByFilter(TransactionFilter),
}

impl ToolRequest {
    /// Decode and validate a named tool call from the reasoning loop
    ///
    /// Unknown names, undecodable parameters, and contradictory filters all
    /// come back as [`Error::InvalidRequest`].
    pub fn from_call(name: &str, input: &serde_json::Value) -> Result<Self> {
        match name {
            LIST_TRANSACTIONS => {
                let params: FilterParams = decode_params(name, input)?;
                Ok(Self::ListTransactions(params.into_filter()?))
            }
            SUMMARIZE_STATEMENT => Ok(Self::Summarize),
            LARGEST_TRANSACTION => {
                let params: LargestParams = decode_params(name, input)?;
                let within_range =
                    date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
                Ok(Self::LargestOfKind {
                    kind: params.kind,
                    within_range,
                })
            }
            TOTAL_BY_FILTER => {
                let params: FilterParams = decode_params(name, input)?;
                Ok(Self::TotalByFilter(params.into_filter()?))
            }
            other => Err(Error::InvalidRequest(format!("unknown tool '{other}'"))),
        }
    }
}

fn decode_params<T: serde::de::DeserializeOwned>(name: &str, input: &serde_json::Value) -> Result<T> {
    serde_json::from_value(input.clone())
        .map_err(|e| Error::InvalidRequest(format!("bad parameters for {name}: {e}")))
}

fn parse_date_param(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                Error::InvalidRequest(format!("{field} must be YYYY-MM-DD, got '{v}'"))
            }),
    }
}

/// Build an inclusive range from optional bounds, validating order
fn date_range(start: Option<&str>, end: Option<&str>) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let start = parse_date_param("start_date", start)?;
    let end = parse_date_param("end_date", end)?;
    match (start, end) {
        (None, None) => Ok(None),
        (Some(s), Some(e)) if s > e => Err(Error::InvalidRequest(format!(
            "start_date {s} is after end_date {e}"
        ))),
        (s, e) => Ok(Some((
            s.unwrap_or(NaiveDate::MIN),
            e.unwrap_or(NaiveDate::MAX),
        ))),
    }
}

impl FilterParams {
    fn into_filter(self) -> Result<TransactionFilter> {
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(Error::InvalidRequest(format!(
                    "min_amount {min} is greater than max_amount {max}"
                )));
            }
        }
        Ok(TransactionFilter {
            date_range: date_range(self.start_date.as_deref(), self.end_date.as_deref())?,
            min_amount: self.min_amount,
            max_amount: self.max_amount,
            description_contains: self.description_contains,
        })
    }
}

/// A transaction as rendered into tool results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRow {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub running_balance: Option<f64>,
}

impl From<&Transaction> for TransactionRow {
    fn from(t: &Transaction) -> Self {
        Self {
            date: t.date,
            description: t.description.clone(),
            amount: t.amount,
            running_balance: t.running_balance,
        }
    }
}

/// Payload of a tool result: matched transactions or an aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolPayload {
    Transactions {
        transactions: Vec<TransactionRow>,
        count: usize,
    },
    Summary {
        summary: Summary,
    },
    Largest {
        /// None when nothing of the requested kind matched (distinct from
        /// an empty ledger, which is an error)
        transaction: Option<TransactionRow>,
    },
    Total {
        /// Sum of signed amounts over the matches
        total: f64,
        count: usize,
    },
}

/// What a tool call returns to the reasoning loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    #[serde(flatten)]
    pub payload: ToolPayload,
    /// Normalizer warnings the caller should caveat its answer with
    pub warnings: Vec<Warning>,
}

impl ToolResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Execute one request against the ledger
///
/// Pure and side-effect free. Fails with [`Error::EmptyLedger`] when the
/// ledger holds zero transactions, so the caller can distinguish "nothing
/// extracted" from "no matches".
pub fn invoke(ledger: &StatementLedger, request: ToolRequest) -> Result<ToolResult> {
    if ledger.is_empty() {
        return Err(Error::EmptyLedger);
    }

    // Skipped rows carry no date, so range relevance cannot be decided for
    // them; every warning propagates and the caller decides what to caveat.
    let warnings = ledger.warnings().to_vec();

    let payload = match request {
        ToolRequest::ListTransactions(filter) => {
            let matches = ledger.transactions_matching(&filter);
            ToolPayload::Transactions {
                count: matches.len(),
                transactions: matches.into_iter().map(TransactionRow::from).collect(),
            }
        }
        ToolRequest::Summarize => ToolPayload::Summary {
            summary: ledger.summary().clone(),
        },
        ToolRequest::LargestOfKind { kind, within_range } => {
            let filter = TransactionFilter {
                date_range: within_range,
                ..Default::default()
            };
            let largest = ledger
                .transactions_matching(&filter)
                .into_iter()
                .filter(|t| match kind {
                    TransactionKind::Debit => t.amount < 0.0,
                    TransactionKind::Credit => t.amount > 0.0,
                })
                .max_by(|a, b| a.amount.abs().total_cmp(&b.amount.abs()));
            ToolPayload::Largest {
                transaction: largest.map(TransactionRow::from),
            }
        }
        ToolRequest::TotalByFilter(filter) => {
            let matches = ledger.transactions_matching(&filter);
            ToolPayload::Total {
                total: matches.iter().map(|t| t.amount).sum(),
                count: matches.len(),
            }
        }
    };

    Ok(ToolResult { payload, warnings })
}

/// Tool definitions advertised to the chat backend
pub fn tool_definitions() -> Vec<Tool> {
    let filter_schema = schema_of::<FilterParams>();
    vec![
        Tool::new(
            LIST_TRANSACTIONS,
            "List the statement's transactions, optionally filtered by date range, \
             signed amount bounds, or a description substring. Returns each match \
             with date, description, signed amount, and running balance.",
            filter_schema.clone(),
        ),
        Tool::new(
            SUMMARIZE_STATEMENT,
            "Summarize the statement: account holder, opening and closing balance, \
             total debits and credits, statement period, and transaction count.",
            serde_json::json!({"type": "object", "properties": {}}),
        ),
        Tool::new(
            LARGEST_TRANSACTION,
            "Find the largest transaction of a kind ('debit' or 'credit') by \
             magnitude, optionally within a date range.",
            schema_of::<LargestParams>(),
        ),
        Tool::new(
            TOTAL_BY_FILTER,
            "Sum the signed amounts of the transactions matching the same filters \
             as list_transactions.",
            filter_schema,
        ),
    ]
}

fn schema_of<T: schemars::JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).expect("tool schema serializes")
}
