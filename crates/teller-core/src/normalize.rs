//! Transaction normalizer
//!
//! Turns raw extraction output into a [`StatementLedger`]:
//! - picks the transaction table(s) out of whatever the extraction service
//!   detected, by header keywords
//! - resolves column roles through an ordered strategy list (header synonyms
//!   first, positional fallback second)
//! - parses dates and amounts per row, normalizing sign conventions
//! - attaches stated header fields from key/value entities
//! - reconciles computed totals against the stated closing balance
//!
//! Anything that only degrades completeness (an unparsable row, an ignored
//! fee-schedule table, a reconciliation mismatch) becomes a structured
//! [`Warning`] on the ledger. The one fatal case is a document with no
//! recognizable transaction table at all.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::extract::{RawCell, RawDocument, RawEntity, RawTable};
use crate::ledger::{StatementHeader, StatementLedger, Summary, Transaction};

/// What kind of degradation a warning records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A detected table did not look like a transaction register
    NonTransactionalTable,
    /// Column roles were guessed positionally, not read from a header
    LowConfidenceColumns,
    /// A row was skipped because its date or amount did not parse
    UnparsableRow,
    /// A row's date falls outside the statement's stated period
    OutOfPeriodRow,
    /// Computed closing balance disagrees with the stated one
    ReconciliationMismatch,
}

/// A non-fatal, structured record of a degraded or skipped extraction step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub table_index: Option<usize>,
    pub row_index: Option<usize>,
    pub detail: String,
}

impl Warning {
    fn table(kind: WarningKind, table_index: usize, detail: impl Into<String>) -> Self {
        Self {
            kind,
            table_index: Some(table_index),
            row_index: None,
            detail: detail.into(),
        }
    }

    fn row(kind: WarningKind, table_index: usize, row_index: usize, detail: impl Into<String>) -> Self {
        Self {
            kind,
            table_index: Some(table_index),
            row_index: Some(row_index),
            detail: detail.into(),
        }
    }

    fn statement(kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            table_index: None,
            row_index: None,
            detail: detail.into(),
        }
    }
}

// =============================================================================
// Column roles
// =============================================================================

/// Where the amount lives in a resolved table
#[derive(Debug, Clone, PartialEq, Eq)]
enum AmountColumns {
    /// One signed amount column; per-cell markers decide debit vs credit
    Single(usize),
    /// A lone money-out column; values are debits whatever their sign
    DebitOnly(usize),
    /// Separate debit and credit columns; the column decides the sign
    Split { debit: usize, credit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnRoles {
    date: usize,
    description: Option<usize>,
    amount: AmountColumns,
    balance: Option<usize>,
}

impl ColumnRoles {
    /// Highest column index the roles reference; rows shorter than this are
    /// skipped with a warning
    fn max_index(&self) -> usize {
        let mut max = self.date;
        if let Some(d) = self.description {
            max = max.max(d);
        }
        match self.amount {
            AmountColumns::Single(a) | AmountColumns::DebitOnly(a) => max = max.max(a),
            AmountColumns::Split { debit, credit } => max = max.max(debit).max(credit),
        }
        if let Some(b) = self.balance {
            max = max.max(b);
        }
        max
    }
}

// Header synonyms, matched as case-insensitive substrings
const DATE_HEADERS: &[&str] = &["date", "posted", "posting"];
const DESC_HEADERS: &[&str] = &["description", "details", "narrative", "particulars", "memo"];
const DEBIT_HEADERS: &[&str] = &["debit", "withdrawal", "money out", "paid out"];
const CREDIT_HEADERS: &[&str] = &["credit", "deposit", "money in", "paid in"];
const AMOUNT_HEADERS: &[&str] = &["amount", "value"];
const BALANCE_HEADERS: &[&str] = &["balance", "running bal"];

fn matches_any(header: &str, synonyms: &[&str]) -> bool {
    synonyms.iter().any(|kw| header.contains(kw))
}

/// Does this header row look like a transaction register?
///
/// Requires a date column, a description column, and some money column.
fn is_transaction_header(headers: &[String]) -> bool {
    let has_date = headers.iter().any(|h| matches_any(h, DATE_HEADERS));
    let has_desc = headers.iter().any(|h| matches_any(h, DESC_HEADERS));
    let has_money = headers.iter().any(|h| {
        matches_any(h, AMOUNT_HEADERS)
            || matches_any(h, DEBIT_HEADERS)
            || matches_any(h, CREDIT_HEADERS)
    });
    has_date && has_desc && has_money
}

/// Resolve roles from a detected header row
fn columns_from_header(table: &RawTable) -> Option<ColumnRoles> {
    let header_row = table.header_row()?;
    let headers: Vec<String> = header_row
        .cells
        .iter()
        .map(|c| c.text.to_lowercase())
        .collect();

    if !is_transaction_header(&headers) {
        return None;
    }

    let find = |synonyms: &[&str], exclude: &[usize]| -> Option<usize> {
        headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !exclude.contains(i))
            .find(|(_, h)| matches_any(h.as_str(), synonyms))
            .map(|(i, _)| i)
    };

    let date = find(DATE_HEADERS, &[])?;
    let description = find(DESC_HEADERS, &[date]);
    let mut used = vec![date];
    used.extend(description);
    let balance = find(BALANCE_HEADERS, &used);
    used.extend(balance);
    let debit = find(DEBIT_HEADERS, &used);
    used.extend(debit);
    let credit = find(CREDIT_HEADERS, &used);
    used.extend(credit);

    // A header like "Value Date" is a date column, never the amount column.
    let amount_col = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| !used.contains(i) && !matches_any(h.as_str(), DATE_HEADERS))
        .find(|(_, h)| matches_any(h.as_str(), AMOUNT_HEADERS))
        .map(|(i, _)| i);

    let amount = match (amount_col, debit, credit) {
        (_, Some(debit), Some(credit)) => AmountColumns::Split { debit, credit },
        (Some(col), _, _) => AmountColumns::Single(col),
        // A lone withdrawals column lists unsigned magnitudes
        (None, Some(col), None) => AmountColumns::DebitOnly(col),
        (None, None, Some(col)) => AmountColumns::Single(col),
        (None, None, None) => return None,
    };

    Some(ColumnRoles {
        date,
        description,
        amount,
        balance,
    })
}

/// Positional fallback for tables with no detected header row
///
/// First column must hold a date; the last numeric column is the balance
/// when more than one numeric column exists; the remaining numeric column is
/// the amount; the first non-numeric column after the date is the
/// description.
fn columns_by_position(table: &RawTable) -> Option<ColumnRoles> {
    if table.header_row().is_some() {
        return None;
    }
    let (_, first_row) = table.data_rows().next()?;
    let cells = &first_row.cells;
    if cells.len() < 2 || parse_statement_date(&cells[0].text).is_none() {
        return None;
    }

    let numeric: Vec<usize> = cells
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, c)| parse_signed_amount(&c.text).is_some())
        .map(|(i, _)| i)
        .collect();

    let (amount, balance) = match numeric.as_slice() {
        [] => return None,
        [only] => (*only, None),
        [.., amount, balance] => (*amount, Some(*balance)),
    };

    let description = cells
        .iter()
        .enumerate()
        .skip(1)
        .find(|(i, c)| !numeric.contains(i) && !c.text.trim().is_empty())
        .map(|(i, _)| i);

    Some(ColumnRoles {
        date: 0,
        description,
        amount: AmountColumns::Single(amount),
        balance,
    })
}

/// Ordered column-role strategies; first match wins. New statement layouts
/// are supported by appending a strategy.
const COLUMN_STRATEGIES: &[(&str, fn(&RawTable) -> Option<ColumnRoles>)] = &[
    ("header-synonyms", columns_from_header),
    ("positional", columns_by_position),
];

fn resolve_columns(table: &RawTable) -> Option<(&'static str, ColumnRoles)> {
    COLUMN_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(table).map(|roles| (*name, roles)))
}

// =============================================================================
// Cell parsing
// =============================================================================

/// Accepted statement date formats, tried in order
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y", // 01/15/2024
    "%m/%d/%y", // 01/15/24
    "%Y-%m-%d", // 2024-01-15
    "%d/%m/%Y", // 15/01/2024
    "%d-%m-%Y", // 15-01-2024
    "%d %b %Y", // 15 Jan 2024
    "%d-%b-%Y", // 15-Jan-2024
    "%d %B %Y", // 15 January 2024
    "%b %d, %Y", // Jan 15, 2024
];

pub(crate) fn parse_statement_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse a monetary cell, normalizing sign conventions
///
/// Handles currency symbols, thousands separators, parenthesized negatives,
/// leading/trailing minus, and `CR`/`DR` suffixes. Returns `None` for empty
/// or non-numeric cells.
pub(crate) fn parse_signed_amount(s: &str) -> Option<f64> {
    let mut t = s.trim().to_string();
    if t.is_empty() {
        return None;
    }

    let mut negative = false;
    if t.starts_with('(') && t.ends_with(')') {
        negative = true;
        t = t[1..t.len() - 1].trim().to_string();
    }

    let upper = t.to_uppercase();
    if upper.ends_with("DR") {
        negative = true;
        t.truncate(t.len() - 2);
    } else if upper.ends_with("CR") {
        t.truncate(t.len() - 2);
    }

    if t.trim_end().ends_with('-') {
        negative = true;
        t = t.trim_end().trim_end_matches('-').to_string();
    }

    let cleaned: String = t
        .chars()
        .filter(|c| !matches!(c, '$' | '£' | '€' | ',' | ' ' | '+'))
        .collect();

    let value: f64 = cleaned.parse().ok().filter(|v: &f64| v.is_finite())?;
    Some(if negative { -value.abs() } else { value })
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// Header entities
// =============================================================================

const PERIOD_SEPARATORS: &[&str] = &[" to ", " through ", " – ", " - "];

fn parse_period(value: &str) -> Option<(NaiveDate, NaiveDate)> {
    for sep in PERIOD_SEPARATORS {
        if let Some((left, right)) = value.split_once(sep) {
            if let (Some(start), Some(end)) =
                (parse_statement_date(left), parse_statement_date(right))
            {
                if start <= end {
                    return Some((start, end));
                }
            }
        }
    }
    None
}

/// Pull stated fields out of the key/value entities
fn statement_header(entities: &[RawEntity]) -> StatementHeader {
    let mut header = StatementHeader::default();

    for entity in entities {
        let name = entity.name.to_lowercase();
        let value = entity.value.trim();
        if value.is_empty() {
            continue;
        }

        if header.account_holder.is_none() && (name.contains("holder") || name.contains("customer"))
        {
            header.account_holder = Some(normalize_whitespace(value));
        } else if header.period_raw.is_none() && name.contains("period") {
            header.period_raw = Some(value.to_string());
            header.period = parse_period(value);
        } else if header.opening_balance.is_none() && name.contains("opening") {
            header.opening_balance = parse_signed_amount(value);
        } else if header.closing_balance.is_none()
            && (name.contains("closing") || name.contains("ending"))
        {
            header.closing_balance = parse_signed_amount(value);
        }
    }

    header
}

// =============================================================================
// Row parsing
// =============================================================================

enum RowOutcome {
    Parsed(Transaction),
    Skipped(String),
}

fn parse_row(cells: &[RawCell], roles: &ColumnRoles, row_index: usize) -> RowOutcome {
    if cells.len() <= roles.max_index() {
        return RowOutcome::Skipped(format!(
            "row has {} cell(s), columns need {}",
            cells.len(),
            roles.max_index() + 1
        ));
    }

    let date_text = cells[roles.date].text.trim();
    let Some(date) = parse_statement_date(date_text) else {
        return RowOutcome::Skipped(format!("unparsable date '{date_text}'"));
    };

    let amount = match roles.amount {
        AmountColumns::Single(col) => parse_signed_amount(&cells[col].text),
        AmountColumns::DebitOnly(col) => parse_signed_amount(&cells[col].text).map(|v| -v.abs()),
        AmountColumns::Split { debit, credit } => {
            // Header-declared roles decide the sign; cell markers only
            // contribute magnitude.
            match parse_signed_amount(&cells[debit].text) {
                Some(d) if d != 0.0 => Some(-d.abs()),
                _ => parse_signed_amount(&cells[credit].text).map(f64::abs),
            }
        }
    };
    let amount = match amount {
        Some(a) if a != 0.0 => a,
        Some(_) => return RowOutcome::Skipped("zero amount".to_string()),
        None => return RowOutcome::Skipped("no parsable amount".to_string()),
    };

    let description = roles
        .description
        .map(|col| normalize_whitespace(&cells[col].text))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| fallback_description(cells, roles));

    let running_balance = roles
        .balance
        .and_then(|col| parse_signed_amount(&cells[col].text));

    RowOutcome::Parsed(Transaction {
        date,
        description,
        amount,
        running_balance,
        raw_row_index: row_index,
    })
}

/// No description column resolved (or the cell was blank): fall back to the
/// first raw cell not already claimed by another role.
fn fallback_description(cells: &[RawCell], roles: &ColumnRoles) -> String {
    let claimed = |i: usize| {
        i == roles.date
            || roles.balance == Some(i)
            || match roles.amount {
                AmountColumns::Single(a) | AmountColumns::DebitOnly(a) => i == a,
                AmountColumns::Split { debit, credit } => i == debit || i == credit,
            }
    };

    cells
        .iter()
        .enumerate()
        .filter(|(i, _)| !claimed(*i))
        .map(|(_, c)| normalize_whitespace(&c.text))
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| normalize_whitespace(&cells[roles.date].text))
}

fn table_label(table: &RawTable, index: usize) -> String {
    match table.header_row() {
        Some(row) => {
            let headers: Vec<&str> = row.cells.iter().map(|c| c.text.as_str()).collect();
            format!("table {}: [{}]", index, headers.join(", "))
        }
        None => format!("table {index}: (no header row)"),
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Reconciliation tolerance, in currency units
const RECONCILE_TOLERANCE: f64 = 0.01;

/// Build a statement ledger from raw extraction output
///
/// Returns [`Error::ExtractionEmpty`] when no table matches a transaction
/// register; every other degradation becomes a [`Warning`] on the ledger.
/// Deterministic: identical input yields an identical ledger.
pub fn normalize(raw: &RawDocument) -> Result<StatementLedger> {
    let mut warnings = Vec::new();
    let mut transactions = Vec::new();
    let mut rejected = Vec::new();
    let mut matched_tables = 0usize;

    let header = statement_header(&raw.entities);

    for (table_index, table) in raw.tables.iter().enumerate() {
        let Some((strategy, roles)) = resolve_columns(table) else {
            let label = table_label(table, table_index);
            debug!(table = table_index, "Ignoring non-transactional table");
            warnings.push(Warning::table(
                WarningKind::NonTransactionalTable,
                table_index,
                label.clone(),
            ));
            rejected.push(label);
            continue;
        };

        matched_tables += 1;
        debug!(table = table_index, strategy, ?roles, "Resolved transaction table");

        if strategy == "positional" {
            warnings.push(Warning::table(
                WarningKind::LowConfidenceColumns,
                table_index,
                "no header row; column roles guessed from cell positions",
            ));
        }

        for (row_index, row) in table.data_rows() {
            match parse_row(&row.cells, &roles, row_index) {
                RowOutcome::Parsed(tx) => {
                    if let Some((start, end)) = header.period {
                        if tx.date < start || tx.date > end {
                            warnings.push(Warning::row(
                                WarningKind::OutOfPeriodRow,
                                table_index,
                                row_index,
                                format!(
                                    "date {} outside stated period {} to {}",
                                    tx.date, start, end
                                ),
                            ));
                        }
                    }
                    transactions.push(tx);
                }
                RowOutcome::Skipped(detail) => {
                    warn!(table = table_index, row = row_index, detail = %detail, "Skipping row");
                    warnings.push(Warning::row(
                        WarningKind::UnparsableRow,
                        table_index,
                        row_index,
                        detail,
                    ));
                }
            }
        }
    }

    if matched_tables == 0 {
        return Err(Error::ExtractionEmpty { rejected });
    }

    // Reconcile computed totals against the stated closing balance
    let summary = Summary::compute(&transactions, &header);
    if let (Some(opening), Some(closing)) = (summary.opening_balance, summary.closing_balance) {
        let computed = opening + summary.total_credits - summary.total_debits;
        if (computed - closing).abs() > RECONCILE_TOLERANCE {
            warnings.push(Warning::statement(
                WarningKind::ReconciliationMismatch,
                format!(
                    "computed closing balance {computed:.2} differs from stated {closing:.2}"
                ),
            ));
        }
    }

    debug!(
        transactions = transactions.len(),
        warnings = warnings.len(),
        "Normalization complete"
    );

    Ok(StatementLedger::build(transactions, header, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{RawCell, RawRow};

    fn cell(text: &str) -> RawCell {
        RawCell::new(text)
    }

    fn row(texts: &[&str], header: bool) -> RawRow {
        RawRow {
            cells: texts.iter().map(|&t| cell(t)).collect(),
            header,
        }
    }

    fn table(header: Option<&[&str]>, body: &[&[&str]]) -> RawTable {
        let mut rows = Vec::new();
        if let Some(h) = header {
            rows.push(row(h, true));
        }
        for b in body {
            rows.push(row(b, false));
        }
        RawTable { rows }
    }

    fn doc(tables: Vec<RawTable>, entities: Vec<RawEntity>) -> RawDocument {
        RawDocument { tables, entities }
    }

    fn entity(name: &str, value: &str) -> RawEntity {
        RawEntity {
            name: name.to_string(),
            value: value.to_string(),
            confidence: None,
        }
    }

    fn standard_table() -> RawTable {
        table(
            Some(&["Date", "Description", "Amount", "Balance"]),
            &[
                &["01/03/2024", "COFFEE SHOP", "-4.50", "995.50"],
                &["01/10/2024", "SALARY  JANUARY", "2,500.00", "3,495.50"],
                &["01/15/2024", "RENT", "(1,200.00)", "2,295.50"],
            ],
        )
    }

    #[test]
    fn test_one_transaction_per_row_in_order() {
        let ledger = normalize(&doc(vec![standard_table()], vec![])).unwrap();
        assert_eq!(ledger.len(), 3);
        let desc: Vec<&str> = ledger
            .transactions()
            .iter()
            .map(|t| t.description.as_str())
            .collect();
        assert_eq!(desc, vec!["COFFEE SHOP", "SALARY JANUARY", "RENT"]);
        // Parenthesized amount is a debit
        assert_eq!(ledger.transactions()[2].amount, -1200.00);
        assert_eq!(ledger.transactions()[1].amount, 2500.00);
        assert_eq!(ledger.transactions()[0].running_balance, Some(995.50));
    }

    #[test]
    fn test_unparsable_date_skips_row_with_warning() {
        let t = table(
            Some(&["Date", "Description", "Amount"]),
            &[
                &["01/03/2024", "GOOD ROW", "-4.50"],
                &["31-Febtober-2024", "BAD ROW", "-10.00"],
                &["01/05/2024", "ALSO GOOD", "20.00"],
            ],
        );
        let ledger = normalize(&doc(vec![t], vec![])).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger
            .transactions()
            .iter()
            .all(|t| t.description != "BAD ROW"));

        let skipped: Vec<&Warning> = ledger
            .warnings()
            .iter()
            .filter(|w| w.kind == WarningKind::UnparsableRow)
            .collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].row_index, Some(2));
    }

    #[test]
    fn test_fee_schedule_only_is_extraction_empty() {
        let fees = table(
            Some(&["Fee Type", "Charge"]),
            &[&["Overdraft", "35.00"], &["Wire transfer", "25.00"]],
        );
        let err = normalize(&doc(vec![fees], vec![])).unwrap_err();
        match err {
            Error::ExtractionEmpty { rejected } => {
                assert_eq!(rejected.len(), 1);
                assert!(rejected[0].contains("Fee Type"));
            }
            other => panic!("expected ExtractionEmpty, got {other:?}"),
        }
    }

    #[test]
    fn test_fee_schedule_alongside_register_is_warning_only() {
        let fees = table(Some(&["Fee Type", "Charge"]), &[&["Overdraft", "35.00"]]);
        let ledger = normalize(&doc(vec![fees, standard_table()], vec![])).unwrap();
        assert_eq!(ledger.len(), 3);
        assert!(ledger
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::NonTransactionalTable && w.table_index == Some(0)));
    }

    #[test]
    fn test_debit_credit_split_columns_set_sign() {
        let t = table(
            Some(&["Date", "Description", "Debit", "Credit", "Balance"]),
            &[
                &["02/01/2024", "CARD PAYMENT", "45.00", "", "955.00"],
                &["02/02/2024", "REFUND", "", "12.50", "967.50"],
            ],
        );
        let ledger = normalize(&doc(vec![t], vec![])).unwrap();
        assert_eq!(ledger.transactions()[0].amount, -45.00);
        assert_eq!(ledger.transactions()[1].amount, 12.50);
    }

    #[test]
    fn test_lone_withdrawals_column_means_debits() {
        let t1 = table(
            Some(&["Date", "Description", "Withdrawals"]),
            &[&["02/05/2024", "ATM", "80.00"]],
        );
        let t2 = table(
            Some(&["Date", "Description", "Withdrawal Amount"]),
            &[&["02/06/2024", "CARD", "12.00"]],
        );
        let ledger = normalize(&doc(vec![t1, t2], vec![])).unwrap();
        assert_eq!(ledger.transactions()[0].amount, -80.00);
        assert_eq!(ledger.transactions()[1].amount, -12.00);
    }

    #[test]
    fn test_value_date_column_does_not_claim_amount_role() {
        let t = table(
            Some(&["Date", "Value Date", "Description", "Amount"]),
            &[&["02/05/2024", "02/06/2024", "CARD PAYMENT", "-15.00"]],
        );
        let ledger = normalize(&doc(vec![t], vec![])).unwrap();
        assert_eq!(ledger.transactions()[0].amount, -15.00);
        assert_eq!(ledger.transactions()[0].description, "CARD PAYMENT");
    }

    #[test]
    fn test_positional_fallback_emits_low_confidence_warning() {
        // No header row at all: date, description, amount, balance
        let t = table(
            None,
            &[
                &["03/01/2024", "ATM WITHDRAWAL", "-60.00", "440.00"],
                &["03/04/2024", "TRANSFER IN", "100.00", "540.00"],
            ],
        );
        let ledger = normalize(&doc(vec![t], vec![])).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.transactions()[0].amount, -60.00);
        assert_eq!(ledger.transactions()[0].running_balance, Some(440.00));
        assert_eq!(ledger.transactions()[1].description, "TRANSFER IN");
        assert!(ledger
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::LowConfidenceColumns));
    }

    #[test]
    fn test_short_row_skipped_with_warning() {
        let t = table(
            Some(&["Date", "Description", "Amount"]),
            &[
                &["01/03/2024", "FULL ROW", "-4.50"],
                &["01/04/2024", "SHORT"],
            ],
        );
        let ledger = normalize(&doc(vec![t], vec![])).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::UnparsableRow && w.detail.contains("cell(s)")));
    }

    #[test]
    fn test_header_entities_attach_to_ledger() {
        let entities = vec![
            entity("Account Holder", "Jane  Q. Public"),
            entity("Statement Period", "01/01/2024 to 31/01/2024"),
            entity("Opening Balance", "$1,000.00"),
            entity("Closing Balance", "$2,295.50"),
        ];
        let ledger = normalize(&doc(vec![standard_table()], entities)).unwrap();
        let header = ledger.header();
        assert_eq!(header.account_holder.as_deref(), Some("Jane Q. Public"));
        assert_eq!(header.opening_balance, Some(1000.00));
        assert_eq!(header.closing_balance, Some(2295.50));
        let (start, end) = header.period.unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn test_reconciliation_match_produces_no_warning() {
        // 1000.00 + 2500.00 - 1204.50 == 2295.50
        let entities = vec![
            entity("Opening Balance", "1,000.00"),
            entity("Closing Balance", "2,295.50"),
        ];
        let ledger = normalize(&doc(vec![standard_table()], entities)).unwrap();
        assert!(!ledger
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::ReconciliationMismatch));
    }

    #[test]
    fn test_reconciliation_mismatch_is_warned_not_fatal() {
        let entities = vec![
            entity("Opening Balance", "1,000.00"),
            entity("Closing Balance", "9,999.00"),
        ];
        let ledger = normalize(&doc(vec![standard_table()], entities)).unwrap();
        let mismatch: Vec<&Warning> = ledger
            .warnings()
            .iter()
            .filter(|w| w.kind == WarningKind::ReconciliationMismatch)
            .collect();
        assert_eq!(mismatch.len(), 1);
        assert!(mismatch[0].detail.contains("2295.50"));
        assert!(mismatch[0].detail.contains("9999.00"));
    }

    #[test]
    fn test_out_of_period_row_is_kept_and_warned() {
        let entities = vec![entity("Statement Period", "01/01/2024 to 31/01/2024")];
        let t = table(
            Some(&["Date", "Description", "Amount"]),
            &[
                &["01/10/2024", "IN PERIOD", "-5.00"],
                &["03/10/2024", "OUT OF PERIOD", "-5.00"],
            ],
        );
        let ledger = normalize(&doc(vec![t], entities)).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::OutOfPeriodRow && w.row_index == Some(2)));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let entities = vec![entity("Opening Balance", "1,000.00")];
        let input = doc(vec![standard_table()], entities);
        let first = normalize(&input).unwrap();
        let second = normalize(&input).unwrap();
        assert_eq!(first.transactions(), second.transactions());
        assert_eq!(first.warnings(), second.warnings());
        assert_eq!(first.summary(), second.summary());
    }

    #[test]
    fn test_multiple_register_tables_contribute_in_order() {
        let page2 = table(
            Some(&["Date", "Description", "Amount", "Balance"]),
            &[&["01/20/2024", "PAGE TWO ROW", "-10.00", "2,285.50"]],
        );
        let ledger = normalize(&doc(vec![standard_table(), page2], vec![])).unwrap();
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.transactions()[3].description, "PAGE TWO ROW");
    }

    #[test]
    fn test_parse_signed_amount_conventions() {
        assert_eq!(parse_signed_amount("$1,234.56"), Some(1234.56));
        assert_eq!(parse_signed_amount("-123.45"), Some(-123.45));
        assert_eq!(parse_signed_amount("(100.00)"), Some(-100.00));
        assert_eq!(parse_signed_amount("250.00 CR"), Some(250.00));
        assert_eq!(parse_signed_amount("250.00 DR"), Some(-250.00));
        assert_eq!(parse_signed_amount("100.00-"), Some(-100.00));
        assert_eq!(parse_signed_amount(""), None);
        assert_eq!(parse_signed_amount("n/a"), None);
    }

    #[test]
    fn test_parse_statement_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        for s in ["01/15/2024", "2024-01-15", "15 Jan 2024", "15-Jan-2024", "Jan 15, 2024"] {
            assert_eq!(parse_statement_date(s), Some(expected), "format: {s}");
        }
        assert_eq!(parse_statement_date("31-Febtober-2024"), None);
    }

    #[test]
    fn test_zero_amount_row_is_skipped() {
        let t = table(
            Some(&["Date", "Description", "Amount"]),
            &[&["01/03/2024", "ZERO", "0.00"], &["01/04/2024", "REAL", "-1.00"]],
        );
        let ledger = normalize(&doc(vec![t], vec![])).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.transactions()[0].description, "REAL");
    }
}
