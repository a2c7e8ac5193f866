//! The statement ledger: normalized transactions plus derived summary fields
//!
//! A ledger is built exactly once per invocation by the normalizer and is
//! read-only from then on. Every query below returns references in source
//! order; nothing here mutates a transaction.

use std::sync::OnceLock;

use chrono::NaiveDate;
use serde::Serialize;

use crate::normalize::Warning;

/// One normalized ledger entry
///
/// Immutable once created. `amount` is signed: negative is a debit, positive
/// a credit. `running_balance` is present only when the source table carried
/// a balance column and the cell parsed; absent is `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub running_balance: Option<f64>,
    /// Position of the source row within its table, for diagnostics only
    pub raw_row_index: usize,
}

/// Fields declared by the statement itself, recovered from key/value entities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementHeader {
    pub account_holder: Option<String>,
    /// The stated period exactly as extracted
    pub period_raw: Option<String>,
    /// The stated period when both endpoints parsed
    pub period: Option<(NaiveDate, NaiveDate)>,
    pub opening_balance: Option<f64>,
    pub closing_balance: Option<f64>,
}

/// Derived summary fields, recomputed from the transaction sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub account_holder: Option<String>,
    pub opening_balance: Option<f64>,
    pub closing_balance: Option<f64>,
    /// Sum of debit magnitudes (positive number)
    pub total_debits: f64,
    /// Sum of credit amounts (positive number)
    pub total_credits: f64,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub transaction_count: usize,
}

impl Summary {
    /// Derive summary fields from a transaction sequence and stated header
    ///
    /// Stated balances win; otherwise the opening balance is back-computed
    /// from the first transaction carrying a running balance and the closing
    /// balance is taken from the last one. The stated period wins over the
    /// observed transaction date range.
    pub(crate) fn compute(transactions: &[Transaction], header: &StatementHeader) -> Self {
        let total_credits = transactions
            .iter()
            .filter(|t| t.amount > 0.0)
            .map(|t| t.amount)
            .sum();
        let total_debits = transactions
            .iter()
            .filter(|t| t.amount < 0.0)
            .map(|t| -t.amount)
            .sum();

        let opening_balance = header.opening_balance.or_else(|| {
            transactions
                .iter()
                .find_map(|t| t.running_balance.map(|b| b - t.amount))
        });
        let closing_balance = header
            .closing_balance
            .or_else(|| transactions.iter().rev().find_map(|t| t.running_balance));

        let (period_start, period_end) = match header.period {
            Some((start, end)) => (Some(start), Some(end)),
            None => (
                transactions.iter().map(|t| t.date).min(),
                transactions.iter().map(|t| t.date).max(),
            ),
        };

        Self {
            account_holder: header.account_holder.clone(),
            opening_balance,
            closing_balance,
            total_debits,
            total_credits,
            period_start,
            period_end,
            transaction_count: transactions.len(),
        }
    }
}

/// Predicate over the transaction sequence
///
/// Amount bounds compare the signed amount (debits are negative), so
/// `min_amount: 100` selects credits of at least 100 and excludes every
/// debit. Description matching is case-insensitive substring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub description_contains: Option<String>,
}

impl TransactionFilter {
    fn matches(&self, t: &Transaction) -> bool {
        if let Some((start, end)) = self.date_range {
            if t.date < start || t.date > end {
                return false;
            }
        }
        if let Some(min) = self.min_amount {
            if t.amount < min {
                return false;
            }
        }
        if let Some(max) = self.max_amount {
            if t.amount > max {
                return false;
            }
        }
        if let Some(ref needle) = self.description_contains {
            if !t
                .description
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Read-only aggregate of one statement's transactions
///
/// Constructed by [`crate::normalize::normalize`] and never mutated after.
#[derive(Debug)]
pub struct StatementLedger {
    transactions: Vec<Transaction>,
    header: StatementHeader,
    warnings: Vec<Warning>,
    summary: OnceLock<Summary>,
}

impl StatementLedger {
    /// Assemble a ledger; only the normalizer calls this
    pub(crate) fn build(
        transactions: Vec<Transaction>,
        header: StatementHeader,
        warnings: Vec<Warning>,
    ) -> Self {
        Self {
            transactions,
            header,
            warnings,
            summary: OnceLock::new(),
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn header(&self) -> &StatementHeader {
        &self.header
    }

    /// Warnings accumulated during normalization, in discovery order
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Ordered subsequence with `date` in `[start, end]`, inclusive
    pub fn transactions_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
            .collect()
    }

    /// Ordered subsequence satisfying the filter
    pub fn transactions_matching(&self, filter: &TransactionFilter) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| filter.matches(t))
            .collect()
    }

    /// Derived summary fields, computed on first read and cached
    pub fn summary(&self) -> &Summary {
        self.summary
            .get_or_init(|| Summary::compute(&self.transactions, &self.header))
    }
}
