//! Statement aggregate: metadata, the assembled record and its identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::finance::Transaction;

/// Placeholder holder name when nothing in the text identifies one
pub const UNKNOWN_ACCOUNT_HOLDER: &str = "Unknown_Account_Holder";

/// Holder name used for CSV exports, which carry no holder field
pub const CSV_ACCOUNT_HOLDER: &str = "CSV_Statement_User";

/// File name recorded for text pasted in by hand
pub const MANUAL_ENTRY_FILE_NAME: &str = "Manual Entry";

/// Heuristically derived statement metadata. Not authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementMetadata {
    pub account_holder: String,
    /// ISO date; not calendar-validated
    pub from_date: String,
    /// ISO date; not calendar-validated
    pub to_date: String,
}

/// A fully processed statement. Written once, read many times, deleted whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedStatement {
    pub id: String,
    pub account_holder: String,
    pub from_date: String,
    pub to_date: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: String,
    pub transactions: Vec<Transaction>,
    pub raw_text: String,
    pub file_name: String,
    pub processed_at: DateTime<Utc>,
}

/// Listing row for stored statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementListing {
    pub id: String,
    pub account_holder: String,
    pub from_date: String,
    pub to_date: String,
    pub file_name: String,
    pub processed_at: DateTime<Utc>,
    pub transaction_count: usize,
}

impl From<&ProcessedStatement> for StatementListing {
    fn from(s: &ProcessedStatement) -> Self {
        Self {
            id: s.id.clone(),
            account_holder: s.account_holder.clone(),
            from_date: s.from_date.clone(),
            to_date: s.to_date.clone(),
            file_name: s.file_name.clone(),
            processed_at: s.processed_at,
            transaction_count: s.transactions.len(),
        }
    }
}

/// Build the storage identifier `{holder}_{from}_to_{to}_{timestamp}`.
///
/// The holder is lowercased with every non-alphanumeric character replaced by
/// `_`; the dates keep only their digits.
pub fn statement_id(account_holder: &str, from_date: &str, to_date: &str, timestamp: &str) -> String {
    let holder: String = account_holder
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let digits = |s: &str| s.chars().filter(|c| c.is_ascii_digit()).collect::<String>();

    format!("{}_{}_to_{}_{}", holder, digits(from_date), digits(to_date), timestamp)
}

/// Combine extracted text, metadata and categorized transactions into a record.
///
/// The timestamp component of the id is `processed_at` in epoch milliseconds.
pub fn assemble(
    raw_text: impl Into<String>,
    metadata: StatementMetadata,
    transactions: Vec<Transaction>,
    file_name: impl Into<String>,
    processed_at: DateTime<Utc>,
) -> ProcessedStatement {
    let timestamp = processed_at.timestamp_millis().to_string();
    let id = statement_id(&metadata.account_holder, &metadata.from_date, &metadata.to_date, &timestamp);

    ProcessedStatement {
        id,
        account_holder: metadata.account_holder,
        from_date: metadata.from_date,
        to_date: metadata.to_date,
        timestamp,
        transactions,
        raw_text: raw_text.into(),
        file_name: file_name.into(),
        processed_at,
    }
}
