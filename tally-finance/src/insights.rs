//! Free-text reports and explanations over categorized transactions.

use anyhow::{bail, Result};
use tally_core::Transaction;

use crate::client::ModelClient;
use crate::schema::GenerateRequest;

const REPORT_INSTRUCTION: &str = "\
You are a helpful financial advisor. Analyze the following bank transactions and provide a brief report.
The report should be in markdown format and include three sections:
1. **Summary**: A short overview of the spending, income, and net balance.
2. **Top Insights**: 2-3 key observations about spending patterns (e.g., highest spending category, frequent merchants).
3. **Budget Recommendation**: One actionable tip for saving money based on the data.
Keep the language clear and concise.
";

const EXPLAIN_INSTRUCTION: &str = "\
You are a financial assistant. Explain the following bank transaction in simple terms. \
What could this transaction be for? Keep it under 3 sentences.
";

pub const EMPTY_REPORT: &str = "Could not generate report. The model returned an empty response.";
pub const EMPTY_EXPLANATION: &str = "Could not get explanation.";

/// One line per transaction: `{date} | {description} | {amount} | Category: {category}`
pub fn transaction_lines(txns: &[Transaction]) -> String {
    txns.iter()
        .map(|t| {
            format!(
                "{} | {} | {} | Category: {}",
                t.date.format("%Y-%m-%d"),
                t.description,
                t.amount_string(),
                t.category
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn report_request(txns: &[Transaction]) -> GenerateRequest {
    GenerateRequest::new(REPORT_INSTRUCTION, transaction_lines(txns))
}

pub fn explain_request(txn: &Transaction) -> GenerateRequest {
    let user = format!(
        "Explain this transaction: Date: {}, Description: {}, Amount: {}, Category: {}",
        txn.date.format("%Y-%m-%d"),
        txn.description,
        txn.amount_string(),
        txn.category
    );
    GenerateRequest::new(EXPLAIN_INSTRUCTION, user)
}

/// Markdown spending report for a statement's transactions.
pub async fn report(client: &ModelClient, txns: &[Transaction]) -> Result<String> {
    if txns.is_empty() {
        bail!("no transactions to analyze");
    }
    let text = client.call_text(&report_request(txns)).await?;
    if text.is_empty() {
        return Ok(EMPTY_REPORT.to_string());
    }
    Ok(text)
}

/// Short plain-language explanation of one transaction.
pub async fn explain(client: &ModelClient, txn: &Transaction) -> Result<String> {
    let text = client.call_text(&explain_request(txn)).await?;
    if text.is_empty() {
        return Ok(EMPTY_EXPLANATION.to_string());
    }
    Ok(text)
}
