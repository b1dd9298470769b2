//! Plain-text rendering of statements for the terminal.

use std::fmt::Write;
use tally_core::{two_decimals, ProcessedStatement, StatementListing, StatementSummary, Transaction};

const DESCRIPTION_WIDTH: usize = 40;

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn transaction_table(txns: &[Transaction]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<10}  {:<w$}  {:>12}  {}",
        "id",
        "date",
        "description",
        "amount",
        "category",
        w = DESCRIPTION_WIDTH
    );
    for t in txns {
        let _ = writeln!(
            out,
            "{:>4}  {:<10}  {:<w$}  {:>12}  {}",
            t.id,
            t.date.format("%Y-%m-%d"),
            truncate(&t.description, DESCRIPTION_WIDTH),
            t.amount_string(),
            t.category,
            w = DESCRIPTION_WIDTH
        );
    }
    out
}

pub fn summary(txns: &[Transaction]) -> String {
    let s = StatementSummary::from_transactions(txns);
    let mut out = String::new();
    let _ = writeln!(out, "Money in:  €{}", two_decimals(s.total_in));
    let _ = writeln!(out, "Money out: €{}", two_decimals(s.total_out));
    let _ = writeln!(out, "Net:       {}", s.net_string());
    if !s.top_categories.is_empty() {
        let _ = writeln!(out, "\nTop spending:");
        for (category, amount) in &s.top_categories {
            let _ = writeln!(out, "- {category}: €{}", two_decimals(*amount));
        }
    }
    out
}

pub fn statement(stmt: &ProcessedStatement) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", stmt.id);
    let _ = writeln!(
        out,
        "{} | {} to {} | {} | processed {}\n",
        stmt.account_holder,
        stmt.from_date,
        stmt.to_date,
        stmt.file_name,
        stmt.processed_at.format("%Y-%m-%d %H:%M UTC")
    );
    if stmt.transactions.is_empty() {
        let _ = writeln!(out, "(no transactions found)");
    } else {
        out.push_str(&transaction_table(&stmt.transactions));
        out.push('\n');
        out.push_str(&summary(&stmt.transactions));
    }
    out
}

pub fn listing(rows: &[StatementListing]) -> String {
    if rows.is_empty() {
        return "No statements stored.\n".to_string();
    }
    let mut out = String::new();
    for r in rows {
        let _ = writeln!(
            out,
            "{}  {} | {} to {} | {} txns | {} | {}",
            r.id,
            r.account_holder,
            r.from_date,
            r.to_date,
            r.transaction_count,
            r.file_name,
            r.processed_at.format("%Y-%m-%d %H:%M")
        );
    }
    out
}
