//! Advisory line tagging for PDF text before it goes to the model.

use anyhow::{Context, Result};
use regex::Regex;

use crate::extract::collapse_whitespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    /// Contains a numeric or spelled-out date
    Transaction,
    /// Contains a currency-adjacent decimal
    Amount,
    Plain,
}

impl LineTag {
    fn prefix(&self) -> Option<&'static str> {
        match self {
            LineTag::Transaction => Some("[TRANSACTION]"),
            LineTag::Amount => Some("[AMOUNT]"),
            LineTag::Plain => None,
        }
    }
}

pub struct LineAnnotator {
    transaction: Regex,
    amount: Regex,
}

impl LineAnnotator {
    pub fn new() -> Result<Self> {
        let transaction = Regex::new(
            r"[0-9]{1,2}[/\-\\.][0-9]{1,2}[/\-\\.][0-9]{2,4}|[A-Za-z0-9_]{3}\s+[0-9]{1,2},?\s+[0-9]{4}",
        )
        .context("compiling transaction line pattern")?;
        let amount = Regex::new(r"[$€£¥]\s*[0-9]+[.,][0-9]{2}|[0-9]+[.,][0-9]{2}\s*[$€£¥]")
            .context("compiling amount line pattern")?;
        Ok(Self { transaction, amount })
    }

    pub fn tag(&self, line: &str) -> LineTag {
        if self.transaction.is_match(line) {
            LineTag::Transaction
        } else if self.amount.is_match(line) {
            LineTag::Amount
        } else {
            LineTag::Plain
        }
    }

    /// Drop blank lines, collapse whitespace and prefix tagged lines.
    pub fn annotate(&self, text: &str) -> String {
        text.split('\n')
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .map(|line| match self.tag(&line).prefix() {
                Some(prefix) => format!("{prefix} {line}"),
                None => line,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags() {
        let a = LineAnnotator::new().unwrap();
        assert_eq!(a.tag("05.01.2024 ALDI SUED 12,50"), LineTag::Transaction);
        assert_eq!(a.tag("Jan 5, 2024 Card payment"), LineTag::Transaction);
        assert_eq!(a.tag("Balance carried forward € 1.234,56"), LineTag::Amount);
        assert_eq!(a.tag("Total 99.00$"), LineTag::Amount);
        assert_eq!(a.tag("Sparkasse Musterstadt"), LineTag::Plain);
        assert_eq!(a.tag("Amount 12.50"), LineTag::Plain);
    }

    #[test]
    fn test_annotate_output() {
        let a = LineAnnotator::new().unwrap();
        let text = "Account Holder:  Jane Doe\n\n  05/01/2024   ALDI   €12.50 \nTotal €12.50\r\n";
        assert_eq!(
            a.annotate(text),
            "Account Holder: Jane Doe\n[TRANSACTION] 05/01/2024 ALDI €12.50\n[AMOUNT] Total €12.50"
        );
    }

    #[test]
    fn test_date_wins_over_amount() {
        let a = LineAnnotator::new().unwrap();
        assert_eq!(a.annotate("01-02-24 €5.00"), "[TRANSACTION] 01-02-24 €5.00");
    }

    #[test]
    fn test_only_ascii_digits_count() {
        let a = LineAnnotator::new().unwrap();
        assert_eq!(a.tag("٠١/٠٢/٢٠٢٤ transfer"), LineTag::Plain);
        assert_eq!(a.tag("€ ١٢.٥٠"), LineTag::Plain);
        assert_eq!(a.tag("€ 12.50"), LineTag::Amount);
    }
}
