//! Statement metadata heuristics: account holder and statement date range.
//!
//! Extraction never fails. Anything that cannot be inferred falls back to a
//! placeholder holder name or to today's date.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use tally_core::{
    iso_date, normalize_date_or, today_utc, StatementMetadata, CSV_ACCOUNT_HOLDER,
    UNKNOWN_ACCOUNT_HOLDER,
};
use tracing::debug;

use crate::rules::{first_match, group1, group_pair, Rule};

/// `d/m/y`-style token with `/`, `-`, `\` or `.` separators. ASCII digits only.
const DATE_TOKEN: &str = r"[0-9]{1,2}[/\-\\.][0-9]{1,2}[/\-\\.][0-9]{2,4}";

/// Only the first lines of a PDF are searched for the holder name
const HOLDER_SCAN_LINES: usize = 20;

pub struct MetadataExtractor {
    holder_rules: Vec<Rule<String>>,
    range_rules: Vec<Rule<(String, String)>>,
    csv_date: Regex,
    date_token: Regex,
}

impl MetadataExtractor {
    pub fn new() -> Result<Self> {
        let holder_rules = vec![
            Rule::new("account-holder", r"(?i)Account\s+Holder[:\s]+([^\n\r]+)", group1)?,
            Rule::new("kontoinhaber", r"(?i)Kontoinhaber[:\s]+([^\n\r]+)", group1)?,
            Rule::new("name", r"(?i)Name[:\s]+([^\n\r]+)", group1)?,
            Rule::new("first-last", r"^([A-Z][a-z]+\s+[A-Z][a-z]+)", group1)?,
        ];

        let range_rules = vec![
            Rule::new(
                "from-to",
                &format!(r"(?i)from\s+({DATE_TOKEN})\s+to\s+({DATE_TOKEN})"),
                group_pair,
            )?,
            Rule::new("dash", &format!(r"({DATE_TOKEN})\s*-\s*({DATE_TOKEN})"), group_pair)?,
            Rule::new(
                "statement-period",
                &format!(r"(?i)statement\s+period[:\s]+({DATE_TOKEN})\s+to\s+({DATE_TOKEN})"),
                group_pair,
            )?,
        ];

        let csv_date = Regex::new(&format!(r"^[0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}|{DATE_TOKEN}"))
            .context("compiling csv date pattern")?;
        let date_token = Regex::new(DATE_TOKEN).context("compiling date token pattern")?;

        Ok(Self {
            holder_rules,
            range_rules,
            csv_date,
            date_token,
        })
    }

    /// Extract metadata using the current UTC date as the fallback.
    pub fn extract(&self, text: &str) -> StatementMetadata {
        self.extract_on(text, today_utc())
    }

    /// Extract metadata, falling back to `today` for dates that cannot be found.
    pub fn extract_on(&self, text: &str, today: NaiveDate) -> StatementMetadata {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        let (holder, range) = if is_csv(&lines) {
            debug!("metadata: csv branch");
            (Some(CSV_ACCOUNT_HOLDER.to_string()), self.csv_range(text, today))
        } else {
            debug!("metadata: text branch");
            (self.holder(&lines), self.phrased_range(text, today))
        };

        let (from_date, to_date) = match range.or_else(|| self.any_dates_range(text, today)) {
            Some(range) => range,
            None => (iso_date(today), iso_date(today)),
        };

        StatementMetadata {
            account_holder: holder
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| UNKNOWN_ACCOUNT_HOLDER.to_string()),
            from_date,
            to_date,
        }
    }

    fn holder(&self, lines: &[&str]) -> Option<String> {
        lines.iter().take(HOLDER_SCAN_LINES).find_map(|line| {
            first_match(&self.holder_rules, line).map(|(rule, holder)| {
                debug!(rule = rule.name(), holder = %holder, "account holder matched");
                holder
            })
        })
    }

    fn phrased_range(&self, text: &str, today: NaiveDate) -> Option<(String, String)> {
        let (rule, (from, to)) = first_match(&self.range_rules, text)?;
        debug!(rule = rule.name(), from = %from, to = %to, "date range matched");
        Some((normalize_date_or(&from, today), normalize_date_or(&to, today)))
    }

    /// Dates from the first column of each CSV row.
    ///
    /// Quotes are not interpreted: every line is its own record, so a stray
    /// quote cannot merge later rows into one field.
    fn csv_range(&self, text: &str, today: NaiveDate) -> Option<(String, String)> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(text.as_bytes());

        let mut dates = Vec::new();
        for result in rdr.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable csv row");
                    continue;
                }
            };
            let first = record.get(0).unwrap_or("").replace('"', "");
            if let Some(m) = self.csv_date.find(first.trim()) {
                dates.push(normalize_date_or(m.as_str(), today));
            }
        }

        min_max(dates)
    }

    /// Every date-like token in the text. Used when no structured range was found.
    fn any_dates_range(&self, text: &str, today: NaiveDate) -> Option<(String, String)> {
        let dates: Vec<String> = self
            .date_token
            .find_iter(text)
            .map(|m| normalize_date_or(m.as_str(), today))
            .collect();
        if dates.len() >= 2 {
            debug!(count = dates.len(), "date range from scattered dates");
        }
        min_max(dates)
    }
}

/// A text is CSV when any non-empty line has more than two comma-separated fields.
pub fn is_csv(lines: &[&str]) -> bool {
    lines
        .iter()
        .any(|line| line.contains(',') && line.split(',').count() > 2)
}

/// Earliest and latest of at least two ISO dates (lexicographic order is chronological).
fn min_max(mut dates: Vec<String>) -> Option<(String, String)> {
    if dates.len() < 2 {
        return None;
    }
    dates.sort();
    let from = dates.first()?.clone();
    let to = dates.last()?.clone();
    Some((from, to))
}
