//! Date utilities: best-effort ISO normalization of date tokens found in statement text.

use chrono::{NaiveDate, Utc};

fn is_separator(c: char) -> bool {
    matches!(c, '/' | '-' | '.' | '\\')
}

/// Canonicalize a date-like token into `YYYY-MM-DD`.
///
/// Year position is decided by part length only:
/// - last part has 4 chars: `DD-MM-YYYY`
/// - first part has 4 chars: `YYYY-MM-DD`
/// - otherwise `DD-MM-YY`, with a 2-digit year read as `20YY`
///
/// Values are not range-checked (`"1/13/2024"` yields month 13).
/// Returns `None` unless the token splits into exactly three parts.
pub fn normalize_date(token: &str) -> Option<String> {
    let clean: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || is_separator(*c))
        .collect();

    let parts: Vec<&str> = clean.split(is_separator).collect();
    let [first, middle, last] = parts.as_slice() else {
        return None;
    };

    let (day, month, year) = if last.len() == 4 {
        (*first, *middle, last.to_string())
    } else if first.len() == 4 {
        (*last, *middle, first.to_string())
    } else if last.len() == 2 {
        (*first, *middle, format!("20{last}"))
    } else {
        (*first, *middle, last.to_string())
    };

    Some(format!("{year}-{month:0>2}-{day:0>2}"))
}

/// Like [`normalize_date`] but falls back to `today` when the token has no three parts.
pub fn normalize_date_or(token: &str, today: NaiveDate) -> String {
    normalize_date(token).unwrap_or_else(|| iso_date(today))
}

/// Format a date as `YYYY-MM-DD`.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Current UTC calendar date.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
