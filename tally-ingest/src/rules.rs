//! Ordered pattern rules evaluated first-match-wins.
//!
//! A rule pairs a regex with a function that turns its captures into a value.
//! Cascades are plain slices of rules, so adding or reordering a heuristic is
//! a one-line change to the list.

use anyhow::{Context, Result};
use regex::{Captures, Regex};

/// Turns a successful match into a value; `None` lets the next rule try.
pub type Extract<T> = fn(&Captures<'_>) -> Option<T>;

pub struct Rule<T> {
    name: &'static str,
    pattern: Regex,
    extract: Extract<T>,
}

impl<T> Rule<T> {
    pub fn new(name: &'static str, pattern: &str, extract: Extract<T>) -> Result<Self> {
        let pattern = Regex::new(pattern).with_context(|| format!("compiling rule {name}"))?;
        Ok(Self {
            name,
            pattern,
            extract,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply to the first match of the pattern in `haystack`.
    pub fn apply(&self, haystack: &str) -> Option<T> {
        self.pattern
            .captures(haystack)
            .and_then(|caps| (self.extract)(&caps))
    }
}

/// Evaluate `rules` in order; the first rule producing a value wins.
pub fn first_match<'r, T>(rules: &'r [Rule<T>], haystack: &str) -> Option<(&'r Rule<T>, T)> {
    rules
        .iter()
        .find_map(|rule| rule.apply(haystack).map(|value| (rule, value)))
}

/// Capture group 1, trimmed, if non-empty
pub fn group1(caps: &Captures<'_>) -> Option<String> {
    caps.get(1)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Capture groups 1 and 2, both required
pub fn group_pair(caps: &Captures<'_>) -> Option<(String, String)> {
    let a = caps.get(1)?.as_str();
    let b = caps.get(2)?.as_str();
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some((a.to_string(), b.to_string()))
}
