use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tally_finance::{ModelSettings, RetryPolicy};
use tally_ingest::PdfConfig;

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelSection,
    pub retry: RetrySection,
    pub pdf: PdfSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSection {
    /// All pages when unset
    pub max_pages: Option<usize>,
    pub skip_unreadable_pages: bool,
}

impl Default for ModelSection {
    fn default() -> Self {
        let d = ModelSettings::default();
        Self {
            base_url: d.base_url,
            model: d.model,
            timeout_secs: d.timeout.as_secs(),
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        let d = RetryPolicy::default();
        Self {
            max_attempts: d.max_attempts,
            base_delay_ms: d.base_delay.as_millis() as u64,
            max_jitter_ms: d.max_jitter.as_millis() as u64,
        }
    }
}

impl Config {
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            base_url: self.model.base_url.clone(),
            model: self.model.model.clone(),
            timeout: Duration::from_secs(self.model.timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_jitter: Duration::from_millis(self.retry.max_jitter_ms),
        }
    }

    pub fn pdf_config(&self) -> PdfConfig {
        PdfConfig {
            max_pages: self.pdf.max_pages,
            skip_unreadable_pages: self.pdf.skip_unreadable_pages,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
        assert_eq!(cfg.model_settings(), ModelSettings::default());
        assert_eq!(cfg.pdf_config(), PdfConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let cfg = parse_config(
            r#"
[retry]
max_attempts = 2

[pdf]
max_pages = 3
"#,
        )
        .unwrap();
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.retry.base_delay_ms, 1000);
        assert_eq!(cfg.pdf_config().max_pages, Some(3));
        assert_eq!(cfg.model.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_round_trips_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        assert!(s.contains("[model]"));
        assert_eq!(parse_config(&s).unwrap(), cfg);
    }

    #[test]
    fn test_rejects_bad_types() {
        assert!(parse_config("[retry]\nmax_attempts = \"five\"\n").is_err());
    }
}
