//! Statements on disk: one pretty-printed JSON file per statement id.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tally_core::{ProcessedStatement, StatementListing, StatementStore};
use tracing::{debug, warn};

/// Directory-backed [`StatementStore`] at `<dir>/<id>.json`.
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            bail!("invalid statement id: {id:?}");
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    /// Paths of every file that looks like a stored statement
    fn statement_files(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir).with_context(|| format!("read {}", self.dir.display()))? {
            let path = entry?.path();
            if is_statement_file(&path) {
                out.push(path);
            }
        }
        Ok(out)
    }

    fn read(path: &Path) -> Result<ProcessedStatement> {
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
    }
}

fn is_statement_file(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "json")
        && path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem.contains("_to_") && !stem.starts_with('.'))
}

impl StatementStore for JsonDirStore {
    fn save(&self, statement: &ProcessedStatement) -> Result<String> {
        let path = self.path_for(&statement.id)?;
        let tmp = self.dir.join(format!(".{}.json.tmp", statement.id));
        let json = serde_json::to_string_pretty(statement).context("serialize statement")?;

        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("rename into {}", path.display()));
        }
        debug!(path = %path.display(), "statement saved");
        Ok(statement.id.clone())
    }

    fn get(&self, id: &str) -> Result<Option<ProcessedStatement>> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<StatementListing>> {
        let mut out = Vec::new();
        for path in self.statement_files()? {
            match Self::read(&path) {
                Ok(stmt) => out.push(StatementListing::from(&stmt)),
                Err(e) => warn!(error = %format!("{e:#}"), "skipping unreadable statement file"),
            }
        }
        out.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(out)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }

    fn clear(&self) -> Result<usize> {
        let files = self.statement_files()?;
        for path in &files {
            fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
        }
        Ok(files.len())
    }
}
