//! Storage seam for processed statements.

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::statement::{ProcessedStatement, StatementListing};

/// Key-value storage of processed statements, keyed by statement id.
///
/// `save` must be all-or-nothing: a statement is visible with its whole
/// transaction list or not at all.
pub trait StatementStore: Send + Sync {
    /// Persist a statement and return the key it was stored under.
    fn save(&self, statement: &ProcessedStatement) -> Result<String>;

    fn get(&self, id: &str) -> Result<Option<ProcessedStatement>>;

    /// All stored statements, newest `processed_at` first.
    fn list(&self) -> Result<Vec<StatementListing>>;

    /// Returns false when nothing was stored under `id`.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Remove every statement, returning how many were removed.
    fn clear(&self) -> Result<usize>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<BTreeMap<String, ProcessedStatement>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, ProcessedStatement>>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("statement store lock poisoned"))
    }
}

impl StatementStore for MemoryStore {
    fn save(&self, statement: &ProcessedStatement) -> Result<String> {
        self.lock()?.insert(statement.id.clone(), statement.clone());
        Ok(statement.id.clone())
    }

    fn get(&self, id: &str) -> Result<Option<ProcessedStatement>> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<StatementListing>> {
        let mut out: Vec<StatementListing> = self.lock()?.values().map(StatementListing::from).collect();
        out.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(out)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.lock()?.remove(id).is_some())
    }

    fn clear(&self) -> Result<usize> {
        let mut map = self.lock()?;
        let n = map.len();
        map.clear();
        Ok(n)
    }
}
