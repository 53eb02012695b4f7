//! Assembled statement text keyed by operation.

use super::OperationKind;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Thread-safe map from operation key to assembled statement text.
///
/// Entries are never replaced or evicted. When two callers race to fill the
/// same key, the first insert wins and both get its text back.
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: RwLock<HashMap<String, CachedStatement>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Statement text and the operation kind it was assembled for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedStatement {
    pub kind: OperationKind,
    pub sql: Arc<str>,
}

impl CachedStatement {
    pub fn new(kind: OperationKind, sql: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            sql: sql.into(),
        }
    }
}

/// Counters for cache usage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached statement for `key`.
    pub fn get(&self, key: &str) -> Option<CachedStatement> {
        let found = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `statement` under `key` unless an entry exists; returns the
    /// stored entry.
    pub fn insert_if_absent(&self, key: String, statement: CachedStatement) -> CachedStatement {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert(statement).clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of usage counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
