//! Memoizes extraction results per document version.
//!
//! One entry is kept per path, tagged with the file's `modified_at`: a hit
//! needs both to match, and a newer version replaces the old entry, so stale
//! dates are never served. The number of entries is capped; the oldest entry
//! is evicted first. Only successful answers are stored; failures are retried
//! on the next scan.

use super::{ExtractionError, ExtractionService, SourceDocument};
use log::debug;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;

pub const DEFAULT_CAPACITY: usize = 50_000;

struct Entry {
    modified_at: SystemTime,
    value: Option<String>,
    inserted: u64,
}

#[derive(Default)]
struct Entries {
    by_path: HashMap<PathBuf, Entry>,
    next_seq: u64,
}

impl Entries {
    fn insert(
        &mut self,
        path: PathBuf,
        modified_at: SystemTime,
        value: Option<String>,
        capacity: usize,
    ) {
        if !self.by_path.contains_key(&path) && self.by_path.len() >= capacity {
            let oldest = self
                .by_path
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(path, _)| path.clone());
            if let Some(oldest) = oldest {
                self.by_path.remove(&oldest);
            }
        }
        self.next_seq += 1;
        self.by_path.insert(
            path,
            Entry {
                modified_at,
                value,
                inserted: self.next_seq,
            },
        );
    }
}

pub struct CachingExtractor<S> {
    inner: S,
    capacity: usize,
    entries: Mutex<Entries>,
}

impl<S: ExtractionService> CachingExtractor<S> {
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.by_path.len()).unwrap_or(0)
    }

    fn lookup(&self, document: &SourceDocument<'_>) -> Option<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .by_path
            .get(document.path)
            .filter(|entry| entry.modified_at == document.modified_at)
            .map(|entry| entry.value.clone())
    }
}

impl<S: ExtractionService> ExtractionService for CachingExtractor<S> {
    fn extract_validity_date(
        &self,
        document: &SourceDocument<'_>,
    ) -> Result<Option<String>, ExtractionError> {
        if let Some(hit) = self.lookup(document) {
            debug!("Cached extraction for {}", document.path.display());
            return Ok(hit);
        }

        let value = self.inner.extract_validity_date(document)?;
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).insert(
            document.path.to_path_buf(),
            document.modified_at,
            value.clone(),
            self.capacity,
        );
        Ok(value)
    }
}
