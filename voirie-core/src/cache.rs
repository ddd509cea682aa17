//! In-memory lookup cache with optional persistence.

use std::{
    collections::{HashMap, HashSet},
    io,
};

use parking_lot::RwLock;
use thiserror::Error;

use crate::entities::geo::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheEntry {
    Found(Coordinate),
    /// The query is known to yield nothing.
    Miss,
    /// The service could not be reached. Only kept for the current run.
    Unavailable,
}

impl CacheEntry {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Found(pos) => Some(*pos),
            Self::Miss | Self::Unavailable => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Whether the entry may be written to a [`CacheStore`].
    pub fn is_persistent(&self) -> bool {
        !self.is_unavailable()
    }
}

impl From<Option<Coordinate>> for CacheEntry {
    fn from(from: Option<Coordinate>) -> Self {
        from.map(Self::Found).unwrap_or(Self::Miss)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistent storage of cache entries across runs.
pub trait CacheStore {
    fn load(&self) -> Result<Vec<(String, CacheEntry)>, StoreError>;
    fn save(&self, entries: &[(String, CacheEntry)]) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub found: usize,
    pub misses: usize,
    pub unavailable: usize,
}

/// Maps query strings to their outcome.
///
/// Entries are never replaced: the first outcome recorded for a query
/// stays for the lifetime of the cache.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    dirty: RwLock<HashSet<String>>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries loaded from a store are not written back.
    pub fn load_from(store: &dyn CacheStore) -> Result<Self, StoreError> {
        let mut entries = store.load()?;
        entries.retain(|(_, entry)| entry.is_persistent());
        log::debug!("Loaded {} cache entries", entries.len());
        Ok(Self {
            entries: RwLock::new(entries.into_iter().collect()),
            dirty: Default::default(),
        })
    }

    pub fn get(&self, query: &str) -> Option<CacheEntry> {
        self.entries.read().get(query).copied()
    }

    /// Returns the entry that is stored for the query afterwards.
    pub fn insert(&self, query: &str, entry: CacheEntry) -> CacheEntry {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(query) {
            return *existing;
        }
        entries.insert(query.to_owned(), entry);
        if entry.is_persistent() {
            self.dirty.write().insert(query.to_owned());
        }
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.entries
            .read()
            .values()
            .fold(CacheStats::default(), |mut stats, entry| {
                match entry {
                    CacheEntry::Found(_) => stats.found += 1,
                    CacheEntry::Miss => stats.misses += 1,
                    CacheEntry::Unavailable => stats.unavailable += 1,
                }
                stats
            })
    }

    /// Entries added since the cache was created or last saved.
    pub fn new_entries(&self) -> Vec<(String, CacheEntry)> {
        let entries = self.entries.read();
        let mut new_entries: Vec<_> = self
            .dirty
            .read()
            .iter()
            .filter_map(|q| entries.get(q).map(|e| (q.clone(), *e)))
            .collect();
        new_entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        new_entries
    }

    /// Writes all new entries and returns their number.
    pub fn save_to(&self, store: &dyn CacheStore) -> Result<usize, StoreError> {
        let new_entries = self.new_entries();
        if new_entries.is_empty() {
            return Ok(0);
        }
        store.save(&new_entries)?;
        let mut dirty = self.dirty.write();
        for (query, _) in &new_entries {
            dirty.remove(query);
        }
        log::debug!("Saved {} new cache entries", new_entries.len());
        Ok(new_entries.len())
    }
}
