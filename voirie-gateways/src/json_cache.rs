use std::{io, path::Path};

use jfs::Store;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use voirie_core::{
    cache::{CacheEntry, CacheStore, StoreError},
    entities::geo::Coordinate,
};

/// Persists lookup outcomes as one JSON file per query.
pub struct JsonCacheStore {
    json_store: Store,
}

impl JsonCacheStore {
    pub fn try_new<P: AsRef<Path>>(directory: P) -> io::Result<Self> {
        let json_store = Store::new(directory)?;
        Ok(Self { json_store })
    }

    pub fn path(&self) -> &Path {
        self.json_store.path()
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct JsonCacheEntry {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lng: Option<f64>,
}

impl JsonCacheEntry {
    fn new(query: &str, entry: &CacheEntry) -> Self {
        let pos = entry.coordinate();
        Self {
            query: query.to_owned(),
            lat: pos.map(|p| p.lat),
            lng: pos.map(|p| p.lng),
        }
    }

    /// Documents with an invalid position are dropped, so the query is
    /// looked up again.
    fn into_entry(self) -> Option<(String, CacheEntry)> {
        let entry = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => match Coordinate::try_new(lat, lng) {
                Ok(pos) => CacheEntry::Found(pos),
                Err(err) => {
                    log::warn!("Ignoring cached '{}': {err}", self.query);
                    return None;
                }
            },
            _ => CacheEntry::Miss,
        };
        Some((self.query, entry))
    }
}

/// File name of the document for a query.
fn document_id(query: &str) -> String {
    format!("{:x}", Sha256::digest(query.as_bytes()))
}

impl CacheStore for JsonCacheStore {
    fn load(&self) -> Result<Vec<(String, CacheEntry)>, StoreError> {
        let entries = self.json_store.all::<JsonCacheEntry>()?;
        Ok(entries
            .into_values()
            .filter_map(JsonCacheEntry::into_entry)
            .collect())
    }

    fn save(&self, entries: &[(String, CacheEntry)]) -> Result<(), StoreError> {
        for (query, entry) in entries.iter().filter(|(_, e)| e.is_persistent()) {
            let doc = JsonCacheEntry::new(query, entry);
            self.json_store.save_with_id(&doc, &document_id(query))?;
        }
        log::debug!(
            "Stored {} cache entries in {}",
            entries.len(),
            self.path().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voirie_core::cache::GeocodeCache;

    #[test]
    fn store_and_load_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::try_new(dir.path()).unwrap();
        let pos = Coordinate::new(46.492, -1.788);

        let cache = GeocodeCache::new();
        cache.insert("2 RUE DES PENSEES", CacheEntry::Found(pos));
        cache.insert("99 RUE DES PENSEES", CacheEntry::Miss);
        assert_eq!(2, cache.save_to(&store).unwrap());

        let store = JsonCacheStore::try_new(dir.path()).unwrap();
        let cache = GeocodeCache::load_from(&store).unwrap();
        assert_eq!(2, cache.len());
        assert_eq!(Some(CacheEntry::Found(pos)), cache.get("2 RUE DES PENSEES"));
        assert_eq!(Some(CacheEntry::Miss), cache.get("99 RUE DES PENSEES"));
        assert!(cache.new_entries().is_empty());
    }

    #[test]
    fn one_document_per_query() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::try_new(dir.path()).unwrap();
        let entries = vec![
            ("RUE X".to_owned(), CacheEntry::Miss),
            ("RUE X".to_owned(), CacheEntry::Miss),
        ];
        store.save(&entries).unwrap();
        assert_eq!(1, store.load().unwrap().len());
        assert!(dir
            .path()
            .join(format!("{}.json", document_id("RUE X")))
            .exists());
    }

    #[test]
    fn skip_documents_with_invalid_positions() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::try_new(dir.path()).unwrap();
        let doc = JsonCacheEntry {
            query: "2 RUE X".to_owned(),
            lat: Some(146.49),
            lng: Some(-1.78),
        };
        store
            .json_store
            .save_with_id(&doc, &document_id(&doc.query))
            .unwrap();
        store
            .save(&[("4 RUE X".to_owned(), CacheEntry::Miss)])
            .unwrap();
        let entries = store.load().unwrap();
        assert_eq!(vec![("4 RUE X".to_owned(), CacheEntry::Miss)], entries);
    }

    #[test]
    fn stable_document_ids() {
        assert_eq!(64, document_id("RUE X").len());
        assert_eq!(document_id("RUE X"), document_id("RUE X"));
        assert_ne!(document_id("RUE X"), document_id("RUE Y"));
    }
}
