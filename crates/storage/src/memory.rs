//! In-memory table storage backend.
//!
//! Each [`MemoryTableFactory`] snapshots a table from the durable store the
//! first time it is opened and stages every mutation against that snapshot.
//! Committing the factory swaps the staged tables into the durable store in
//! one step, under a single write lock, so other factories observe either
//! all of a commit's writes or none of them.
//!
//! The backend carries two test hooks: an injectable flush failure
//! ([`MemoryStorage::fail_next_commit`]) and a select counter
//! ([`MemoryStorage::select_count`]) for cache-freshness assertions.

use crate::{Condition, Entry, Storage, StorageError, Table, TableFactory};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};
use tracing::debug;

type TableData = BTreeMap<String, Vec<Entry>>;
type StorageData = HashMap<String, TableData>;

/// Shared in-memory durable store.
///
/// Cloning is cheap and produces a handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    durable: Arc<RwLock<StorageData>>,
    fail_next_commit: Arc<AtomicBool>,
    select_count: Arc<AtomicU64>,
}

impl MemoryStorage {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next factory commit fail without applying anything.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of `select` calls served so far, across all factories.
    pub fn select_count(&self) -> u64 {
        self.select_count.load(Ordering::SeqCst)
    }
}

impl Storage for MemoryStorage {
    fn factory(&self) -> Result<Arc<dyn TableFactory>, StorageError> {
        Ok(Arc::new(MemoryTableFactory {
            store: self.clone(),
            staged: Arc::new(Mutex::new(StorageData::new())),
        }))
    }
}

/// Transaction scope over a [`MemoryStorage`].
#[derive(Debug)]
pub struct MemoryTableFactory {
    store: MemoryStorage,
    staged: Arc<Mutex<StorageData>>,
}

impl TableFactory for MemoryTableFactory {
    fn open_table(&self, name: &str) -> Result<Arc<dyn Table>, StorageError> {
        let mut staged = self.staged.lock().map_err(|_| StorageError::LockPoisoned)?;
        if !staged.contains_key(name) {
            let durable = self.store.durable.read().map_err(|_| StorageError::LockPoisoned)?;
            staged.insert(name.to_string(), durable.get(name).cloned().unwrap_or_default());
        }
        Ok(Arc::new(MemoryTable {
            name: name.to_string(),
            staged: Arc::clone(&self.staged),
            select_count: Arc::clone(&self.store.select_count),
        }))
    }

    fn commit(&self) -> Result<(), StorageError> {
        if self.store.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StorageError::CommitFailed("injected flush failure".to_string()));
        }

        let staged = self.staged.lock().map_err(|_| StorageError::LockPoisoned)?;
        let mut durable = self.store.durable.write().map_err(|_| StorageError::LockPoisoned)?;
        for (name, data) in staged.iter() {
            durable.insert(name.clone(), data.clone());
        }
        debug!(target: "ledger_storage", tables = staged.len(), "Committed staged tables");
        Ok(())
    }
}

/// A staged view of one named table.
struct MemoryTable {
    name: String,
    staged: Arc<Mutex<StorageData>>,
    select_count: Arc<AtomicU64>,
}

impl std::fmt::Debug for MemoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTable").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Table for MemoryTable {
    fn select(&self, key: &str, condition: &Condition) -> Result<Vec<Entry>, StorageError> {
        self.select_count.fetch_add(1, Ordering::SeqCst);
        let staged = self.staged.lock().map_err(|_| StorageError::LockPoisoned)?;
        let table = staged
            .get(&self.name)
            .ok_or_else(|| StorageError::OpenTableFailed(self.name.clone()))?;
        Ok(table
            .get(key)
            .map(|entries| entries.iter().filter(|e| condition.matches(e)).cloned().collect())
            .unwrap_or_default())
    }

    fn insert(&self, key: &str, entry: Entry) -> Result<(), StorageError> {
        let mut staged = self.staged.lock().map_err(|_| StorageError::LockPoisoned)?;
        let table = staged
            .get_mut(&self.name)
            .ok_or_else(|| StorageError::OpenTableFailed(self.name.clone()))?;
        table.entry(key.to_string()).or_default().push(entry);
        Ok(())
    }

    fn update(&self, key: &str, entry: Entry, condition: &Condition) -> Result<(), StorageError> {
        let mut staged = self.staged.lock().map_err(|_| StorageError::LockPoisoned)?;
        let table = staged
            .get_mut(&self.name)
            .ok_or_else(|| StorageError::OpenTableFailed(self.name.clone()))?;
        if let Some(entries) = table.get_mut(key) {
            for existing in entries.iter_mut().filter(|e| condition.matches(e)) {
                for (field, value) in entry.fields() {
                    existing.set(field, value);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(field: &str, value: &str) -> Entry {
        let mut e = Entry::new();
        e.set(field, value);
        e
    }

    #[test]
    fn staged_writes_invisible_until_commit() {
        let store = MemoryStorage::new();

        let writer = store.factory().expect("factory");
        let table = writer.open_table("t").expect("open");
        table.insert("k", entry("value", "1")).expect("insert");

        // A parallel reader over the durable state sees nothing yet.
        let reader = store.factory().expect("factory");
        let read_table = reader.open_table("t").expect("open");
        assert!(read_table.select("k", &Condition::new()).expect("select").is_empty());

        writer.commit().expect("commit");

        // A fresh factory sees the committed row.
        let reader = store.factory().expect("factory");
        let read_table = reader.open_table("t").expect("open");
        let rows = read_table.select("k", &Condition::new()).expect("select");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("value"), Some("1"));
    }

    #[test]
    fn factory_reads_its_own_staged_writes() {
        let store = MemoryStorage::new();
        let factory = store.factory().expect("factory");
        let table = factory.open_table("t").expect("open");
        table.insert("k", entry("value", "1")).expect("insert");

        let rows = table.select("k", &Condition::new()).expect("select");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn injected_flush_failure_applies_nothing() {
        let store = MemoryStorage::new();
        let factory = store.factory().expect("factory");
        let table = factory.open_table("t").expect("open");
        table.insert("k", entry("value", "1")).expect("insert");

        store.fail_next_commit();
        let result = factory.commit();
        assert!(matches!(result, Err(StorageError::CommitFailed(_))));

        let reader = store.factory().expect("factory");
        let read_table = reader.open_table("t").expect("open");
        assert!(read_table.select("k", &Condition::new()).expect("select").is_empty());
    }

    #[test]
    fn update_merges_only_matching_entries() {
        let store = MemoryStorage::new();
        let factory = store.factory().expect("factory");
        let table = factory.open_table("t").expect("open");

        let mut sealer = entry("type", "sealer");
        sealer.set("node_id", "0xab");
        let mut observer = entry("type", "observer");
        observer.set("node_id", "0xcd");
        table.insert("node", sealer).expect("insert");
        table.insert("node", observer).expect("insert");

        table
            .update("node", entry("enable_num", "5"), &Condition::new().eq("type", "sealer"))
            .expect("update");

        let rows = table.select("node", &Condition::new()).expect("select");
        assert_eq!(rows[0].get("enable_num"), Some("5"));
        assert_eq!(rows[1].get("enable_num"), None);
    }

    #[test]
    fn select_preserves_insertion_order() {
        let store = MemoryStorage::new();
        let factory = store.factory().expect("factory");
        let table = factory.open_table("t").expect("open");
        for i in 0..4 {
            table.insert("node", entry("node_id", &i.to_string())).expect("insert");
        }

        let rows = table.select("node", &Condition::new()).expect("select");
        let ids: Vec<_> = rows.iter().map(|e| e.get("node_id").unwrap().to_string()).collect();
        assert_eq!(ids, ["0", "1", "2", "3"]);
    }

    #[test]
    fn select_counter_tracks_reads() {
        let store = MemoryStorage::new();
        let factory = store.factory().expect("factory");
        let table = factory.open_table("t").expect("open");

        let before = store.select_count();
        table.select("k", &Condition::new()).expect("select");
        table.select("k", &Condition::new()).expect("select");
        assert_eq!(store.select_count(), before + 2);
    }
}
