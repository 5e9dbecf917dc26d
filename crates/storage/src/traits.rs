//! Collaborator interfaces for the table storage substrate.
//!
//! The substrate exposes named tables of string-field rows. Writes staged
//! through a [`TableFactory`] become durable only when the factory commits,
//! and the commit is atomic over every staged write of every table opened
//! through that factory. Implementations are expected to be thread-safe;
//! storage calls are synchronous from the ledger's perspective.

use crate::StorageError;
use std::{collections::BTreeMap, sync::Arc};

/// A single row of a table: an ordered map of field name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    fields: BTreeMap<String, String>,
}

impl Entry {
    /// Creates an empty entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`, replacing any previous value.
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Returns the value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Iterates over the entry's (field, value) pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Equality predicates applied by [`Table::select`] and [`Table::update`].
///
/// An empty condition matches every entry.
#[derive(Debug, Clone, Default)]
pub struct Condition {
    eq: Vec<(String, String)>,
}

impl Condition {
    /// Creates a condition with no predicates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality predicate on `field`.
    pub fn eq(mut self, field: &str, value: impl Into<String>) -> Self {
        self.eq.push((field.to_string(), value.into()));
        self
    }

    /// Whether `entry` satisfies every predicate.
    pub fn matches(&self, entry: &Entry) -> bool {
        self.eq.iter().all(|(field, value)| entry.get(field) == Some(value.as_str()))
    }
}

/// A named key/value table with typed string entries.
///
/// All mutations are staged in the owning [`TableFactory`] and become
/// visible to other factories only after that factory commits. A table's
/// own reads observe its staged writes.
pub trait Table: Send + Sync {
    /// Returns the entries stored under `key` that satisfy `condition`,
    /// in insertion order.
    fn select(&self, key: &str, condition: &Condition) -> Result<Vec<Entry>, StorageError>;

    /// Stages the insertion of `entry` under `key`.
    fn insert(&self, key: &str, entry: Entry) -> Result<(), StorageError>;

    /// Stages a field-merge of `entry` into every entry under `key` that
    /// satisfies `condition`. Entries not matching are left untouched.
    fn update(&self, key: &str, entry: Entry, condition: &Condition) -> Result<(), StorageError>;
}

/// A transaction scope over the substrate: opens tables and commits all
/// staged writes atomically.
pub trait TableFactory: Send + Sync {
    /// Opens the named table within this transaction scope.
    fn open_table(&self, name: &str) -> Result<Arc<dyn Table>, StorageError>;

    /// Flushes every staged write of every opened table as one atomic
    /// unit. Either all staged writes become durable or none do.
    fn commit(&self) -> Result<(), StorageError>;
}

/// The durable storage substrate. Each call to [`Storage::factory`]
/// produces a fresh transaction scope over the current durable state.
pub trait Storage: Send + Sync {
    /// Begins a new transaction scope.
    fn factory(&self) -> Result<Arc<dyn TableFactory>, StorageError>;
}

/// Supplies the transaction scope a block was executed in.
///
/// Produced by the execution engine before a block is handed to the ledger
/// for commit: state writes staged by execution and index writes staged by
/// the ledger land in the same atomic flush.
pub trait ExecutionContext: Send + Sync {
    /// The table factory carrying this block's staged state writes.
    fn table_factory(&self) -> Arc<dyn TableFactory>;
}

/// Minimal [`ExecutionContext`] handing out a pre-built factory.
///
/// Used by embedders without a separate execution engine, and by tests.
#[derive(Clone)]
pub struct StaticExecutionContext {
    factory: Arc<dyn TableFactory>,
}

impl StaticExecutionContext {
    /// Wraps `factory` as an execution context.
    pub fn new(factory: Arc<dyn TableFactory>) -> Self {
        Self { factory }
    }
}

impl std::fmt::Debug for StaticExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticExecutionContext").finish_non_exhaustive()
    }
}

impl ExecutionContext for StaticExecutionContext {
    fn table_factory(&self) -> Arc<dyn TableFactory> {
        Arc::clone(&self.factory)
    }
}
