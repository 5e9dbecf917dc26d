//! Table storage interfaces consumed by the palisade ledger.
//!
//! The ledger core does not own a storage engine. It reads and writes named
//! key/value tables through the capability traits defined here, and the
//! concrete backend is supplied by the embedding node. This crate provides:
//!
//! - [`Table`], [`TableFactory`], [`Storage`] and [`ExecutionContext`]: the
//!   collaborator interfaces between the ledger and the substrate.
//! - [`Entry`] and [`Condition`]: the row and predicate model of the tables.
//! - [`MemoryStorage`]: an in-memory backend implementing the full trait
//!   set, used as the test substrate and for ephemeral nodes.
//! - The well-known system table and field names of the chain schema
//!   (see [`tables`]).
mod traits;
pub use traits::{Condition, Entry, ExecutionContext, Storage, StaticExecutionContext, Table, TableFactory};

mod error;
pub use error::StorageError;

pub mod tables;

mod memory;
pub use memory::{MemoryStorage, MemoryTableFactory};
