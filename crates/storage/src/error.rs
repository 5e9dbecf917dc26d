use thiserror::Error;

/// Errors that may occur while interacting with the table storage substrate.
///
/// This enum is shared by all implementations of the storage traits.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A system table could not be opened.
    #[error("failed to open table: {0}")]
    OpenTableFailed(String),

    /// The atomic flush of staged writes failed. Nothing was applied.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// The expected entry was not found in the table.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// A lock guarding the backing store was poisoned.
    #[error("storage lock poisoned")]
    LockPoisoned,
}
