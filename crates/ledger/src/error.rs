use alloy_primitives::B256;
use palisade_storage::StorageError;
use thiserror::Error;

/// Errors raised at the ledger boundary.
///
/// Storage failures are never swallowed into a silent success, and the
/// height pointer never advances except after a confirmed durable flush.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A substrate operation failed (open, read or flush).
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The stored genesis hash disagrees with the configured constant.
    /// Fatal: the node must not operate on a foreign chain.
    #[error("genesis hash mismatch: expected {expected}, stored {stored}")]
    GenesisMismatch {
        /// The hash this deployment is configured to expect.
        expected: B256,
        /// The hash found in the genesis marker row, or the hash the
        /// supplied genesis parameters produce.
        stored: B256,
    },

    /// A stored field failed to parse back into its typed form.
    #[error("corrupt ledger entry: {0}")]
    Corrupt(String),
}

/// Outcome of a commit attempt.
///
/// Only storage failures surface as errors; ordering problems are reported
/// through this status so consensus can distinguish a benign replay from a
/// block it must resubmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum CommitResult {
    /// The block was appended and the height pointer advanced by one.
    #[display("committed")]
    Ok,

    /// The block height is at or below the current height: an idempotent
    /// replay of an already committed block. No mutation was performed.
    #[display("already committed")]
    AlreadyExists,

    /// The block does not extend the chain (height gap or broken parent
    /// linkage). The caller must resubmit the correct next block; gaps are
    /// never buffered.
    #[display("invalid block")]
    InvalidBlock,
}
