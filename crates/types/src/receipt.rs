//! Transaction receipt structures.

use crate::Transaction;
use alloy_primitives::{B256, Bytes};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// Execution receipt of a committed transaction.
///
/// A receipt is produced exactly once per transaction, at commit time, and
/// is permanently associated with the transaction hash and the containing
/// block height. No receipt exists for unconfirmed transactions.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct Receipt {
    /// Execution status code (0 = success).
    pub status: u64,
    /// Gas consumed by the transaction.
    pub gas_used: u64,
    /// Return data of the call.
    pub output: Bytes,
}

/// A receipt annotated with the position of its transaction in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalisedReceipt {
    /// The receipt itself.
    pub receipt: Receipt,
    /// Hash of the transaction the receipt belongs to.
    pub tx_hash: B256,
    /// Hash of the containing block.
    pub block_hash: B256,
    /// Height of the containing block.
    pub block_number: u64,
    /// Position of the transaction within the block.
    pub tx_index: u64,
}

impl LocalisedReceipt {
    /// Builds a localised receipt for `tx` at `tx_index` of the block
    /// identified by `block_hash`/`block_number`.
    pub fn new(
        receipt: Receipt,
        tx: &Transaction,
        block_hash: B256,
        block_number: u64,
        tx_index: u64,
    ) -> Self {
        Self { receipt, tx_hash: tx.hash(), block_hash, block_number, tx_index }
    }
}
