//! Transaction structures.

use alloy_primitives::{Address, B256, Bytes, keccak256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// A single transaction, content-addressed by its hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct Transaction {
    /// Sender-chosen replay-protection nonce.
    pub nonce: u64,
    /// Sender address.
    pub from: Address,
    /// Recipient address.
    pub to: Address,
    /// Call payload.
    pub data: Bytes,
}

impl Transaction {
    /// Content hash of the transaction (keccak256 of its RLP encoding).
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}

/// A transaction annotated with its position in the committed chain.
///
/// Produced by localised lookups, which resolve the transaction-hash index
/// to the containing block before extracting the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalisedTransaction {
    /// The transaction itself.
    pub transaction: Transaction,
    /// Hash of the containing block.
    pub block_hash: B256,
    /// Height of the containing block.
    pub block_number: u64,
    /// Position of the transaction within the block.
    pub tx_index: u64,
}
