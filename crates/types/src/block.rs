//! Block and header structures.
//!
//! A block is an ordered sequence of transactions plus the header fields
//! that chain it to its parent. Blocks are content-addressed: the block hash
//! is the keccak256 digest of the RLP-encoded header. Once committed, a
//! block is immutable.

use crate::{NodeId, Receipt, Transaction};
use alloy_primitives::{B256, Bytes, keccak256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// Header fields of a single block.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct BlockHeader {
    /// Height of the block in the chain, starting at 0 for genesis.
    pub number: u64,

    /// Hash of the parent block. Zero for genesis.
    pub parent_hash: B256,

    /// Timestamp of the block (milliseconds since Unix epoch).
    pub timestamp: u64,

    /// Identity of the sealer that produced the block. Zero for genesis.
    pub sealer: NodeId,

    /// State root after executing the block's transactions.
    pub state_root: B256,

    /// Opaque extra data. For genesis this commits to the initial
    /// sealer/observer rosters and configuration.
    pub extra_data: Bytes,
}

impl BlockHeader {
    /// Content hash of the header, which is also the block hash.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}

/// A full block: header, transactions and the receipts produced when the
/// block was executed.
///
/// The receipt at index `i` belongs to the transaction at index `i`.
/// Genesis carries no transactions and no receipts.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// Transactions contained in the block, in execution order.
    pub transactions: Vec<Transaction>,
    /// Receipts produced at commit time, parallel to `transactions`.
    pub receipts: Vec<Receipt>,
}

impl Block {
    /// Content hash of the block (the header hash).
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// RLP encoding of the full block body, as stored in the
    /// hash-to-block index.
    pub fn rlp_bytes(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// Decodes a block from its stored RLP body.
    pub fn decode_rlp(mut body: &[u8]) -> Result<Self, alloy_rlp::Error> {
        <Self as alloy_rlp::Decodable>::decode(&mut body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    fn sample_block() -> Block {
        Block {
            header: BlockHeader {
                number: 7,
                parent_hash: b256!(
                    "0x1111111111111111111111111111111111111111111111111111111111111111"
                ),
                timestamp: 1_700_000_000_000,
                sealer: NodeId::repeat_byte(0xab),
                state_root: B256::ZERO,
                extra_data: Bytes::from_static(b"palisade"),
            },
            transactions: vec![Transaction::default()],
            receipts: vec![Receipt::default()],
        }
    }

    #[test]
    fn block_hash_is_header_hash() {
        let block = sample_block();
        assert_eq!(block.hash(), block.header.hash());
    }

    #[test]
    fn hash_changes_with_content() {
        let block = sample_block();
        let mut other = block.clone();
        other.header.number += 1;
        assert_ne!(block.hash(), other.hash());
    }

    #[test]
    fn rlp_body_round_trips() {
        let block = sample_block();
        let decoded = Block::decode_rlp(&block.rlp_bytes()).expect("valid body");
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());
    }
}
