//! Core types shared across palisade components.
//!
//! This crate defines the block, transaction and receipt structures stored
//! and indexed by the ledger, along with the genesis parameters that
//! establish chain identity at height zero.
mod block;
pub use block::{Block, BlockHeader};
mod transaction;
pub use transaction::{LocalisedTransaction, Transaction};
mod receipt;
pub use receipt::{LocalisedReceipt, Receipt};
mod genesis;
pub use genesis::GenesisParams;

/// Public-key identity of a chain node (sealer or observer).
pub type NodeId = alloy_primitives::B512;
