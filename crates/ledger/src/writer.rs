//! Staged index writes for the commit pipeline.

use crate::codec::{encode_bytes, encode_hash, encode_node, i64_field};
use alloy_primitives::B256;
use palisade_storage::{
    Condition, Entry, StorageError, Table, TableFactory,
    tables::{
        FIELD_ENABLE_NUM, FIELD_INDEX, FIELD_NODE_ID, FIELD_PARENT_HASH, FIELD_SEALER,
        FIELD_TIMESTAMP, FIELD_TYPE, FIELD_VALUE, KEY_CURRENT_NUMBER, KEY_GENESIS_HASH,
        KEY_TOTAL_TRANSACTION_COUNT, NODE_PRI_KEY, SYS_BLOCK_META, SYS_CONFIG, SYS_CONSENSUS,
        SYS_CURRENT_STATE, SYS_HASH_2_BLOCK, SYS_NUMBER_2_HASH, SYS_TX_HASH_2_BLOCK,
    },
};
use palisade_types::{Block, NodeId};
use std::sync::Arc;
use tracing::error;

/// Stages every index row a block commit needs into one table factory.
///
/// The writer only stages; durability happens when the caller commits the
/// factory. Staging into the factory the block was executed in makes the
/// index rows and the execution's state writes one atomic flush.
pub(crate) struct IndexWriter<'a> {
    factory: &'a dyn TableFactory,
}

impl<'a> IndexWriter<'a> {
    /// Creates a writer staging into `factory`.
    pub(crate) const fn new(factory: &'a dyn TableFactory) -> Self {
        Self { factory }
    }

    /// Stages the full index row set for `block`.
    pub(crate) fn write_block(&self, block: &Block) -> Result<(), crate::ChainError> {
        let hash = block.hash();
        self.write_current_number(block.header.number)?;
        self.write_total_transaction_count(block.transactions.len() as i64)?;
        self.write_tx_to_block(block)?;
        self.write_number_2_hash(block.header.number, &hash)?;
        self.write_hash_2_block(block, &hash)?;
        self.write_block_meta(block, &hash)?;
        Ok(())
    }

    /// Stages the genesis marker row carrying `hash`.
    pub(crate) fn write_genesis_marker(&self, hash: &B256) -> Result<(), crate::ChainError> {
        let table = self.open(SYS_CURRENT_STATE)?;
        let mut entry = Entry::new();
        entry.set(FIELD_VALUE, encode_hash(hash));
        table.insert(KEY_GENESIS_HASH, entry)?;
        Ok(())
    }

    /// Stages a roster row granting `node` the given role from height
    /// `enable_num` on.
    pub(crate) fn write_node(
        &self,
        role: &str,
        node: &NodeId,
        enable_num: i64,
    ) -> Result<(), crate::ChainError> {
        let table = self.open(SYS_CONSENSUS)?;
        let mut entry = Entry::new();
        entry.set(FIELD_TYPE, role);
        entry.set(FIELD_NODE_ID, encode_node(node));
        entry.set(FIELD_ENABLE_NUM, enable_num.to_string());
        table.insert(NODE_PRI_KEY, entry)?;
        Ok(())
    }

    /// Stages a configuration row setting `key` to `value` from height
    /// `enable_num` on.
    pub(crate) fn write_config(
        &self,
        key: &str,
        value: &str,
        enable_num: i64,
    ) -> Result<(), crate::ChainError> {
        let table = self.open(SYS_CONFIG)?;
        let mut entry = Entry::new();
        entry.set(FIELD_VALUE, value);
        entry.set(FIELD_ENABLE_NUM, enable_num.to_string());
        table.insert(key, entry)?;
        Ok(())
    }

    fn write_current_number(&self, number: u64) -> Result<(), crate::ChainError> {
        self.upsert_current_state(KEY_CURRENT_NUMBER, number.to_string())
    }

    fn write_total_transaction_count(&self, added: i64) -> Result<(), crate::ChainError> {
        let table = self.open(SYS_CURRENT_STATE)?;
        let current = match table
            .select(KEY_TOTAL_TRANSACTION_COUNT, &Condition::new())?
            .first()
        {
            Some(entry) => i64_field(entry, FIELD_VALUE)?,
            None => 0,
        };
        drop(table);
        self.upsert_current_state(KEY_TOTAL_TRANSACTION_COUNT, (current + added).to_string())
    }

    fn write_tx_to_block(&self, block: &Block) -> Result<(), crate::ChainError> {
        let table = self.open(SYS_TX_HASH_2_BLOCK)?;
        for (index, tx) in block.transactions.iter().enumerate() {
            let mut entry = Entry::new();
            entry.set(FIELD_VALUE, block.header.number.to_string());
            entry.set(FIELD_INDEX, index.to_string());
            table.insert(&encode_hash(&tx.hash()), entry)?;
        }
        Ok(())
    }

    fn write_number_2_hash(&self, number: u64, hash: &B256) -> Result<(), crate::ChainError> {
        let table = self.open(SYS_NUMBER_2_HASH)?;
        let mut entry = Entry::new();
        entry.set(FIELD_VALUE, encode_hash(hash));
        table.insert(&number.to_string(), entry)?;
        Ok(())
    }

    fn write_hash_2_block(&self, block: &Block, hash: &B256) -> Result<(), crate::ChainError> {
        let table = self.open(SYS_HASH_2_BLOCK)?;
        let mut entry = Entry::new();
        entry.set(FIELD_VALUE, encode_bytes(&block.rlp_bytes()));
        table.insert(&encode_hash(hash), entry)?;
        Ok(())
    }

    fn write_block_meta(&self, block: &Block, hash: &B256) -> Result<(), crate::ChainError> {
        let table = self.open(SYS_BLOCK_META)?;
        let mut entry = Entry::new();
        entry.set(FIELD_PARENT_HASH, encode_hash(&block.header.parent_hash));
        entry.set(FIELD_SEALER, encode_node(&block.header.sealer));
        entry.set(FIELD_TIMESTAMP, block.header.timestamp.to_string());
        table.insert(&encode_hash(hash), entry)?;
        Ok(())
    }

    fn upsert_current_state(&self, key: &str, value: String) -> Result<(), crate::ChainError> {
        let table = self.open(SYS_CURRENT_STATE)?;
        let mut entry = Entry::new();
        entry.set(FIELD_VALUE, value);
        if table.select(key, &Condition::new())?.is_empty() {
            table.insert(key, entry)?;
        } else {
            table.update(key, entry, &Condition::new())?;
        }
        Ok(())
    }

    fn open(&self, name: &str) -> Result<Arc<dyn Table>, StorageError> {
        self.factory.open_table(name).inspect_err(|err| {
            error!(target: "ledger", table = name, %err, "Failed to open system table");
        })
    }
}
