//! The canonical chain: commit pipeline, query surface and derived caches.

use crate::{
    BlockCache, ChainConfig, ChainError, CommitResult, StateReader, codec,
    genesis::genesis_block, writer::IndexWriter,
};
use alloy_primitives::{Address, B256, Bytes};
use palisade_storage::{
    Condition, ExecutionContext, Storage, TableFactory,
    tables::{
        FIELD_ENABLE_NUM, FIELD_INDEX, FIELD_NODE_ID, FIELD_TYPE, FIELD_VALUE,
        KEY_CURRENT_NUMBER, KEY_GENESIS_HASH, KEY_TOTAL_TRANSACTION_COUNT, NODE_PRI_KEY,
        NODE_TYPE_OBSERVER, NODE_TYPE_SEALER, SYS_CONFIG, SYS_CONSENSUS, SYS_CURRENT_STATE,
        SYS_HASH_2_BLOCK, SYS_NUMBER_2_HASH, SYS_TX_HASH_2_BLOCK,
    },
};
use palisade_types::{
    Block, GenesisParams, LocalisedReceipt, LocalisedTransaction, NodeId, Receipt, Transaction,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, error, info, warn};

/// A chain configuration value together with the height it was read at.
#[derive(Debug, Clone)]
struct SystemConfigRecord {
    value: Option<String>,
    cur_block_num: i64,
}

/// Sealer and observer lists, each tagged with the height they were
/// derived at.
#[derive(Debug, Default)]
struct RosterCache {
    sealers: Option<(i64, Vec<NodeId>)>,
    observers: Option<(i64, Vec<NodeId>)>,
}

/// The canonical block chain of a palisade node.
///
/// `Chain` is the single write path for agreed blocks and the single read
/// path for committed chain state. All durable data lives in the table
/// storage substrate; the height pointer, the block cache and the
/// config/roster caches are derived views that are recalibrated from
/// storage whenever they are stale.
///
/// Commits are serialized through an internal mutex and validated against
/// a fresh storage read of the current height, so a racing or replayed
/// commit is reported through [`CommitResult`] instead of corrupting the
/// chain.
pub struct Chain {
    storage: Arc<dyn Storage>,
    config: ChainConfig,
    state_reader: Option<Arc<dyn StateReader>>,
    commit_lock: Mutex<()>,
    /// Height of the most recently committed block, -1 before genesis.
    block_number: RwLock<i64>,
    block_cache: BlockCache,
    system_configs: RwLock<HashMap<String, SystemConfigRecord>>,
    roster: RwLock<RosterCache>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Chain {
    /// Creates a chain over `storage` with the given configuration.
    ///
    /// The height pointer starts uncalibrated; call
    /// [`Self::check_and_build_genesis_block`] before serving queries.
    pub fn new(storage: Arc<dyn Storage>, config: ChainConfig) -> Self {
        let block_cache = BlockCache::new(config.block_cache_size);
        Self {
            storage,
            config,
            state_reader: None,
            commit_lock: Mutex::new(()),
            block_number: RwLock::new(-1),
            block_cache,
            system_configs: RwLock::new(HashMap::new()),
            roster: RwLock::new(RosterCache::default()),
        }
    }

    /// Attaches the state backend serving code lookups.
    #[must_use]
    pub fn with_state_reader(mut self, reader: Arc<dyn StateReader>) -> Self {
        self.state_reader = Some(reader);
        self
    }

    /// Height of the most recently committed block, -1 before genesis.
    pub fn number(&self) -> Result<i64, ChainError> {
        let cached = *read(&self.block_number);
        if cached >= 0 {
            return Ok(cached);
        }
        let stored = self.storage_number()?;
        if stored >= 0 {
            *write(&self.block_number) = stored;
        }
        Ok(stored)
    }

    /// Hash of the block at `number`, or `None` when no block is committed
    /// at that height.
    pub fn number_hash(&self, number: i64) -> Result<Option<B256>, ChainError> {
        if number < 0 {
            return Ok(None);
        }
        let factory = self.storage.factory()?;
        let table = factory.open_table(SYS_NUMBER_2_HASH)?;
        match table.select(&number.to_string(), &Condition::new())?.first() {
            Some(entry) => Ok(Some(codec::b256_field(entry, FIELD_VALUE)?)),
            None => Ok(None),
        }
    }

    /// The block at `number`, or `None` when the height is outside the
    /// committed range.
    pub fn get_block_by_number(&self, number: i64) -> Result<Option<Arc<Block>>, ChainError> {
        if number < 0 || number > self.number()? {
            return Ok(None);
        }
        match self.number_hash(number)? {
            Some(hash) => self.get_block_by_hash(&hash),
            None => Ok(None),
        }
    }

    /// The block with the given hash, served from the block cache when
    /// possible and decoded from storage otherwise.
    pub fn get_block_by_hash(&self, hash: &B256) -> Result<Option<Arc<Block>>, ChainError> {
        let (cached, hash) = self.block_cache.get(hash);
        if let Some(block) = cached {
            return Ok(Some(block));
        }
        let Some(body) = self.block_body_bytes(&hash)? else {
            return Ok(None);
        };
        let block = Block::decode_rlp(&body)
            .map_err(|_| ChainError::Corrupt(format!("undecodable block body for {hash:#x}")))?;
        Ok(Some(self.block_cache.add(block)))
    }

    /// The stored RLP body of the block at `number`.
    pub fn get_block_rlp_by_number(&self, number: i64) -> Result<Option<Vec<u8>>, ChainError> {
        if number < 0 || number > self.number()? {
            return Ok(None);
        }
        match self.number_hash(number)? {
            Some(hash) => self.get_block_rlp_by_hash(&hash),
            None => Ok(None),
        }
    }

    /// The stored RLP body of the block with the given hash.
    pub fn get_block_rlp_by_hash(&self, hash: &B256) -> Result<Option<Vec<u8>>, ChainError> {
        if let (Some(block), _) = self.block_cache.get(hash) {
            return Ok(Some(block.rlp_bytes()));
        }
        self.block_body_bytes(hash)
    }

    /// The committed transaction with the given hash.
    pub fn get_tx_by_hash(&self, tx_hash: &B256) -> Result<Option<Transaction>, ChainError> {
        Ok(self
            .locate_tx(tx_hash)?
            .and_then(|(block, index)| block.transactions.get(index as usize).cloned()))
    }

    /// The committed transaction with the given hash, annotated with its
    /// position in the chain.
    pub fn get_localised_tx_by_hash(
        &self,
        tx_hash: &B256,
    ) -> Result<Option<LocalisedTransaction>, ChainError> {
        let Some((block, index)) = self.locate_tx(tx_hash)? else {
            return Ok(None);
        };
        Ok(block.transactions.get(index as usize).map(|tx| LocalisedTransaction {
            transaction: tx.clone(),
            block_hash: block.hash(),
            block_number: block.header.number,
            tx_index: index,
        }))
    }

    /// The receipt of the transaction with the given hash.
    pub fn get_transaction_receipt_by_hash(
        &self,
        tx_hash: &B256,
    ) -> Result<Option<Receipt>, ChainError> {
        Ok(self
            .locate_tx(tx_hash)?
            .and_then(|(block, index)| block.receipts.get(index as usize).cloned()))
    }

    /// The receipt of the transaction with the given hash, annotated with
    /// its position in the chain.
    pub fn get_localised_tx_receipt_by_hash(
        &self,
        tx_hash: &B256,
    ) -> Result<Option<LocalisedReceipt>, ChainError> {
        let Some((block, index)) = self.locate_tx(tx_hash)? else {
            return Ok(None);
        };
        let position = index as usize;
        match (block.receipts.get(position), block.transactions.get(position)) {
            (Some(receipt), Some(tx)) => Ok(Some(LocalisedReceipt::new(
                receipt.clone(),
                tx,
                block.hash(),
                block.header.number,
                index,
            ))),
            _ => Ok(None),
        }
    }

    /// Cumulative transaction count and the height it was observed at.
    ///
    /// Both values are read from one storage snapshot, so the returned
    /// count never includes transactions from a block beyond the returned
    /// height, even while a commit is in flight.
    pub fn total_transaction_count(&self) -> Result<(i64, i64), ChainError> {
        let factory = self.storage.factory()?;
        let table = factory.open_table(SYS_CURRENT_STATE)?;
        let count = match table.select(KEY_TOTAL_TRANSACTION_COUNT, &Condition::new())?.first() {
            Some(entry) => codec::i64_field(entry, FIELD_VALUE)?,
            None => 0,
        };
        let number = match table.select(KEY_CURRENT_NUMBER, &Condition::new())?.first() {
            Some(entry) => codec::i64_field(entry, FIELD_VALUE)?,
            None => -1,
        };
        Ok((count, number))
    }

    /// Nonces of every transaction in the block at `number`, in block
    /// order.
    pub fn get_nonces(&self, number: i64) -> Result<Option<Vec<u64>>, ChainError> {
        Ok(self
            .get_block_by_number(number)?
            .map(|block| block.transactions.iter().map(|tx| tx.nonce).collect()))
    }

    /// Contract code stored at `address` as of the current height, or
    /// `None` when no state backend is attached.
    pub fn get_code(&self, address: Address) -> Result<Option<Bytes>, ChainError> {
        match &self.state_reader {
            Some(reader) => reader.code(address, self.number()?),
            None => Ok(None),
        }
    }

    /// The chain configuration value under `key`, effective at the current
    /// height.
    ///
    /// Results are cached per height; a cache entry recorded at an older
    /// height is re-read from storage.
    pub fn get_system_config_by_key(&self, key: &str) -> Result<Option<String>, ChainError> {
        let current = self.number()?;
        if let Some(record) = read(&self.system_configs).get(key) {
            if record.cur_block_num == current {
                return Ok(record.value.clone());
            }
        }
        let value = self.read_system_config(key, current)?;
        write(&self.system_configs).insert(
            key.to_string(),
            SystemConfigRecord { value: value.clone(), cur_block_num: current },
        );
        Ok(value)
    }

    /// The chain configuration value under `key`, effective at height
    /// `number`. Historical reads never touch the per-height cache.
    pub fn get_system_config_by_key_at(
        &self,
        key: &str,
        number: i64,
    ) -> Result<Option<String>, ChainError> {
        self.read_system_config(key, number)
    }

    /// Sealer identities effective at the current height, in roster order.
    pub fn sealer_list(&self) -> Result<Vec<NodeId>, ChainError> {
        let current = self.number()?;
        if let Some((num, list)) = &read(&self.roster).sealers {
            if *num == current {
                return Ok(list.clone());
            }
        }
        let list = self.node_list_by_type(current, NODE_TYPE_SEALER)?;
        write(&self.roster).sealers = Some((current, list.clone()));
        Ok(list)
    }

    /// Observer identities effective at the current height, in roster
    /// order.
    pub fn observer_list(&self) -> Result<Vec<NodeId>, ChainError> {
        let current = self.number()?;
        if let Some((num, list)) = &read(&self.roster).observers {
            if *num == current {
                return Ok(list.clone());
            }
        }
        let list = self.node_list_by_type(current, NODE_TYPE_OBSERVER)?;
        write(&self.roster).observers = Some((current, list.clone()));
        Ok(list)
    }

    /// Appends an agreed block to the chain.
    ///
    /// Index rows are staged into the execution context's table factory and
    /// flushed together with the execution's own staged writes in one
    /// atomic commit. The height pointer advances only after the flush is
    /// confirmed durable. Ordering problems are reported through
    /// [`CommitResult`]; only storage failures surface as errors.
    pub fn commit_block(
        &self,
        block: Block,
        context: &dyn ExecutionContext,
    ) -> Result<CommitResult, ChainError> {
        let _guard = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let factory = context.table_factory();
        self.commit_locked(block, factory.as_ref())
    }

    /// Verifies the genesis marker on startup, building block 0 when the
    /// storage is empty.
    ///
    /// On an already bootstrapped store the marker must match the
    /// configured genesis hash; a mismatch is fatal. On an empty store the
    /// genesis block, the initial rosters and configuration, and the marker
    /// are flushed in one atomic commit.
    pub fn check_and_build_genesis_block(
        &self,
        params: &GenesisParams,
    ) -> Result<(), ChainError> {
        let _guard = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(stored) = self.current_state_value(KEY_GENESIS_HASH)? {
            let stored = codec::parse_hash(&stored)?;
            if stored != self.config.genesis_hash {
                return Err(ChainError::GenesisMismatch {
                    expected: self.config.genesis_hash,
                    stored,
                });
            }
            *write(&self.block_number) = self.storage_number()?;
            debug!(target: "ledger", %stored, "Genesis marker verified");
            return Ok(());
        }

        if self.storage_number()? != -1 {
            return Err(ChainError::Corrupt(
                "chain data present without a genesis marker".to_string(),
            ));
        }

        let block = genesis_block(params);
        let hash = block.hash();
        if hash != self.config.genesis_hash {
            return Err(ChainError::GenesisMismatch {
                expected: self.config.genesis_hash,
                stored: hash,
            });
        }

        let factory = self.storage.factory()?;
        let writer = IndexWriter::new(factory.as_ref());
        for node in &params.sealers {
            writer.write_node(NODE_TYPE_SEALER, node, 0)?;
        }
        for node in &params.observers {
            writer.write_node(NODE_TYPE_OBSERVER, node, 0)?;
        }
        for (key, value) in &params.configs {
            writer.write_config(key, value, 0)?;
        }
        writer.write_genesis_marker(&hash)?;

        match self.commit_locked(block, factory.as_ref())? {
            CommitResult::Ok => {
                info!(
                    target: "ledger",
                    %hash,
                    sealers = params.sealers.len(),
                    observers = params.observers.len(),
                    "Bootstrapped genesis block"
                );
                Ok(())
            }
            status => Err(ChainError::Corrupt(format!("genesis commit rejected: {status}"))),
        }
    }

    /// Commit body shared by [`Self::commit_block`] and the genesis
    /// bootstrapper. The caller holds the commit lock.
    fn commit_locked(
        &self,
        block: Block,
        factory: &dyn TableFactory,
    ) -> Result<CommitResult, ChainError> {
        // The height is re-read from storage under the lock; the in-memory
        // pointer is not trusted for commit ordering.
        let current = self.storage_number()?;
        let Ok(number) = i64::try_from(block.header.number) else {
            warn!(target: "ledger", number = block.header.number, "Block height out of range");
            return Ok(CommitResult::InvalidBlock);
        };

        if number <= current {
            debug!(target: "ledger", number, current, "Replay of an already committed block");
            return Ok(CommitResult::AlreadyExists);
        }
        if number != current + 1 {
            warn!(target: "ledger", number, current, "Height gap, block does not extend the chain");
            return Ok(CommitResult::InvalidBlock);
        }
        if current >= 0 {
            match self.number_hash(current)? {
                Some(parent) if parent == block.header.parent_hash => {}
                Some(parent) => {
                    warn!(
                        target: "ledger",
                        number,
                        expected = %parent,
                        got = %block.header.parent_hash,
                        "Broken parent linkage"
                    );
                    return Ok(CommitResult::InvalidBlock);
                }
                None => {
                    return Err(ChainError::Corrupt(format!(
                        "missing hash index for height {current}"
                    )));
                }
            }
        }

        IndexWriter::new(factory).write_block(&block)?;
        factory.commit().inspect_err(|err| {
            error!(target: "ledger", number, %err, "Block flush failed, ledger state unchanged");
        })?;

        let hash = block.hash();
        let tx_count = block.transactions.len();
        self.block_cache.add(block);
        *write(&self.block_number) = number;
        info!(target: "ledger", number, %hash, tx_count, "Committed block");
        Ok(CommitResult::Ok)
    }

    /// Fresh storage read of the current height, -1 when absent.
    fn storage_number(&self) -> Result<i64, ChainError> {
        match self.current_state_value(KEY_CURRENT_NUMBER)? {
            Some(value) => value
                .parse()
                .map_err(|_| ChainError::Corrupt(format!("invalid current height: {value}"))),
            None => Ok(-1),
        }
    }

    fn current_state_value(&self, key: &str) -> Result<Option<String>, ChainError> {
        let factory = self.storage.factory()?;
        let table = factory.open_table(SYS_CURRENT_STATE)?;
        match table.select(key, &Condition::new())?.first() {
            Some(entry) => Ok(Some(codec::str_field(entry, FIELD_VALUE)?.to_string())),
            None => Ok(None),
        }
    }

    fn block_body_bytes(&self, hash: &B256) -> Result<Option<Vec<u8>>, ChainError> {
        let factory = self.storage.factory()?;
        let table = factory.open_table(SYS_HASH_2_BLOCK)?;
        match table.select(&codec::encode_hash(hash), &Condition::new())?.first() {
            Some(entry) => Ok(Some(codec::parse_bytes(codec::str_field(entry, FIELD_VALUE)?)?)),
            None => Ok(None),
        }
    }

    /// Resolves a transaction hash to its containing block and position.
    fn locate_tx(&self, tx_hash: &B256) -> Result<Option<(Arc<Block>, u64)>, ChainError> {
        let factory = self.storage.factory()?;
        let table = factory.open_table(SYS_TX_HASH_2_BLOCK)?;
        let location = match table.select(&codec::encode_hash(tx_hash), &Condition::new())?.first()
        {
            Some(entry) => {
                (codec::i64_field(entry, FIELD_VALUE)?, codec::u64_field(entry, FIELD_INDEX)?)
            }
            None => return Ok(None),
        };
        let Some(block) = self.get_block_by_number(location.0)? else {
            return Ok(None);
        };
        Ok(Some((block, location.1)))
    }

    /// The last configuration row under `key` whose enable height is at or
    /// below `number`.
    fn read_system_config(&self, key: &str, number: i64) -> Result<Option<String>, ChainError> {
        let factory = self.storage.factory()?;
        let table = factory.open_table(SYS_CONFIG)?;
        let mut effective = None;
        for entry in table.select(key, &Condition::new())? {
            if codec::i64_field(&entry, FIELD_ENABLE_NUM)? <= number {
                effective = Some(codec::str_field(&entry, FIELD_VALUE)?.to_string());
            }
        }
        Ok(effective)
    }

    /// Roster rows of `node_type` whose enable height is at or below
    /// `number`, in insertion order.
    fn node_list_by_type(
        &self,
        number: i64,
        node_type: &str,
    ) -> Result<Vec<NodeId>, ChainError> {
        let factory = self.storage.factory()?;
        let table = factory.open_table(SYS_CONSENSUS)?;
        let condition = Condition::new().eq(FIELD_TYPE, node_type);
        let mut nodes = Vec::new();
        for entry in table.select(NODE_PRI_KEY, &condition)? {
            if codec::i64_field(&entry, FIELD_ENABLE_NUM)? <= number {
                nodes.push(codec::parse_node(codec::str_field(&entry, FIELD_NODE_ID)?)?);
            }
        }
        Ok(nodes)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    // Derived caches stay internally consistent across a poisoned lock.
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_node;
    use palisade_storage::{Entry, MemoryStorage, StaticExecutionContext};
    use palisade_types::BlockHeader;

    fn node(byte: u8) -> NodeId {
        NodeId::repeat_byte(byte)
    }

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            nonce,
            from: Address::repeat_byte(0x01),
            to: Address::repeat_byte(0x02),
            data: Bytes::from_static(b"call"),
        }
    }

    fn genesis_params() -> GenesisParams {
        GenesisParams {
            timestamp: 1_000,
            sealers: vec![node(0xaa), node(0xbb), node(0xcc)],
            observers: vec![node(0xdd)],
            configs: vec![("tx_count_limit".to_string(), "1000".to_string())],
        }
    }

    fn bootstrapped_chain() -> (Chain, MemoryStorage) {
        let storage = MemoryStorage::new();
        let config = ChainConfig::new(genesis_block(&genesis_params()).hash());
        let chain = Chain::new(Arc::new(storage.clone()), config);
        chain.check_and_build_genesis_block(&genesis_params()).expect("bootstrap");
        (chain, storage)
    }

    fn make_block(chain: &Chain, txs: Vec<Transaction>) -> Block {
        let number = chain.number().expect("number") + 1;
        let parent_hash =
            chain.number_hash(number - 1).expect("parent hash").unwrap_or_default();
        let receipts = txs
            .iter()
            .enumerate()
            .map(|(i, _)| Receipt {
                status: 0,
                gas_used: 21_000 + i as u64,
                output: Bytes::new(),
            })
            .collect();
        Block {
            header: BlockHeader {
                number: number as u64,
                parent_hash,
                timestamp: 2_000 + number as u64,
                sealer: node(0xaa),
                state_root: B256::repeat_byte(number as u8),
                extra_data: Bytes::new(),
            },
            transactions: txs,
            receipts,
        }
    }

    fn commit(chain: &Chain, storage: &MemoryStorage, block: Block) -> CommitResult {
        let factory = storage.factory().expect("factory");
        chain.commit_block(block, &StaticExecutionContext::new(factory)).expect("commit")
    }

    #[test]
    fn bootstrap_establishes_genesis() {
        let (chain, _) = bootstrapped_chain();

        assert_eq!(chain.number().unwrap(), 0);
        assert_eq!(chain.sealer_list().unwrap(), vec![node(0xaa), node(0xbb), node(0xcc)]);
        assert_eq!(chain.observer_list().unwrap(), vec![node(0xdd)]);
        assert_eq!(
            chain.get_system_config_by_key("tx_count_limit").unwrap(),
            Some("1000".to_string())
        );

        let genesis = chain.get_block_by_number(0).unwrap().expect("genesis block");
        assert_eq!(genesis.hash(), genesis_block(&genesis_params()).hash());
        assert_eq!(chain.number_hash(0).unwrap(), Some(genesis.hash()));
        assert_eq!(chain.total_transaction_count().unwrap(), (0, 0));
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let (chain, _) = bootstrapped_chain();
        chain.check_and_build_genesis_block(&genesis_params()).expect("re-bootstrap");
        assert_eq!(chain.number().unwrap(), 0);
        assert_eq!(chain.sealer_list().unwrap().len(), 3);
    }

    #[test]
    fn bootstrap_rejects_foreign_chain() {
        let (_, storage) = bootstrapped_chain();

        let foreign = Chain::new(
            Arc::new(storage),
            ChainConfig::new(B256::repeat_byte(0x09)),
        );
        let err = foreign.check_and_build_genesis_block(&genesis_params()).unwrap_err();
        assert!(matches!(err, ChainError::GenesisMismatch { .. }));
    }

    #[test]
    fn bootstrap_rejects_mismatched_params_on_empty_storage() {
        let storage = MemoryStorage::new();
        let chain = Chain::new(
            Arc::new(storage),
            ChainConfig::new(B256::repeat_byte(0x09)),
        );
        let err = chain.check_and_build_genesis_block(&genesis_params()).unwrap_err();
        assert!(matches!(err, ChainError::GenesisMismatch { .. }));
    }

    #[test]
    fn commit_advances_height_and_indexes() {
        let (chain, storage) = bootstrapped_chain();
        let block = make_block(&chain, vec![tx(1), tx(2)]);
        let hash = block.hash();
        let tx_hash = block.transactions[1].hash();

        assert_eq!(commit(&chain, &storage, block.clone()), CommitResult::Ok);
        assert_eq!(chain.number().unwrap(), 1);
        assert_eq!(chain.total_transaction_count().unwrap(), (2, 1));
        assert_eq!(chain.number_hash(1).unwrap(), Some(hash));
        assert_eq!(chain.get_block_rlp_by_number(1).unwrap(), Some(block.rlp_bytes()));

        let stored = chain.get_block_by_number(1).unwrap().expect("block 1");
        assert_eq!(stored.hash(), hash);

        let found = chain.get_tx_by_hash(&tx_hash).unwrap().expect("tx");
        assert_eq!(found.nonce, 2);

        let localised = chain.get_localised_tx_by_hash(&tx_hash).unwrap().expect("tx");
        assert_eq!(localised.block_number, 1);
        assert_eq!(localised.block_hash, hash);
        assert_eq!(localised.tx_index, 1);

        let receipt = chain.get_transaction_receipt_by_hash(&tx_hash).unwrap().expect("receipt");
        assert_eq!(receipt.gas_used, 21_001);

        let localised = chain.get_localised_tx_receipt_by_hash(&tx_hash).unwrap().expect("receipt");
        assert_eq!(localised.tx_hash, tx_hash);
        assert_eq!(localised.block_number, 1);
        assert_eq!(localised.tx_index, 1);

        assert_eq!(chain.get_nonces(1).unwrap(), Some(vec![1, 2]));
    }

    #[test]
    fn replay_is_reported_not_reapplied() {
        let (chain, storage) = bootstrapped_chain();
        let block = make_block(&chain, vec![tx(1)]);

        assert_eq!(commit(&chain, &storage, block.clone()), CommitResult::Ok);
        assert_eq!(commit(&chain, &storage, block), CommitResult::AlreadyExists);
        assert_eq!(chain.number().unwrap(), 1);
        assert_eq!(chain.total_transaction_count().unwrap(), (1, 1));
    }

    #[test]
    fn transaction_count_pair_is_snapshot_consistent() {
        let (chain, storage) = bootstrapped_chain();

        // A second engine over the same store, pointer calibrated at
        // height 0, models a reader whose in-memory pointer lags a commit.
        let reader = Chain::new(
            Arc::new(storage.clone()),
            ChainConfig::new(genesis_block(&genesis_params()).hash()),
        );
        reader.check_and_build_genesis_block(&genesis_params()).expect("verify marker");
        assert_eq!(*read(&reader.block_number), 0);

        let block = make_block(&chain, vec![tx(1)]);
        assert_eq!(commit(&chain, &storage, block), CommitResult::Ok);

        let (count, number) = reader.total_transaction_count().unwrap();
        assert!(count <= number, "count {count} includes transactions beyond height {number}");
        assert_eq!((count, number), (1, 1));
    }

    #[test]
    fn out_of_range_height_is_rejected() {
        let (chain, storage) = bootstrapped_chain();
        let mut block = make_block(&chain, vec![tx(1)]);
        block.header.number = u64::MAX;

        assert_eq!(commit(&chain, &storage, block), CommitResult::InvalidBlock);
        assert_eq!(chain.number().unwrap(), 0);
    }

    #[test]
    fn height_gap_is_rejected() {
        let (chain, storage) = bootstrapped_chain();
        let mut block = make_block(&chain, vec![tx(1)]);
        block.header.number = 3;

        assert_eq!(commit(&chain, &storage, block), CommitResult::InvalidBlock);
        assert_eq!(chain.number().unwrap(), 0);
        assert_eq!(chain.total_transaction_count().unwrap(), (0, 0));
    }

    #[test]
    fn broken_parent_linkage_is_rejected() {
        let (chain, storage) = bootstrapped_chain();
        let mut block = make_block(&chain, vec![tx(1)]);
        block.header.parent_hash = B256::repeat_byte(0x66);

        assert_eq!(commit(&chain, &storage, block), CommitResult::InvalidBlock);
        assert_eq!(chain.number().unwrap(), 0);
    }

    #[test]
    fn failed_flush_leaves_state_unchanged() {
        let (chain, storage) = bootstrapped_chain();
        let block = make_block(&chain, vec![tx(1)]);

        storage.fail_next_commit();
        let factory = storage.factory().expect("factory");
        let result = chain.commit_block(block.clone(), &StaticExecutionContext::new(factory));
        assert!(matches!(result, Err(ChainError::Storage(_))));

        assert_eq!(chain.number().unwrap(), 0);
        assert_eq!(chain.total_transaction_count().unwrap(), (0, 0));
        assert!(chain.get_block_by_number(1).unwrap().is_none());

        // The same block commits cleanly afterwards.
        assert_eq!(commit(&chain, &storage, block), CommitResult::Ok);
        assert_eq!(chain.number().unwrap(), 1);
    }

    #[test]
    fn restart_recovers_height_from_storage() {
        let (chain, storage) = bootstrapped_chain();
        let block = make_block(&chain, vec![tx(1)]);
        let hash = block.hash();
        assert_eq!(commit(&chain, &storage, block), CommitResult::Ok);

        let restarted = Chain::new(
            Arc::new(storage),
            ChainConfig::new(genesis_block(&genesis_params()).hash()),
        );
        restarted.check_and_build_genesis_block(&genesis_params()).expect("verify marker");
        assert_eq!(restarted.number().unwrap(), 1);

        // Cold cache, block 1 is decoded from its stored body.
        let stored = restarted.get_block_by_number(1).unwrap().expect("block 1");
        assert_eq!(stored.hash(), hash);
    }

    #[test]
    fn block_reads_are_served_from_cache() {
        let (chain, storage) = bootstrapped_chain();
        let block = make_block(&chain, vec![tx(1)]);
        let hash = block.hash();
        assert_eq!(commit(&chain, &storage, block), CommitResult::Ok);

        let before = storage.select_count();
        assert!(chain.get_block_by_hash(&hash).unwrap().is_some());
        assert_eq!(storage.select_count(), before);
    }

    #[test]
    fn sealer_list_is_cached_per_height() {
        let (chain, storage) = bootstrapped_chain();

        let _ = chain.sealer_list().unwrap();
        let before = storage.select_count();
        let _ = chain.sealer_list().unwrap();
        assert_eq!(storage.select_count(), before);
    }

    #[test]
    fn roster_change_takes_effect_after_commit() {
        let (chain, storage) = bootstrapped_chain();
        assert_eq!(chain.sealer_list().unwrap().len(), 3);

        // A privileged transaction grants a new sealer in the same flush
        // as the block commit.
        let factory = storage.factory().expect("factory");
        let table = factory.open_table(SYS_CONSENSUS).expect("open");
        let mut entry = Entry::new();
        entry.set(FIELD_TYPE, NODE_TYPE_SEALER);
        entry.set(FIELD_NODE_ID, encode_node(&node(0xee)));
        entry.set(FIELD_ENABLE_NUM, "1");
        table.insert(NODE_PRI_KEY, entry).expect("insert");

        let block = make_block(&chain, vec![tx(1)]);
        let result = chain
            .commit_block(block, &StaticExecutionContext::new(factory))
            .expect("commit");
        assert_eq!(result, CommitResult::Ok);

        assert_eq!(
            chain.sealer_list().unwrap(),
            vec![node(0xaa), node(0xbb), node(0xcc), node(0xee)]
        );
        assert_eq!(chain.observer_list().unwrap(), vec![node(0xdd)]);
    }

    #[test]
    fn config_reads_are_cached_per_height() {
        let (chain, storage) = bootstrapped_chain();

        let _ = chain.get_system_config_by_key("tx_count_limit").unwrap();
        let before = storage.select_count();
        let _ = chain.get_system_config_by_key("tx_count_limit").unwrap();
        assert_eq!(storage.select_count(), before);

        // Historical reads always go to storage.
        let _ = chain.get_system_config_by_key_at("tx_count_limit", 0).unwrap();
        assert!(storage.select_count() > before);
    }

    #[test]
    fn config_change_respects_enable_height() {
        let (chain, storage) = bootstrapped_chain();

        let factory = storage.factory().expect("factory");
        let table = factory.open_table(SYS_CONFIG).expect("open");
        let mut entry = Entry::new();
        entry.set(FIELD_VALUE, "2000");
        entry.set(FIELD_ENABLE_NUM, "1");
        table.insert("tx_count_limit", entry).expect("insert");

        let block = make_block(&chain, vec![]);
        let result = chain
            .commit_block(block, &StaticExecutionContext::new(factory))
            .expect("commit");
        assert_eq!(result, CommitResult::Ok);

        assert_eq!(
            chain.get_system_config_by_key("tx_count_limit").unwrap(),
            Some("2000".to_string())
        );
        assert_eq!(
            chain.get_system_config_by_key_at("tx_count_limit", 0).unwrap(),
            Some("1000".to_string())
        );
    }

    #[test]
    fn lookups_miss_cleanly() {
        let (chain, _) = bootstrapped_chain();

        assert!(chain.get_block_by_number(5).unwrap().is_none());
        assert!(chain.get_block_by_number(-2).unwrap().is_none());
        assert!(chain.get_block_rlp_by_number(5).unwrap().is_none());
        assert!(chain.number_hash(7).unwrap().is_none());
        assert!(chain.get_block_by_hash(&B256::repeat_byte(0x42)).unwrap().is_none());

        let unknown = B256::repeat_byte(0x43);
        assert!(chain.get_tx_by_hash(&unknown).unwrap().is_none());
        assert!(chain.get_localised_tx_by_hash(&unknown).unwrap().is_none());
        assert!(chain.get_transaction_receipt_by_hash(&unknown).unwrap().is_none());
        assert!(chain.get_localised_tx_receipt_by_hash(&unknown).unwrap().is_none());
        assert!(chain.get_nonces(9).unwrap().is_none());
        assert!(chain.get_system_config_by_key("missing").unwrap().is_none());
    }

    #[test]
    fn code_lookup_delegates_to_state_reader() {
        struct HeightEcho;
        impl StateReader for HeightEcho {
            fn code(&self, _address: Address, at: i64) -> Result<Option<Bytes>, ChainError> {
                Ok(Some(Bytes::from(at.to_be_bytes().to_vec())))
            }
        }

        let (chain, _) = bootstrapped_chain();
        assert_eq!(chain.get_code(Address::repeat_byte(0x01)).unwrap(), None);

        let storage = MemoryStorage::new();
        let chain = Chain::new(
            Arc::new(storage),
            ChainConfig::new(genesis_block(&genesis_params()).hash()),
        )
        .with_state_reader(Arc::new(HeightEcho));
        chain.check_and_build_genesis_block(&genesis_params()).expect("bootstrap");

        let code = chain.get_code(Address::repeat_byte(0x01)).unwrap().expect("code");
        assert_eq!(code, Bytes::from(0i64.to_be_bytes().to_vec()));
    }
}
