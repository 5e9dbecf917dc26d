//! Well-known system table and field names.
//!
//! These names form the on-disk schema of the chain and are preserved
//! exactly for compatibility with existing deployments. No component other
//! than the ledger may write to these tables.

/// Current-state table: single-field rows keyed by state name
/// (current height, cumulative transaction count, genesis marker).
pub const SYS_CURRENT_STATE: &str = "_sys_current_state_";
/// Height to block-hash index.
pub const SYS_NUMBER_2_HASH: &str = "_sys_number_2_hash_";
/// Block-hash to RLP block-body index.
pub const SYS_HASH_2_BLOCK: &str = "_sys_hash_2_block_";
/// Transaction-hash to (block height, position-in-block) index.
pub const SYS_TX_HASH_2_BLOCK: &str = "_sys_tx_hash_2_block_";
/// Block-hash to header metadata (parent hash, sealer, timestamp),
/// serving header-only queries without decoding the full body.
pub const SYS_BLOCK_META: &str = "_sys_block_meta_";
/// Chain-wide configuration key/value table.
pub const SYS_CONFIG: &str = "_sys_config_";
/// Sealer/observer roster table.
pub const SYS_CONSENSUS: &str = "_sys_consensus_";

/// Generic value field carried by most index rows.
pub const FIELD_VALUE: &str = "value";
/// Position-in-block field of the transaction index.
pub const FIELD_INDEX: &str = "index";
/// Node role field of the roster table.
pub const FIELD_TYPE: &str = "type";
/// Node identity field of the roster table.
pub const FIELD_NODE_ID: &str = "node_id";
/// Height from which a roster or config row takes effect.
pub const FIELD_ENABLE_NUM: &str = "enable_num";
/// Parent-hash field of the block metadata table.
pub const FIELD_PARENT_HASH: &str = "parent_hash";
/// Sealer-identity field of the block metadata table.
pub const FIELD_SEALER: &str = "sealer";
/// Timestamp field of the block metadata table.
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Current-state key holding the height of the most recent block.
pub const KEY_CURRENT_NUMBER: &str = "current_number";
/// Current-state key holding the cumulative transaction count.
pub const KEY_TOTAL_TRANSACTION_COUNT: &str = "total_transaction_count";
/// Current-state key of the genesis marker row. Its presence means the
/// chain has been bootstrapped; its value is the genesis block hash.
pub const KEY_GENESIS_HASH: &str = "genesis_hash";

/// Shared primary key of all roster rows.
pub const NODE_PRI_KEY: &str = "node";
/// Roster row type marking a block-producing node.
pub const NODE_TYPE_SEALER: &str = "sealer";
/// Roster row type marking a replicating, non-producing node.
pub const NODE_TYPE_OBSERVER: &str = "observer";
