//! Deployment-level configuration of the ledger core.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Tuning and identity values fixed per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Maximum number of decoded blocks held by the block cache.
    pub block_cache_size: usize,

    /// Hash the genesis marker must match on restart. Fixed per
    /// deployment, not user-configurable at runtime.
    pub genesis_hash: B256,
}

impl ChainConfig {
    /// Default block cache bound.
    pub const DEFAULT_BLOCK_CACHE_SIZE: usize = 10;

    /// Configuration with the default cache bound and the given genesis
    /// hash.
    pub const fn new(genesis_hash: B256) -> Self {
        Self { block_cache_size: Self::DEFAULT_BLOCK_CACHE_SIZE, genesis_hash }
    }
}
