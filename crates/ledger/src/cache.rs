//! Bounded FIFO cache of recently committed blocks.

use alloy_primitives::B256;
use palisade_types::Block;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, PoisonError, RwLock},
};

/// Thread-safe, recency-ordered block cache with FIFO eviction.
///
/// Entries are keyed by block hash and evicted strictly in insertion order
/// once the cache is full; subsequent reads do not refresh an entry's
/// position (this is not an LRU). Stored blocks are never mutated, and a
/// handle returned to a caller stays valid after the cache evicts its own
/// reference.
#[derive(Debug)]
pub struct BlockCache {
    inner: RwLock<CacheInner>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct CacheInner {
    blocks: HashMap<B256, Arc<Block>>,
    fifo: VecDeque<B256>,
}

impl BlockCache {
    /// Creates a cache holding at most `capacity` blocks.
    pub fn new(capacity: usize) -> Self {
        Self { inner: RwLock::new(CacheInner::default()), capacity }
    }

    /// Inserts `block` and returns a shared handle to the stored copy,
    /// evicting the oldest entry first if the cache is full.
    pub fn add(&self, block: Block) -> Arc<Block> {
        let hash = block.hash();
        let handle = Arc::new(block);
        if self.capacity == 0 {
            return handle;
        }

        // The cache is a derived view; a poisoned lock still holds
        // internally consistent data.
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.blocks.get(&hash) {
            return Arc::clone(existing);
        }
        while inner.fifo.len() >= self.capacity {
            if let Some(oldest) = inner.fifo.pop_front() {
                inner.blocks.remove(&oldest);
            }
        }
        inner.blocks.insert(hash, Arc::clone(&handle));
        inner.fifo.push_back(hash);
        handle
    }

    /// Looks up a block by hash, returning the handle on hit (or `None` on
    /// miss, signaling the caller to fall back to storage and re-`add`)
    /// together with the looked-up hash, so callers avoid recomputing it.
    pub fn get(&self, hash: &B256) -> (Option<Arc<Block>>, B256) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        (inner.blocks.get(hash).map(Arc::clone), *hash)
    }

    /// Number of cached blocks.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).fifo.len()
    }
}
