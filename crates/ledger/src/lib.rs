//! # palisade-ledger
//!
//! The canonical block storage and commit engine of a palisade node: the
//! single path through which agreed blocks become durable, queryable chain
//! state, and the single source of truth other subsystems (consensus,
//! execution, RPC) read from.
//!
//! ## Overview
//!
//! The engine is organized around the [`Chain`] struct, which owns:
//!
//! - the commit pipeline: one atomic, height-ordered append per agreed
//!   block, staged through the execution context's table factory;
//! - the query surface: block, transaction and receipt lookups by hash or
//!   height;
//! - a bounded FIFO [`BlockCache`] of recently committed blocks;
//! - height-scoped caches for chain configuration values and the
//!   sealer/observer roster;
//! - the genesis bootstrapper establishing block 0 on first startup.
//!
//! Durable state lives entirely in the table storage substrate (see
//! `palisade-storage`); every in-memory cache is a derived, disposable
//! view re-derived from storage on miss or staleness.
mod cache;
pub use cache::BlockCache;

mod chain;
pub use chain::Chain;

mod config;
pub use config::ChainConfig;

mod error;
pub use error::{ChainError, CommitResult};

mod genesis;
pub use genesis::genesis_block;

mod traits;
pub use traits::StateReader;

mod codec;
mod writer;
