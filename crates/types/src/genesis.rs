//! Genesis parameters.

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Parameters establishing chain identity at height zero.
///
/// Supplied by node configuration loading. The genesis block built from
/// these parameters is deterministic: equal parameters always produce the
/// same genesis hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenesisParams {
    /// Timestamp of the genesis block (milliseconds since Unix epoch).
    pub timestamp: u64,
    /// Initial sealer roster, in rotation order.
    pub sealers: Vec<NodeId>,
    /// Initial observer roster.
    pub observers: Vec<NodeId>,
    /// Initial chain-wide configuration key/value pairs.
    pub configs: Vec<(String, String)>,
}
