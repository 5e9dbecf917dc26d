use crate::ChainError;
use alloy_primitives::{Address, Bytes};

/// Read-only access to the executed state layer.
///
/// The ledger index does not own account state; code lookups delegate to
/// whichever state backend the node wires in.
pub trait StateReader: Send + Sync {
    /// Contract code stored at `address`, as of height `at`.
    ///
    /// Returns `Ok(None)` when no code is stored at the address.
    fn code(&self, address: Address, at: i64) -> Result<Option<Bytes>, ChainError>;
}
