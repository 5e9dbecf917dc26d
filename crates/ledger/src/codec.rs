//! Field codecs for system-table rows.
//!
//! Table entries carry string fields; these helpers convert between the
//! stored form and the typed form, reporting [`ChainError::Corrupt`] when a
//! stored value cannot be parsed back.

use crate::ChainError;
use alloy_primitives::{B256, hex};
use palisade_storage::Entry;
use palisade_types::NodeId;

pub(crate) fn encode_hash(hash: &B256) -> String {
    format!("{hash:#x}")
}

pub(crate) fn parse_hash(value: &str) -> Result<B256, ChainError> {
    value.parse().map_err(|_| ChainError::Corrupt(format!("invalid block hash: {value}")))
}

pub(crate) fn encode_node(node: &NodeId) -> String {
    format!("{node:#x}")
}

pub(crate) fn parse_node(value: &str) -> Result<NodeId, ChainError> {
    value.parse().map_err(|_| ChainError::Corrupt(format!("invalid node id: {value}")))
}

pub(crate) fn encode_bytes(bytes: &[u8]) -> String {
    hex::encode_prefixed(bytes)
}

pub(crate) fn parse_bytes(value: &str) -> Result<Vec<u8>, ChainError> {
    hex::decode(value).map_err(|_| ChainError::Corrupt("invalid hex body".to_string()))
}

pub(crate) fn i64_field(entry: &Entry, field: &str) -> Result<i64, ChainError> {
    parse_num(field_value(entry, field)?, field)
}

pub(crate) fn u64_field(entry: &Entry, field: &str) -> Result<u64, ChainError> {
    parse_num(field_value(entry, field)?, field)
}

pub(crate) fn b256_field(entry: &Entry, field: &str) -> Result<B256, ChainError> {
    parse_hash(field_value(entry, field)?)
}

pub(crate) fn str_field<'a>(entry: &'a Entry, field: &str) -> Result<&'a str, ChainError> {
    field_value(entry, field)
}

fn field_value<'a>(entry: &'a Entry, field: &str) -> Result<&'a str, ChainError> {
    entry.get(field).ok_or_else(|| ChainError::Corrupt(format!("missing field: {field}")))
}

fn parse_num<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, ChainError> {
    value
        .parse()
        .map_err(|_| ChainError::Corrupt(format!("invalid numeric field {field}: {value}")))
}
