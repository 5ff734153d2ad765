//! Typed results and the etcd v2 listing document.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{CoordinationError, CoordinationResult};

/// Outcome of a lock attempt. `Failure` means somebody else holds the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockResult {
    Success,
    Failure,
}

impl LockResult {
    /// Returns true if the lock was acquired.
    pub fn is_acquired(self) -> bool {
        matches!(self, LockResult::Success)
    }
}

/// Outcome of writing the caller's own node entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The entry did not exist and was created.
    SelfAdded,
    /// An existing entry had its lease extended.
    Refreshed,
}

/// Whole seconds sent to the store for `ttl`.
///
/// Truncates, then adds one second, so the lease the store grants is never
/// shorter than the one asked for.
pub fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().saturating_add(1)
}

/// Response to a read of a directory key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Listing {
    pub node: ListingNode,
}

/// The directory that was read. etcd omits `nodes` for an empty directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingNode {
    pub key: Option<String>,
    #[serde(default)]
    pub dir: bool,
    #[serde(default)]
    pub nodes: Vec<ListingEntry>,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub key: String,
    pub value: Option<String>,
    pub ttl: Option<i64>,
    pub expiration: Option<String>,
    pub modified_index: Option<u64>,
    pub created_index: Option<u64>,
}

impl Listing {
    /// Decode a listing from a response body.
    pub fn decode(data: &[u8]) -> CoordinationResult<Self> {
        serde_json::from_slice(data)
            .map_err(|e| CoordinationError::Decode(format!("malformed nodes listing: {e}")))
    }
}
