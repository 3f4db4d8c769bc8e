//! Message types accepted and returned by the store.
//!
//! Messages are built upstream: the caller computes the content-addressed
//! `hash`, assigns `height` (one more than the tallest parent) and picks
//! `parents`. The store treats all of these as opaque and does not verify
//! them.

/// A message ready to be inserted into a channel's DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// DAG partition this message belongs to.
    pub channel_id: Vec<u8>,
    /// Content-addressed identifier, unique across the whole store.
    pub hash: Vec<u8>,
    /// Position in the DAG; `0` for roots. At most `i64::MAX`.
    pub height: u64,
    /// Hashes of direct parents, each at most 255 bytes. Empty for a root.
    pub parents: Vec<Vec<u8>>,
    /// Application payload.
    pub content: Vec<u8>,
}

impl Message {
    /// Canonical order key used by offset and cursor reads.
    #[must_use]
    pub fn order_key(&self) -> (u64, &[u8]) {
        (self.height, &self.hash)
    }
}

/// A message row read back from storage.
///
/// Identical in shape to [`Message`]; kept as a distinct name so signatures
/// say which direction data flows.
pub type StoredMessage = Message;
