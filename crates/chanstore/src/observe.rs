//! Per-operation observability hook.
//!
//! The store reports every executed operation to a [`QueryObserver`]. With
//! `trace = true` in [`StoreConfig`](crate::StoreConfig) the store installs
//! [`TracingObserver`]; otherwise [`NoopObserver`] unless the caller injects
//! its own through [`Store::open_with_observer`](crate::Store::open_with_observer).

use std::fmt;
use std::time::Duration;

use crate::error::hex;

/// Which store operation produced a [`QueryEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    AddMessage,
    MessageCount,
    HasMessage,
    GetMessage,
    GetMessages,
    MessagesAtOffset,
    LeafHashes,
    Leaves,
    Page,
    StoreEntity,
    RetrieveEntity,
    RemoveEntity,
    EntityKeys,
    Clear,
}

impl QueryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddMessage => "add_message",
            Self::MessageCount => "message_count",
            Self::HasMessage => "has_message",
            Self::GetMessage => "get_message",
            Self::GetMessages => "get_messages",
            Self::MessagesAtOffset => "messages_at_offset",
            Self::LeafHashes => "leaf_hashes",
            Self::Leaves => "leaves",
            Self::Page => "page",
            Self::StoreEntity => "store_entity",
            Self::RetrieveEntity => "retrieve_entity",
            Self::RemoveEntity => "remove_entity",
            Self::EntityKeys => "entity_keys",
            Self::Clear => "clear",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed store operation.
#[derive(Debug, Clone)]
pub struct QueryEvent<'a> {
    pub kind: QueryKind,
    /// Channel the operation was scoped to, if any.
    pub channel: Option<&'a [u8]>,
    /// Rows returned (reads) or messages/entities written (writes).
    pub rows: usize,
    pub elapsed: Duration,
    /// Whether the operation returned an error.
    pub failed: bool,
}

/// Receives one callback per executed store operation.
///
/// Called while the store's connection lock is held; implementations should
/// return quickly and must not call back into the store.
pub trait QueryObserver: Send + Sync {
    fn on_query(&self, event: &QueryEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl QueryObserver for NoopObserver {
    fn on_query(&self, _event: &QueryEvent<'_>) {}
}

/// Emits a `tracing` debug record per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl QueryObserver for TracingObserver {
    fn on_query(&self, event: &QueryEvent<'_>) {
        let channel = event.channel.map(hex);
        tracing::debug!(
            target: "chanstore::query",
            op = %event.kind,
            channel = channel.as_deref().unwrap_or("-"),
            rows = event.rows,
            elapsed_us = u64::try_from(event.elapsed.as_micros()).unwrap_or(u64::MAX),
            failed = event.failed,
            "store query"
        );
    }
}

impl<F> QueryObserver for F
where
    F: Fn(&QueryEvent<'_>) + Send + Sync,
{
    fn on_query(&self, event: &QueryEvent<'_>) {
        self(event);
    }
}
