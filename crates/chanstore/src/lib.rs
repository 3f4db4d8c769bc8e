//! Persistence and indexing for channel-partitioned message DAGs.
//!
//! Each channel is an independent DAG of messages. The [`Store`] durably
//! keeps messages, maintains each channel's leaf set (DAG tips) as a side
//! effect of insertion, and serves offset and cursor-based range reads in
//! canonical `(height, hash)` order. A separate namespaced blob store holds
//! opaque higher-level entities.
//!
//! ```no_run
//! use chanstore::{Direction, Message, Store, StoreConfig};
//!
//! # fn main() -> Result<(), chanstore::StoreError> {
//! let store = Store::open(&StoreConfig::at_path("peer.sqlite3"))?;
//! store.add_message(&Message {
//!     channel_id: b"general".to_vec(),
//!     hash: b"root-hash".to_vec(),
//!     height: 0,
//!     parents: Vec::new(),
//!     content: b"hello".to_vec(),
//! })?;
//! let tips = store.get_leaf_hashes(b"general")?;
//! let page = store.query(b"general", None, Direction::Forward, 50)?;
//! # let _ = (tips, page);
//! # Ok(())
//! # }
//! ```
//!
//! # Conventions
//!
//! - **Errors**: library calls return [`StoreError`]; config loading uses
//!   `anyhow::Result`.
//! - **Logging**: `tracing` macros; per-query records go through
//!   [`observe::QueryObserver`].

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod lock;
pub mod message;
pub mod observe;
pub mod store;

pub use codec::{CodecError, MAX_HASH_LEN, decode_hashes, encode_hashes};
pub use config::{StoreConfig, load_store_config};
pub use error::{ErrorCode, StoreError};
pub use message::{Message, StoredMessage};
pub use observe::{QueryEvent, QueryKind, QueryObserver};
pub use store::Store;
pub use store::pagination::{Cursor, Direction, Page};
