//! The [`Store`] handle and its lifecycle.
//!
//! One SQLite connection sits behind a mutex. Every operation holds the
//! mutex for its whole duration, so writers are serialized and a read always
//! observes every write that completed before it was issued. Inserts and
//! `clear` run inside a single transaction each.
//!
//! Operations are grouped by concern:
//! - [`messages`]: insert, lookup, count, offset reads
//! - [`leaves`]: leaf-set maintenance and queries
//! - [`pagination`]: cursor-based bidirectional range reads
//! - [`entities`]: namespaced blob storage

pub mod entities;
pub mod leaves;
pub mod messages;
pub mod pagination;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::StoreConfig;
use crate::db;
use crate::error::StoreError;
use crate::lock::StoreLock;
use crate::observe::{NoopObserver, QueryEvent, QueryKind, QueryObserver, TracingObserver};

const CLEAR_SQL: [&str; 4] = [
    "DELETE FROM messages",
    "DELETE FROM parent_references",
    "DELETE FROM leaves",
    "DELETE FROM entities",
];

/// Persistence and indexing engine for channel-partitioned message DAGs.
///
/// `Store` is `Send + Sync`; share it with `Arc<Store>` across threads or
/// move calls onto the blocking pool of an async runtime.
pub struct Store {
    conn: Mutex<Connection>,
    observer: Arc<dyn QueryObserver>,
    path: Option<PathBuf>,
    // Declared last so the connection closes before the file is unlocked.
    lock: Option<StoreLock>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("locked", &self.lock.is_some())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open a store as described by `config`.
    ///
    /// Installs [`TracingObserver`] when `config.trace` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Lock`] if another instance owns the file, or a
    /// storage error if the database cannot be opened or migrated.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let observer: Arc<dyn QueryObserver> = if config.trace {
            Arc::new(TracingObserver)
        } else {
            Arc::new(NoopObserver)
        };
        Self::open_with_observer(config, observer)
    }

    /// Open a private in-memory store with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot create the database.
    pub fn open_ephemeral() -> Result<Self, StoreError> {
        Self::open(&StoreConfig::ephemeral())
    }

    /// Open a store that reports every operation to `observer`.
    ///
    /// `config.trace` is ignored; the given observer is always used.
    ///
    /// # Errors
    ///
    /// Same as [`Store::open`].
    pub fn open_with_observer(
        config: &StoreConfig,
        observer: Arc<dyn QueryObserver>,
    ) -> Result<Self, StoreError> {
        let lock = match config.file.as_deref() {
            Some(path) => Some(StoreLock::acquire(
                &StoreLock::lock_path_for(path),
                config.lock_timeout(),
            )?),
            None => None,
        };

        let conn = db::open_connection(config)?;

        match config.file.as_deref() {
            Some(path) => tracing::info!(path = %path.display(), "opened message store"),
            None => tracing::debug!("opened ephemeral message store"),
        }

        Ok(Self {
            conn: Mutex::new(conn),
            observer,
            path: config.file.clone(),
            lock,
        })
    }

    /// Backing database file, or `None` for an ephemeral store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the store, flushing and releasing the database and file lock.
    ///
    /// Dropping a `Store` also releases everything; `close` additionally
    /// reports errors from the final SQLite close.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite fails to close the connection cleanly.
    pub fn close(self) -> Result<(), StoreError> {
        let Self {
            conn, path, lock, ..
        } = self;
        let conn = conn.into_inner().map_err(|_| StoreError::Poisoned)?;
        conn.close().map_err(|(_, err)| StoreError::Sqlite(err))?;
        if let Some(lock) = lock {
            lock.release();
        }

        if let Some(path) = path {
            tracing::info!(path = %path.display(), "closed message store");
        }
        Ok(())
    }

    /// Remove all messages, parent references, leaves and entities.
    ///
    /// Afterwards every channel has zero messages and an empty leaf set.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is removed then.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.run(
            QueryKind::Clear,
            None,
            |conn| {
                let tx = conn.transaction()?;
                let mut removed = 0;
                for sql in CLEAR_SQL {
                    removed += tx.execute(sql, [])?;
                }
                tx.commit()?;
                tracing::debug!(rows = removed, "cleared message store");
                Ok(removed)
            },
            |removed| *removed,
        )
        .map(|_| ())
    }

    /// Run `op` on the locked connection and report it to the observer.
    fn run<T>(
        &self,
        kind: QueryKind,
        channel: Option<&[u8]>,
        op: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
        rows: impl FnOnce(&T) -> usize,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let started = Instant::now();
        let result = op(&mut conn);
        let event = QueryEvent {
            kind,
            channel,
            rows: result.as_ref().map_or(0, rows),
            elapsed: started.elapsed(),
            failed: result.is_err(),
        };
        self.observer.on_query(&event);
        drop(conn);
        result
    }
}
