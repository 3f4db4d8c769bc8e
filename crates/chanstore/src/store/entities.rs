//! Namespaced blob storage for higher-level objects.
//!
//! Entities are opaque `(prefix, id) -> blob` pairs with last-write-wins
//! overwrite and no DAG semantics. The prefix isolates namespaces such as
//! identity records and channel lists.

use rusqlite::{OptionalExtension, params};

use super::Store;
use crate::error::StoreError;
use crate::observe::QueryKind;

impl Store {
    /// Store `blob` under `(prefix, id)`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn store_entity(&self, prefix: &str, id: &str, blob: &[u8]) -> Result<(), StoreError> {
        self.run(
            QueryKind::StoreEntity,
            None,
            |conn| {
                conn.execute(
                    "INSERT INTO entities (prefix, id, blob) VALUES (?1, ?2, ?3)
                     ON CONFLICT (prefix, id) DO UPDATE SET blob = excluded.blob",
                    params![prefix, id, blob],
                )?;
                Ok(())
            },
            |_| 1,
        )
    }

    /// Blob stored under `(prefix, id)`, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn retrieve_entity(&self, prefix: &str, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.run(
            QueryKind::RetrieveEntity,
            None,
            |conn| {
                let blob = conn
                    .query_row(
                        "SELECT blob FROM entities WHERE prefix = ?1 AND id = ?2",
                        [prefix, id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(blob)
            },
            |blob| usize::from(blob.is_some()),
        )
    }

    /// Remove `(prefix, id)`. Removing an absent entity is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove_entity(&self, prefix: &str, id: &str) -> Result<(), StoreError> {
        self.run(
            QueryKind::RemoveEntity,
            None,
            |conn| {
                Ok(conn.execute(
                    "DELETE FROM entities WHERE prefix = ?1 AND id = ?2",
                    [prefix, id],
                )?)
            },
            |removed| *removed,
        )
        .map(|_| ())
    }

    /// Ids stored under `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_entity_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.run(
            QueryKind::EntityKeys,
            None,
            |conn| {
                let mut stmt =
                    conn.prepare_cached("SELECT id FROM entities WHERE prefix = ?1 ORDER BY id")?;
                let ids = stmt
                    .query_map([prefix], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(ids)
            },
            Vec::len,
        )
    }
}
