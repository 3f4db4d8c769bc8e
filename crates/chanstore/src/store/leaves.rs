//! Leaf-set maintenance and queries.
//!
//! A hash is a leaf of its channel iff no message in that channel lists it as
//! a parent. Two relations carry this:
//!
//! - `parent_references` records every `(channel, parent, child)` citation
//!   and is the authority on whether a hash has been cited.
//! - `leaves` materializes the current tips so that reading them costs the
//!   size of the leaf set, not the size of the channel.
//!
//! [`attach`] and [`detach`] run inside the insert transaction, so both
//! relations always move together with the `messages` row. A child that
//! arrives before its parent is handled: the parent is never made a leaf
//! because its citation is already recorded.

use rusqlite::{Connection, OptionalExtension, params};

use super::Store;
use crate::error::StoreError;
use crate::message::Message;
use crate::observe::QueryKind;

/// Undo the leaf-index effects of a previously stored message with `hash`.
///
/// Used before an upsert replaces an existing row: its citations are dropped
/// and any former parent that is no longer cited becomes a leaf again,
/// provided it exists as a message in that channel.
pub(crate) fn detach(conn: &Connection, hash: &[u8]) -> rusqlite::Result<()> {
    let previous_channel: Option<Vec<u8>> = conn
        .query_row(
            "SELECT channel_id FROM messages WHERE hash = ?1",
            [hash],
            |row| row.get(0),
        )
        .optional()?;
    let Some(channel) = previous_channel else {
        return Ok(());
    };

    conn.execute(
        "DELETE FROM leaves WHERE channel_id = ?1 AND hash = ?2",
        params![channel, hash],
    )?;

    let former_parents = {
        let mut stmt = conn.prepare(
            "SELECT parent_hash FROM parent_references
             WHERE channel_id = ?1 AND child_hash = ?2",
        )?;
        stmt.query_map(params![channel, hash], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };

    conn.execute(
        "DELETE FROM parent_references WHERE channel_id = ?1 AND child_hash = ?2",
        params![channel, hash],
    )?;

    for parent in &former_parents {
        conn.execute(
            "INSERT OR IGNORE INTO leaves (channel_id, hash)
             SELECT ?1, ?2
             WHERE EXISTS (SELECT 1 FROM messages WHERE channel_id = ?1 AND hash = ?2)
               AND NOT EXISTS (
                   SELECT 1 FROM parent_references WHERE channel_id = ?1 AND parent_hash = ?2
               )",
            params![channel, parent],
        )?;
    }

    tracing::trace!(restored = former_parents.len(), "detached replaced message");
    Ok(())
}

/// Record `message`'s citations and update the leaf set for its insertion.
///
/// Every parent stops being a leaf; the message itself becomes one unless it
/// is already cited by a stored message of the same channel.
pub(crate) fn attach(conn: &Connection, message: &Message) -> rusqlite::Result<()> {
    let channel = message.channel_id.as_slice();
    let hash = message.hash.as_slice();

    {
        let mut cite = conn.prepare_cached(
            "INSERT OR IGNORE INTO parent_references (channel_id, parent_hash, child_hash)
             VALUES (?1, ?2, ?3)",
        )?;
        let mut unleaf =
            conn.prepare_cached("DELETE FROM leaves WHERE channel_id = ?1 AND hash = ?2")?;
        for parent in &message.parents {
            cite.execute(params![channel, parent, hash])?;
            unleaf.execute(params![channel, parent])?;
        }
    }

    conn.execute(
        "INSERT OR IGNORE INTO leaves (channel_id, hash)
         SELECT ?1, ?2
         WHERE NOT EXISTS (
             SELECT 1 FROM parent_references WHERE channel_id = ?1 AND parent_hash = ?2
         )",
        params![channel, hash],
    )?;
    Ok(())
}

impl Store {
    /// Hashes of the current DAG tips of `channel`, sorted by hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_leaf_hashes(&self, channel: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        self.run(
            QueryKind::LeafHashes,
            Some(channel),
            |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT hash FROM leaves WHERE channel_id = ?1 ORDER BY hash",
                )?;
                let hashes = stmt
                    .query_map([channel], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                Ok(hashes)
            },
            Vec::len,
        )
    }

    /// Content of the current DAG tips of `channel`, in canonical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_leaves(&self, channel: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        self.run(
            QueryKind::Leaves,
            Some(channel),
            |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT m.content
                     FROM leaves l
                     INNER JOIN messages m ON m.hash = l.hash AND m.channel_id = l.channel_id
                     WHERE l.channel_id = ?1
                     ORDER BY m.height, m.hash",
                )?;
                let contents = stmt
                    .query_map([channel], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                Ok(contents)
            },
            Vec::len,
        )
    }
}
