//! Cursor-based, bidirectional range reads over a channel.
//!
//! Messages are ordered by the canonical key `(height ASC, hash ASC)`. Height
//! alone is not total because siblings share heights; the hash breaks ties.
//!
//! Boundaries:
//! - forward from hash `h`: keys `>= key(h)`, ascending
//! - backward from hash `h`: keys `< key(h)`, read descending and returned
//!   ascending
//! - forward from height `H`: heights `>= H`, ascending
//! - forward with no cursor: from the first message
//! - backward with no cursor: from the last message
//!
//! One row past `limit` is fetched to learn whether more data exists in the
//! travel direction. Because forward reads are inclusive of their anchor and
//! backward reads exclusive, a page's cursors chain without gaps or overlap:
//! `forward_cursor` is the first row of the next forward page and
//! `backward_cursor` is the first row of this page.

use rusqlite::{Connection, OptionalExtension, params};

use super::Store;
use super::messages::{RawMessageRow, clamp_to_sql, read_raw_row};
use crate::error::StoreError;
use crate::message::StoredMessage;
use crate::observe::QueryKind;

const FORWARD_FROM_KEY_SQL: &str = "
SELECT channel_id, hash, height, parents, content FROM messages
WHERE channel_id = ?1 AND (height, hash) >= (?2, ?3)
ORDER BY height ASC, hash ASC
LIMIT ?4";

const BACKWARD_BEFORE_KEY_SQL: &str = "
SELECT channel_id, hash, height, parents, content FROM messages
WHERE channel_id = ?1 AND (height, hash) < (?2, ?3)
ORDER BY height DESC, hash DESC
LIMIT ?4";

const FORWARD_FROM_HEIGHT_SQL: &str = "
SELECT channel_id, hash, height, parents, content FROM messages
WHERE channel_id = ?1 AND height >= ?2
ORDER BY height ASC, hash ASC
LIMIT ?3";

const BACKWARD_FROM_END_SQL: &str = "
SELECT channel_id, hash, height, parents, content FROM messages
WHERE channel_id = ?1
ORDER BY height DESC, hash DESC
LIMIT ?2";

/// Travel direction along the canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Resume point for a paginated read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// Boundary at a specific message.
    Hash(Vec<u8>),
    /// Start at the first message of at least this height. Forward only.
    Height(u64),
}

/// One window of a paginated read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Messages in ascending canonical order.
    pub messages: Vec<StoredMessage>,
    /// Pass as a hash cursor with [`Direction::Backward`] to read the
    /// messages before this window; backward reads exclude their anchor.
    /// Forward pages always set it to their first message's hash (or, when
    /// the window is empty, the next message's). Backward pages set it only
    /// when earlier messages remain.
    pub backward_cursor: Option<Vec<u8>>,
    /// Pass as a hash cursor with [`Direction::Forward`] to read the
    /// messages after this window. `None` when nothing follows it.
    pub forward_cursor: Option<Vec<u8>>,
}

impl Page {
    /// Cursor continuing in `direction`, if more data exists that way.
    #[must_use]
    pub fn next_cursor(&self, direction: Direction) -> Option<Cursor> {
        let hash = match direction {
            Direction::Forward => self.forward_cursor.as_ref(),
            Direction::Backward => self.backward_cursor.as_ref(),
        };
        hash.cloned().map(Cursor::Hash)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn anchor_height(conn: &Connection, channel: &[u8], hash: &[u8]) -> rusqlite::Result<Option<u64>> {
    conn.query_row(
        "SELECT height FROM messages WHERE channel_id = ?1 AND hash = ?2",
        [channel, hash],
        |row| row.get(0),
    )
    .optional()
}

fn fetch_rows(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<RawMessageRow>> {
    let mut stmt = conn.prepare_cached(sql)?;
    stmt.query_map(params, read_raw_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
}

fn decode_all(rows: Vec<RawMessageRow>) -> Result<Vec<StoredMessage>, StoreError> {
    rows.into_iter().map(RawMessageRow::decode).collect()
}

/// Trim an ascending forward read of up to `limit + 1` rows into a page.
fn forward_page(mut rows: Vec<RawMessageRow>, limit: usize) -> Result<Page, StoreError> {
    let forward_cursor = if rows.len() > limit {
        rows.truncate(limit + 1);
        rows.pop().map(|extra| extra.hash().to_vec())
    } else {
        None
    };
    let backward_cursor = rows
        .first()
        .map(|first| first.hash().to_vec())
        .or_else(|| forward_cursor.clone());

    Ok(Page {
        messages: decode_all(rows)?,
        backward_cursor,
        forward_cursor,
    })
}

/// Trim a descending backward read of up to `limit + 1` rows into a page.
fn backward_page(
    mut rows: Vec<RawMessageRow>,
    limit: usize,
    anchor: Option<&[u8]>,
) -> Result<Page, StoreError> {
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    let backward_cursor = if has_more {
        rows.last()
            .map(|earliest| earliest.hash().to_vec())
            .or_else(|| anchor.map(<[u8]>::to_vec))
    } else {
        None
    };
    rows.reverse();

    Ok(Page {
        messages: decode_all(rows)?,
        backward_cursor,
        forward_cursor: anchor.map(<[u8]>::to_vec),
    })
}

impl Store {
    /// Read one window of `channel` starting at `cursor` in `direction`.
    ///
    /// At most `limit` messages are returned; a negative `limit` behaves as
    /// zero. An anchor hash that is not stored in `channel` yields an empty
    /// page with no cursors.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedQuery`] for a backward read with a
    /// height cursor (checked before touching storage),
    /// [`StoreError::CorruptParents`] if a returned row fails to decode, or a
    /// storage error if the query fails.
    pub fn query(
        &self,
        channel: &[u8],
        cursor: Option<&Cursor>,
        direction: Direction,
        limit: i64,
    ) -> Result<Page, StoreError> {
        if direction == Direction::Backward && matches!(cursor, Some(Cursor::Height(_))) {
            return Err(StoreError::UnsupportedQuery(
                "backward pagination requires a hash cursor",
            ));
        }

        let limit = limit.max(0);
        let window = usize::try_from(limit).unwrap_or(usize::MAX - 1);
        let fetch = limit.saturating_add(1);

        self.run(
            QueryKind::Page,
            Some(channel),
            |conn| match (direction, cursor) {
                (Direction::Forward, None) => {
                    let rows = fetch_rows(conn, FORWARD_FROM_HEIGHT_SQL, params![channel, 0_i64, fetch])?;
                    forward_page(rows, window)
                }
                (Direction::Forward, Some(Cursor::Height(height))) => {
                    let rows = fetch_rows(
                        conn,
                        FORWARD_FROM_HEIGHT_SQL,
                        params![channel, clamp_to_sql(*height), fetch],
                    )?;
                    forward_page(rows, window)
                }
                (Direction::Forward, Some(Cursor::Hash(anchor))) => {
                    let Some(height) = anchor_height(conn, channel, anchor)? else {
                        tracing::debug!("forward page anchor not found in channel");
                        return Ok(Page::default());
                    };
                    let rows = fetch_rows(
                        conn,
                        FORWARD_FROM_KEY_SQL,
                        params![channel, height, anchor, fetch],
                    )?;
                    forward_page(rows, window)
                }
                (Direction::Backward, None) => {
                    let rows = fetch_rows(conn, BACKWARD_FROM_END_SQL, params![channel, fetch])?;
                    backward_page(rows, window, None)
                }
                (Direction::Backward, Some(Cursor::Hash(anchor))) => {
                    let Some(height) = anchor_height(conn, channel, anchor)? else {
                        tracing::debug!("backward page anchor not found in channel");
                        return Ok(Page::default());
                    };
                    let rows = fetch_rows(
                        conn,
                        BACKWARD_BEFORE_KEY_SQL,
                        params![channel, height, anchor, fetch],
                    )?;
                    backward_page(rows, window, Some(anchor.as_slice()))
                }
                (Direction::Backward, Some(Cursor::Height(_))) => Err(StoreError::UnsupportedQuery(
                    "backward pagination requires a hash cursor",
                )),
            },
            |page| page.messages.len(),
        )
    }
}
