//! Message insert, lookup, count and offset reads.
//!
//! Every read filters by `channel_id`; a hash stored in one channel is
//! invisible through another.

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::rc::Rc;

use super::{Store, leaves};
use crate::codec;
use crate::error::StoreError;
use crate::message::{Message, StoredMessage};
use crate::observe::QueryKind;

/// A message row before its parent list is decoded.
pub(crate) struct RawMessageRow {
    channel_id: Vec<u8>,
    hash: Vec<u8>,
    height: u64,
    parents: Vec<u8>,
    content: Vec<u8>,
}

impl RawMessageRow {
    pub(crate) fn hash(&self) -> &[u8] {
        &self.hash
    }

    /// Decode the parent list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptParents`] if the stored blob is malformed.
    pub(crate) fn decode(self) -> Result<StoredMessage, StoreError> {
        let parents = match codec::decode_hashes(&self.parents) {
            Ok(parents) => parents,
            Err(source) => {
                tracing::warn!(
                    hash = %crate::error::hex(&self.hash),
                    error = %source,
                    "stored parent list failed to decode"
                );
                return Err(StoreError::CorruptParents {
                    hash: self.hash,
                    source,
                });
            }
        };
        Ok(Message {
            channel_id: self.channel_id,
            hash: self.hash,
            height: self.height,
            parents,
            content: self.content,
        })
    }
}

/// Map a row selecting `channel_id, hash, height, parents, content`.
pub(crate) fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawMessageRow> {
    Ok(RawMessageRow {
        channel_id: row.get(0)?,
        hash: row.get(1)?,
        height: row.get(2)?,
        parents: row.get(3)?,
        content: row.get(4)?,
    })
}

fn insert_message(conn: &mut Connection, message: &Message, parents: &[u8]) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    leaves::detach(&tx, &message.hash)?;
    tx.execute(
        "INSERT OR REPLACE INTO messages (channel_id, hash, height, parents, content)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            message.channel_id,
            message.hash,
            message.height,
            parents,
            message.content
        ],
    )?;
    leaves::attach(&tx, message)?;
    tx.commit()
}

pub(crate) fn clamp_to_sql(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl Store {
    /// Insert `message`, or replace the stored message with the same hash.
    ///
    /// The row and its leaf-index effects commit together or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] before any write if a parent hash is
    /// longer than 255 bytes, [`StoreError::HeightOutOfRange`] if the height
    /// exceeds `i64::MAX`, or a storage error if the transaction fails.
    pub fn add_message(&self, message: &Message) -> Result<(), StoreError> {
        if i64::try_from(message.height).is_err() {
            return Err(StoreError::HeightOutOfRange(message.height));
        }
        let parents = codec::encode_hashes(&message.parents)?;
        self.run(
            QueryKind::AddMessage,
            Some(message.channel_id.as_slice()),
            |conn| Ok(insert_message(conn, message, &parents)?),
            |_| 1,
        )
    }

    /// Number of messages stored in `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn message_count(&self, channel: &[u8]) -> Result<u64, StoreError> {
        self.run(
            QueryKind::MessageCount,
            Some(channel),
            |conn| {
                let count: u64 = conn.query_row(
                    "SELECT COUNT(*) FROM messages WHERE channel_id = ?1",
                    [channel],
                    |row| row.get(0),
                )?;
                Ok(count)
            },
            |_| 1,
        )
    }

    /// Whether `channel` contains a message with `hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn has_message(&self, channel: &[u8], hash: &[u8]) -> Result<bool, StoreError> {
        self.run(
            QueryKind::HasMessage,
            Some(channel),
            |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM messages WHERE channel_id = ?1 AND hash = ?2)",
                    [channel, hash],
                    |row| row.get(0),
                )?;
                Ok(exists)
            },
            |_| 1,
        )
    }

    /// Content of the message with `hash` in `channel`, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails. A missing message is not an error.
    pub fn get_message(&self, channel: &[u8], hash: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.run(
            QueryKind::GetMessage,
            Some(channel),
            |conn| {
                let content = conn
                    .query_row(
                        "SELECT content FROM messages WHERE channel_id = ?1 AND hash = ?2",
                        [channel, hash],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(content)
            },
            |content| usize::from(content.is_some()),
        )
    }

    /// Full stored row (height, decoded parents, content) for `hash`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptParents`] if the stored parent list does
    /// not decode, or a storage error if the query fails.
    pub fn get_message_record(
        &self,
        channel: &[u8],
        hash: &[u8],
    ) -> Result<Option<StoredMessage>, StoreError> {
        self.run(
            QueryKind::GetMessage,
            Some(channel),
            |conn| {
                let raw = conn
                    .query_row(
                        "SELECT channel_id, hash, height, parents, content FROM messages
                         WHERE channel_id = ?1 AND hash = ?2",
                        [channel, hash],
                        read_raw_row,
                    )
                    .optional()?;
                raw.map(RawMessageRow::decode).transpose()
            },
            |record| usize::from(record.is_some()),
        )
    }

    /// Content of every message in `channel` whose hash is in `hashes`.
    ///
    /// Result order is unspecified and missing hashes are omitted, so the
    /// result may be shorter than `hashes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_messages<H: AsRef<[u8]>>(
        &self,
        channel: &[u8],
        hashes: &[H],
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        self.run(
            QueryKind::GetMessages,
            Some(channel),
            |conn| {
                if hashes.is_empty() {
                    return Ok(Vec::new());
                }
                let wanted: Rc<Vec<Value>> = Rc::new(
                    hashes
                        .iter()
                        .map(|h| Value::Blob(h.as_ref().to_vec()))
                        .collect(),
                );
                let mut stmt = conn.prepare_cached(
                    "SELECT content FROM messages
                     WHERE channel_id = ?1 AND hash IN rarray(?2)",
                )?;
                let contents = stmt
                    .query_map(params![channel, wanted], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                Ok(contents)
            },
            Vec::len,
        )
    }

    /// Content of messages `[offset, offset + limit)` of `channel` in
    /// canonical `(height, hash)` order.
    ///
    /// An offset at or past the message count yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_messages_at_offset(
        &self,
        channel: &[u8],
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        self.run(
            QueryKind::MessagesAtOffset,
            Some(channel),
            |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT content FROM messages
                     WHERE channel_id = ?1
                     ORDER BY height, hash
                     LIMIT ?2 OFFSET ?3",
                )?;
                let contents = stmt
                    .query_map(
                        params![channel, clamp_to_sql(limit), clamp_to_sql(offset)],
                        |row| row.get(0),
                    )?
                    .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                Ok(contents)
            },
            Vec::len,
        )
    }

    /// Content of the message at `offset` in canonical order, or `None` when
    /// the offset is past the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn message_at_offset(
        &self,
        channel: &[u8],
        offset: u64,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .get_messages_at_offset(channel, offset, 1)?
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{ErrorCode, StoreError};
    use crate::message::Message;
    use crate::store::Store;

    fn msg(channel: &[u8], hash: &[u8], height: u64, parents: &[&[u8]]) -> Message {
        Message {
            channel_id: channel.to_vec(),
            hash: hash.to_vec(),
            height,
            parents: parents.iter().map(|p| p.to_vec()).collect(),
            content: [b"body-".as_slice(), hash].concat(),
        }
    }

    #[test]
    fn read_after_write() {
        let store = Store::open_ephemeral().unwrap();
        let m = msg(b"c", b"h1", 0, &[]);
        store.add_message(&m).unwrap();

        assert!(store.has_message(b"c", b"h1").unwrap());
        assert_eq!(store.get_message(b"c", b"h1").unwrap(), Some(m.content.clone()));
        assert_eq!(store.message_count(b"c").unwrap(), 1);
    }

    #[test]
    fn height_beyond_sqlite_range_is_rejected_before_write() {
        let store = Store::open_ephemeral().unwrap();
        let err = store
            .add_message(&msg(b"c", b"tall", u64::MAX, &[]))
            .unwrap_err();
        assert!(matches!(err, StoreError::HeightOutOfRange(u64::MAX)));
        assert_eq!(err.code(), ErrorCode::HeightOutOfRange);
        assert!(!store.has_message(b"c", b"tall").unwrap());

        let max = i64::MAX.unsigned_abs();
        store.add_message(&msg(b"c", b"tallest", max, &[])).unwrap();
        let record = store.get_message_record(b"c", b"tallest").unwrap().unwrap();
        assert_eq!(record.height, max);
    }

    #[test]
    fn missing_message_is_absent_not_error() {
        let store = Store::open_ephemeral().unwrap();
        assert!(!store.has_message(b"c", b"nope").unwrap());
        assert_eq!(store.get_message(b"c", b"nope").unwrap(), None);
        assert_eq!(store.get_message_record(b"c", b"nope").unwrap(), None);
    }

    #[test]
    fn channels_do_not_leak() {
        let store = Store::open_ephemeral().unwrap();
        store.add_message(&msg(b"one", b"h", 0, &[])).unwrap();

        assert!(!store.has_message(b"two", b"h").unwrap());
        assert_eq!(store.get_message(b"two", b"h").unwrap(), None);
        assert_eq!(store.message_count(b"two").unwrap(), 0);
        assert!(store.get_messages(b"two", &[b"h"]).unwrap().is_empty());
    }

    #[test]
    fn upsert_replaces_all_fields() {
        let store = Store::open_ephemeral().unwrap();
        store.add_message(&msg(b"c", b"h", 0, &[])).unwrap();
        let mut replacement = msg(b"c", b"h", 4, &[b"p"]);
        replacement.content = b"second".to_vec();
        store.add_message(&replacement).unwrap();

        assert_eq!(store.message_count(b"c").unwrap(), 1);
        assert_eq!(
            store.get_message_record(b"c", b"h").unwrap(),
            Some(replacement)
        );
    }

    #[test]
    fn record_round_trips_parents() {
        let store = Store::open_ephemeral().unwrap();
        let m = msg(b"c", b"child", 1, &[b"p1", b"p0", b""]);
        store.add_message(&m).unwrap();
        assert_eq!(store.get_message_record(b"c", b"child").unwrap(), Some(m));
    }

    #[test]
    fn oversized_parent_aborts_before_write() {
        let store = Store::open_ephemeral().unwrap();
        let long = vec![7_u8; 256];
        let m = msg(b"c", b"h", 1, &[long.as_slice()]);

        let err = store.add_message(&m).unwrap_err();
        assert!(matches!(err, StoreError::Encode(_)));
        assert_eq!(err.code(), ErrorCode::HashTooLong);
        assert_eq!(store.message_count(b"c").unwrap(), 0);
        assert!(store.get_leaf_hashes(b"c").unwrap().is_empty());
    }

    #[test]
    fn corrupt_parent_blob_surfaces_as_retrieval_error() {
        let store = Store::open_ephemeral().unwrap();
        store.add_message(&msg(b"c", b"h", 0, &[])).unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "UPDATE messages SET parents = x'05aa' WHERE hash = x'68'",
                [],
            )
            .unwrap();
        }

        let err = store.get_message_record(b"c", b"h").unwrap_err();
        assert!(matches!(err, StoreError::CorruptParents { ref hash, .. } if hash == b"h"));
        // Content reads do not touch the parent list.
        assert!(store.get_message(b"c", b"h").unwrap().is_some());
    }

    #[test]
    fn batch_fetch_omits_missing_hashes() {
        let store = Store::open_ephemeral().unwrap();
        for h in [b"a", b"b", b"c"] {
            store.add_message(&msg(b"ch", h, 0, &[])).unwrap();
        }

        let mut got = store
            .get_messages(b"ch", &[b"c".as_slice(), b"zz", b"a"])
            .unwrap();
        got.sort();
        assert_eq!(got, vec![b"body-a".to_vec(), b"body-c".to_vec()]);

        let none: &[&[u8]] = &[];
        assert!(store.get_messages(b"ch", none).unwrap().is_empty());
    }

    #[test]
    fn offset_reads_follow_canonical_order() {
        let store = Store::open_ephemeral().unwrap();
        store.add_message(&msg(b"c", b"z", 0, &[])).unwrap();
        store.add_message(&msg(b"c", b"b", 1, &[b"z"])).unwrap();
        store.add_message(&msg(b"c", b"a", 1, &[b"z"])).unwrap();
        store.add_message(&msg(b"c", b"m", 2, &[b"a", b"b"])).unwrap();

        let all = store.get_messages_at_offset(b"c", 0, 10).unwrap();
        assert_eq!(
            all,
            vec![
                b"body-z".to_vec(),
                b"body-a".to_vec(),
                b"body-b".to_vec(),
                b"body-m".to_vec()
            ]
        );
        assert_eq!(
            store.get_messages_at_offset(b"c", 1, 2).unwrap(),
            vec![b"body-a".to_vec(), b"body-b".to_vec()]
        );
        assert!(store.get_messages_at_offset(b"c", 4, 1).unwrap().is_empty());
        assert_eq!(store.message_at_offset(b"c", 3).unwrap(), Some(b"body-m".to_vec()));
        assert_eq!(store.message_at_offset(b"c", 4).unwrap(), None);
        assert!(store.get_messages_at_offset(b"c", 0, 0).unwrap().is_empty());
    }
}
