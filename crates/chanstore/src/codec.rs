//! Length-prefixed codec for parent-hash lists.
//!
//! A message's parents are persisted as a single blob column. The layout is
//! the plain concatenation of one record per hash, in list order:
//!
//! ```text
//! [len_0: u8] [bytes_0...]
//! [len_1: u8] [bytes_1...]
//! ...
//! ```
//!
//! There is no element count, separator, or terminator: end of blob is end
//! of list. An empty list encodes to an empty blob.

/// Longest hash the one-byte length prefix can describe.
pub const MAX_HASH_LEN: usize = u8::MAX as usize;

/// Errors returned by [`encode_hashes`] and [`decode_hashes`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A hash is too long for its length prefix.
    #[error("hash at index {index} is {len} bytes; maximum is {MAX_HASH_LEN}")]
    HashTooLong { index: usize, len: usize },

    /// A length prefix declares more bytes than the blob has left.
    #[error("truncated hash list: prefix at offset {offset} declares {declared} bytes, {remaining} remain")]
    Truncated {
        offset: usize,
        declared: usize,
        remaining: usize,
    },
}

/// Encode an ordered list of hashes into one blob.
///
/// # Errors
///
/// Returns [`CodecError::HashTooLong`] if any element exceeds
/// [`MAX_HASH_LEN`] bytes. Nothing is returned for a partially encoded list.
pub fn encode_hashes<H: AsRef<[u8]>>(hashes: &[H]) -> Result<Vec<u8>, CodecError> {
    let mut total = 0usize;
    for (index, hash) in hashes.iter().enumerate() {
        let len = hash.as_ref().len();
        if len > MAX_HASH_LEN {
            return Err(CodecError::HashTooLong { index, len });
        }
        total += 1 + len;
    }

    let mut buf = Vec::with_capacity(total);
    for hash in hashes {
        let bytes = hash.as_ref();
        // Length checked above.
        buf.push(u8::try_from(bytes.len()).unwrap_or(u8::MAX));
        buf.extend_from_slice(bytes);
    }
    Ok(buf)
}

/// Decode a blob produced by [`encode_hashes`].
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] if a length prefix runs past the end of
/// `data`. The decoder never reads outside `data`.
pub fn decode_hashes(data: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    let mut hashes = Vec::new();
    let mut pos = 0;

    while let Some(&prefix) = data.get(pos) {
        let declared = usize::from(prefix);
        let start = pos + 1;
        let remaining = data.len() - start;
        if declared > remaining {
            return Err(CodecError::Truncated {
                offset: pos,
                declared,
                remaining,
            });
        }
        hashes.push(data[start..start + declared].to_vec());
        pos = start + declared;
    }

    Ok(hashes)
}
