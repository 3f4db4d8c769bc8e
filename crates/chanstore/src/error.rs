use std::fmt;

use crate::codec::CodecError;
use crate::lock::LockError;

/// Machine-readable error codes for callers that branch on failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    HashTooLong,
    HeightOutOfRange,
    CorruptParentList,
    UnsupportedQuery,
    StorageFailure,
    LockContention,
    IoFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::HashTooLong => "E1001",
            Self::HeightOutOfRange => "E1002",
            Self::CorruptParentList => "E2001",
            Self::UnsupportedQuery => "E3001",
            Self::StorageFailure => "E5001",
            Self::LockContention => "E5002",
            Self::IoFailure => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::HashTooLong => "Hash exceeds 255 bytes",
            Self::HeightOutOfRange => "Message height exceeds the storable range",
            Self::CorruptParentList => "Stored parent list is corrupt",
            Self::UnsupportedQuery => "Unsupported query",
            Self::StorageFailure => "Storage operation failed",
            Self::LockContention => "Store file is locked",
            Self::IoFailure => "I/O failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::HashTooLong => Some("Use a hash function whose digest fits in 255 bytes."),
            Self::HeightOutOfRange => Some("Heights are stored as signed 64-bit integers."),
            Self::CorruptParentList => {
                Some("The database file was modified externally; restore it from a peer.")
            }
            Self::UnsupportedQuery => {
                Some("Backward pagination needs a hash cursor, not a height cursor.")
            }
            Self::StorageFailure => Some("Check disk space and database file permissions."),
            Self::LockContention => {
                Some("Close the other store instance that has this file open.")
            }
            Self::IoFailure => Some("Check that the store directory exists and is writable."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors returned by [`Store`](crate::Store) operations.
///
/// Missing rows are not errors; lookups return `Option` or a shorter `Vec`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A parent hash could not be encoded; nothing was written.
    #[error("cannot encode parent list: {0}")]
    Encode(#[from] CodecError),

    /// The message height does not fit SQLite's signed 64-bit integer.
    #[error("message height {0} exceeds {max}", max = i64::MAX)]
    HeightOutOfRange(u64),

    /// A stored parent list failed to decode.
    #[error("corrupt parent list for message {}: {source}", hex(.hash))]
    CorruptParents {
        hash: Vec<u8>,
        #[source]
        source: CodecError,
    },

    /// The query shape is not supported (checked before touching storage).
    #[error("unsupported query: {0}")]
    UnsupportedQuery(&'static str),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the connection.
    #[error("store connection mutex poisoned")]
    Poisoned,
}

impl StoreError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Encode(_) => ErrorCode::HashTooLong,
            Self::HeightOutOfRange(_) => ErrorCode::HeightOutOfRange,
            Self::CorruptParents { .. } => ErrorCode::CorruptParentList,
            Self::UnsupportedQuery(_) => ErrorCode::UnsupportedQuery,
            Self::Sqlite(_) => ErrorCode::StorageFailure,
            Self::Lock(err) => err.code(),
            Self::Io(_) => ErrorCode::IoFailure,
            Self::Poisoned => ErrorCode::InternalUnexpected,
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Lowercase hex rendering used in error and log messages.
pub(crate) fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
