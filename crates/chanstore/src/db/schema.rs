//! Canonical SQLite schema for the message store.
//!
//! - `messages` holds every message row keyed by its global hash
//! - `parent_references` records which messages cite which parents
//! - `leaves` materializes the current DAG tips of each channel
//! - `entities` is an independent namespaced blob store
//! - `store_meta` tracks the applied schema version

/// Migration v1: messages, parent references, leaf set, entities.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS messages (
    channel_id BLOB NOT NULL,
    hash BLOB PRIMARY KEY,
    height INTEGER NOT NULL CHECK (height >= 0),
    parents BLOB NOT NULL,
    content BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_order
    ON messages(channel_id, height, hash);

CREATE TABLE IF NOT EXISTS parent_references (
    channel_id BLOB NOT NULL,
    parent_hash BLOB NOT NULL,
    child_hash BLOB NOT NULL,
    PRIMARY KEY (channel_id, parent_hash, child_hash)
);

CREATE INDEX IF NOT EXISTS idx_parent_references_channel
    ON parent_references(channel_id);

CREATE INDEX IF NOT EXISTS idx_parent_references_child
    ON parent_references(child_hash);

CREATE TABLE IF NOT EXISTS leaves (
    channel_id BLOB NOT NULL,
    hash BLOB NOT NULL,
    PRIMARY KEY (channel_id, hash)
);

CREATE TABLE IF NOT EXISTS entities (
    prefix TEXT NOT NULL,
    id TEXT NOT NULL,
    blob BLOB NOT NULL,
    PRIMARY KEY (prefix, id)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Indexes expected by ordered reads and leaf maintenance.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_messages_channel_order",
    "idx_parent_references_channel",
    "idx_parent_references_child",
];
