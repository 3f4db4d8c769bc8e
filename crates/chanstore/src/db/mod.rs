//! SQLite connection setup for the message store.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` for file-backed stores so readers never block on
//!   the writer's journal
//! - `synchronous = NORMAL`, which is durable under WAL
//! - `busy_timeout` taken from [`StoreConfig`]

pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

use crate::config::StoreConfig;

/// Open (or create) the backing database, apply pragmas, register the
/// `rarray()` table function and migrate the schema to the latest version.
///
/// With no file configured, a private in-memory database is opened.
///
/// # Errors
///
/// Returns an error if opening, configuring, or migrating the database fails.
pub fn open_connection(config: &StoreConfig) -> Result<Connection, crate::StoreError> {
    let mut conn = match config.file.as_deref() {
        Some(path) => open_file(path)?,
        None => Connection::open_in_memory()?,
    };

    configure_connection(&conn, config, config.file.is_some())?;
    rusqlite::vtab::array::load_module(&conn)?;
    let version = migrations::migrate(&mut conn)?;
    tracing::debug!(schema_version = version, "store schema ready");

    Ok(conn)
}

fn open_file(path: &Path) -> Result<Connection, crate::StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Connection::open(path)?)
}

fn configure_connection(
    conn: &Connection,
    config: &StoreConfig,
    file_backed: bool,
) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    if file_backed {
        let _journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    }
    conn.busy_timeout(config.busy_timeout())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::open_connection;
    use crate::config::StoreConfig;
    use crate::db::migrations;

    #[test]
    fn file_store_sets_wal_and_busy_timeout() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = StoreConfig::at_path(dir.path().join("nested/store.sqlite3"));
        let conn = open_connection(&config).expect("open store db");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(busy_timeout_ms, config.busy_timeout_ms);
    }

    #[test]
    fn ephemeral_store_runs_migrations() {
        let conn = open_connection(&StoreConfig::ephemeral()).expect("open store db");
        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn rarray_is_available() {
        use rusqlite::types::Value;
        use std::rc::Rc;

        let conn = open_connection(&StoreConfig::ephemeral()).expect("open store db");
        let values = Rc::new(vec![Value::from(1_i64), Value::from(2_i64)]);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM rarray(?1)", [values], |row| row.get(0))
            .expect("rarray query");
        assert_eq!(count, 2);
    }
}
