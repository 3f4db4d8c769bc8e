use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options recognised by [`Store::open`](crate::Store::open).
///
/// ```toml
/// file = "/var/lib/peer/messages.sqlite3"
/// trace = true
/// busy_timeout_ms = 5000
/// lock_timeout_ms = 0
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file to persist to. `None` opens a private in-memory store.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Emit one diagnostic record per executed operation.
    #[serde(default)]
    pub trace: bool,
    /// How long SQLite waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// How long `open` waits for another instance to release the file.
    #[serde(default)]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file: None,
            trace: false,
            busy_timeout_ms: default_busy_timeout_ms(),
            lock_timeout_ms: 0,
        }
    }
}

impl StoreConfig {
    /// Configuration for a private, non-persistent store.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Configuration for a store persisted at `path`.
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    /// Enable or disable per-operation trace records.
    #[must_use]
    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Set how long `open` waits for a competing instance to release the file.
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = saturating_millis(timeout);
        self
    }

    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Load a [`StoreConfig`] from a TOML file.
///
/// A missing file yields the default (ephemeral) configuration.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_store_config(path: &Path) -> Result<StoreConfig> {
    if !path.exists() {
        return Ok(StoreConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<StoreConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

const fn saturating_millis(duration: Duration) -> u64 {
    let millis = duration.as_millis();
    if millis > u64::MAX as u128 {
        u64::MAX
    } else {
        millis as u64
    }
}
