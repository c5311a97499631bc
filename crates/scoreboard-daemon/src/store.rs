//! Key-value storage for scores.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Persistent score storage keyed by `sb{sbid}_p{pid}`.
pub trait ScoreStore: Send + Sync {
    /// Returns the stored score, if any.
    fn get(&self, key: &str) -> Option<i64>;

    /// Stores a score.
    fn set(&self, key: &str, value: i64) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scores kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn get(&self, key: &str) -> Option<i64> {
        lock(&self.values).get(key).copied()
    }

    fn set(&self, key: &str, value: i64) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }
}

/// Scores persisted as a TOML table in the state directory.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, i64>>,
}

impl FileStore {
    /// File name inside the state directory.
    pub const FILE_NAME: &'static str = "scores.toml";

    /// Opens the store, starting empty if the file is missing or unreadable.
    pub fn open<P: AsRef<Path>>(state_dir: P) -> Result<Self> {
        let state_dir = state_dir.as_ref();
        std::fs::create_dir_all(state_dir)
            .with_context(|| format!("Failed to create state directory {:?}", state_dir))?;

        let path = state_dir.join(Self::FILE_NAME);
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable scores in {:?}: {}", path, e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        debug!("Loaded {} stored scores from {:?}", values.len(), path);

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for FileStore {
    fn get(&self, key: &str) -> Option<i64> {
        lock(&self.values).get(key).copied()
    }

    fn set(&self, key: &str, value: i64) -> Result<()> {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), value);
        let content = toml::to_string_pretty(&*values).context("Failed to serialize scores")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        Ok(())
    }
}
