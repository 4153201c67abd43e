use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};

use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::error::StoreError;

/// Asynchronous key-value persistence the notes are kept in.
///
/// `set` replaces the whole value stored under `key`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

fn check_quota<'a>(
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
    quota: Option<usize>,
) -> Result<(), StoreError> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let mut needed = 0;
    for (key, value) in entries {
        needed += key.len() + serde_json::to_vec(value)?.len();
    }

    if needed > quota {
        return Err(StoreError::QuotaExceeded { needed, quota });
    }

    Ok(())
}

/////////////////////////////////////////////////////////////////////

#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    quota_bytes: Option<usize>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Makes every following call fail with `StoreError::Unavailable`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is closed".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.ensure_open()?;

        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.ensure_open()?;

        let mut values = self.values.write().await;
        let key = key.to_string();

        check_quota(
            values
                .iter()
                .filter(|(k, _)| **k != key)
                .chain(std::iter::once((&key, &value))),
            self.quota_bytes,
        )?;

        values.insert(key, value);

        Ok(())
    }
}

/////////////////////////////////////////////////////////////////////

/// Keeps every key in one JSON object on disk.
///
/// Writes go to a sibling temporary file first and are moved into place
/// with a rename, so a crash never leaves a half-written store behind.
pub struct JsonFileStore {
    path: PathBuf,
    quota_bytes: Option<usize>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, quota_bytes: Option<usize>) -> Self {
        Self {
            path: path.into(),
            quota_bytes,
            write_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    async fn write_all(&self, values: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        replace_file(&self.path, &serde_json::to_vec_pretty(values)?).await?;

        Ok(())
    }
}

/// Writes `bytes` to `<path>.tmp` and renames it over `path`. The
/// temporary file is removed again when either step fails.
async fn replace_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = match tokio::fs::write(&tmp, bytes).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        tracing::warn!("Failed to replace {}: {e}", path.display());
        let _ = tokio::fs::remove_file(&tmp).await;
    }

    result
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut values = self.read_all().await?;
        values.insert(key.to_string(), value);

        check_quota(values.iter(), self.quota_bytes)?;

        self.write_all(&values).await?;

        tracing::debug!("Wrote key '{}' to {}", key, self.path.display());

        Ok(())
    }
}
