//! Persistent forecast cache.
//!
//! A single record per location lives in a key-value store. The key embeds
//! the record schema version so a change to the payload shape reads as a
//! miss instead of deserializing stale-shaped data.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::location::Location;
use crate::payload::ForecastPayload;

/// Bump when `CacheEntry` or `ForecastPayload` change shape.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Minimal string key-value store backing the cache.
pub trait CacheStore: Send + Sync {
    /// Read the value under `key`; `Ok(None)` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        (**self).set(key, value)
    }
}

impl<T: CacheStore + ?Sized> CacheStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        (**self).set(key, value)
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;

        // Readers only ever see a complete record.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-process store, used for `--no-cache` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Last successfully fetched payload and when it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
    pub payload: ForecastPayload,
}

impl CacheEntry {
    pub fn new(payload: ForecastPayload, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            payload,
        }
    }
}

/// Cache key for a location at the current schema version.
///
/// Coordinates are written in full so distinct points never share a record.
pub fn cache_key(location: &Location) -> String {
    format!(
        "quantum-weather:{},{}:v{}",
        location.latitude(),
        location.longitude(),
        CACHE_SCHEMA_VERSION
    )
}

/// Forecast cache for one location on top of a `CacheStore`.
#[derive(Debug)]
pub struct WeatherCache<K> {
    store: K,
    key: String,
}

impl<K: CacheStore> WeatherCache<K> {
    pub fn new(store: K, location: &Location) -> Self {
        Self {
            store,
            key: cache_key(location),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the cached entry.
    ///
    /// # Errors
    /// `CacheError::Unavailable` if the store fails, `CacheError::Corrupt`
    /// if the record does not decode or its series are misaligned.
    pub fn load(&self) -> Result<Option<CacheEntry>, CacheError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_str(&raw)?;
        entry
            .payload
            .validate()
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;
        Ok(Some(entry))
    }

    /// Overwrite the cached entry.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn store(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let raw = serde_json::to_string(entry)?;
        self.store.set(&self.key, &raw)
    }
}
