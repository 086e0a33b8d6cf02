//! Key/value persistence backends used underneath a token store.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use thiserror::Error;

const CHECK_KEY_PREFIX: &str = "__belay_check_";
const CHECK_VALUE: &str = "ok";

/// Failure of a single backend operation.
///
/// These never escape a [`crate::auth::TokenStore`]; they are logged and
/// treated as a miss.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} backend unavailable")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// A string key/value store that may be disabled or restricted by its host.
///
/// `expires_at` is the backend's native expiry: a backend that supports it
/// must stop returning the value once it has passed. Backends without native
/// expiry are given `None`.
pub trait StorageBackend: Send + Sync {
    /// Short label used in log fields.
    fn name(&self) -> &str;
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str, expires_at: Option<DateTime<Utc>>)
        -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Check the backend with a throwaway write, read, and remove.
    ///
    /// Each check uses its own key so concurrent checks of a shared backend
    /// cannot remove each other's entry.
    fn is_available(&self) -> bool {
        let key = format!("{CHECK_KEY_PREFIX}{}", uuid::Uuid::new_v4().simple());
        let round_trip = || -> Result<bool, StoreError> {
            self.set(&key, CHECK_VALUE, None)?;
            let read_back = self.get(&key)?;
            self.remove(&key)?;
            Ok(read_back.as_deref() == Some(CHECK_VALUE))
        };
        round_trip().unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Process-local backend honoring native expiry.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory".to_string()))
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock()?;
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(entry) => entry.expires_at.is_some_and(|exp| exp <= Utc::now()),
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    fn set(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.lock()?.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
