#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use belay::auth::{DualTokenStore, MemoryBackend, StorageBackend, StoreError};
use chrono::{DateTime, Utc};

/// Memory backend whose reads and writes can be switched to fail.
#[derive(Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful `set` calls, availability checks included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).ok().flatten()
    }
}

impl StorageBackend for FlakyBackend {
    fn name(&self) -> &str {
        "flaky"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str, expires_at: Option<DateTime<Utc>>) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, expires_at)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected remove failure".to_string()));
        }
        self.inner.remove(key)
    }
}

pub fn flaky_store() -> (Arc<FlakyBackend>, Arc<FlakyBackend>, Arc<DualTokenStore>) {
    let primary = Arc::new(FlakyBackend::new());
    let fallback = Arc::new(FlakyBackend::new());
    let store = Arc::new(DualTokenStore::new(primary.clone(), fallback.clone()));
    (primary, fallback, store)
}

pub fn memory_store() -> Arc<DualTokenStore> {
    Arc::new(DualTokenStore::new(
        Arc::new(MemoryBackend::new()),
        Arc::new(MemoryBackend::new()),
    ))
}
