use std::sync::{Arc, OnceLock};

use chrono::Utc;

use super::backend::{MemoryBackend, StorageBackend, StoreError};
use super::file::FileBackend;
use super::token::{expiry_after, TokenKeys, TokenKind, TokenRecord};

/// Persistence for the access/refresh token pair.
///
/// Implementations must never fail outward: reads return a token or `None`,
/// writes and removal are best-effort. A keychain or secure-enclave store
/// plugs in by implementing this trait.
pub trait TokenStore: Send + Sync {
    fn token(&self, kind: TokenKind) -> Option<String>;
    fn set_token(&self, kind: TokenKind, token: &str, ttl_days: u32);
    fn remove_tokens(&self);

    fn access_token(&self) -> Option<String> {
        self.token(TokenKind::Access)
    }

    fn refresh_token(&self) -> Option<String> {
        self.token(TokenKind::Refresh)
    }

    fn set_access_token(&self, token: &str, ttl_days: u32) {
        self.set_token(TokenKind::Access, token, ttl_days);
    }

    fn set_refresh_token(&self, token: &str, ttl_days: u32) {
        self.set_token(TokenKind::Refresh, token, ttl_days);
    }

    /// Store both halves of a freshly issued pair.
    fn set_tokens(&self, access: &str, refresh: &str, access_ttl_days: u32, refresh_ttl_days: u32) {
        self.set_access_token(access, access_ttl_days);
        self.set_refresh_token(refresh, refresh_ttl_days);
    }
}

/// Token store writing every token to a primary and a fallback backend.
///
/// The primary holds the raw token with native expiry. The fallback holds a
/// JSON [`TokenRecord`] under a namespaced key and is consulted only when the
/// primary misses; a valid fallback hit is copied back into the primary.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use belay::auth::{DualTokenStore, MemoryBackend, TokenStore};
///
/// let store = DualTokenStore::new(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()));
/// store.set_tokens("access", "refresh", 1, 7);
/// assert_eq!(store.access_token().as_deref(), Some("access"));
/// ```
pub struct DualTokenStore {
    primary: Arc<dyn StorageBackend>,
    fallback: Arc<dyn StorageBackend>,
    keys: TokenKeys,
}

impl std::fmt::Debug for DualTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualTokenStore")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .field("keys", &self.keys)
            .finish()
    }
}

impl DualTokenStore {
    pub fn new(primary: Arc<dyn StorageBackend>, fallback: Arc<dyn StorageBackend>) -> Self {
        Self {
            primary,
            fallback,
            keys: TokenKeys::default(),
        }
    }

    pub fn with_keys(mut self, keys: TokenKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    fn read_fallback(&self, kind: TokenKind) -> Option<String> {
        if !self.fallback.is_available() {
            return None;
        }
        let key = self.keys.fallback(kind);
        let raw = match self.fallback.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(backend = self.fallback.name(), token = %kind, error = %error, "Failed to read fallback token");
                return None;
            }
        };

        let now = Utc::now();
        match serde_json::from_str::<TokenRecord>(&raw) {
            Ok(record) if !record.is_expired_at(now) => {
                self.resync_primary(kind, &record);
                Some(record.token)
            }
            Ok(_) => {
                tracing::debug!(backend = self.fallback.name(), token = %kind, "Dropping expired fallback token");
                self.discard_fallback(&key);
                None
            }
            Err(error) => {
                tracing::warn!(backend = self.fallback.name(), token = %kind, error = %error, "Dropping malformed fallback token");
                self.discard_fallback(&key);
                None
            }
        }
    }

    fn resync_primary(&self, kind: TokenKind, record: &TokenRecord) {
        if !self.primary.is_available() {
            return;
        }
        let key = self.keys.primary(kind);
        match self.primary.set(key, &record.token, Some(record.expires_at)) {
            Ok(()) => {
                tracing::debug!(backend = self.primary.name(), token = %kind, "Resynced token from fallback")
            }
            Err(error) => {
                tracing::warn!(backend = self.primary.name(), token = %kind, error = %error, "Failed to resync token")
            }
        }
    }

    fn discard_fallback(&self, key: &str) {
        if let Err(error) = self.fallback.remove(key) {
            tracing::warn!(backend = self.fallback.name(), error = %error, "Failed to remove stale fallback token");
        }
    }
}

impl TokenStore for DualTokenStore {
    fn token(&self, kind: TokenKind) -> Option<String> {
        match self.primary.get(self.keys.primary(kind)) {
            Ok(Some(token)) => return Some(token),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(backend = self.primary.name(), token = %kind, error = %error, "Failed to read token");
            }
        }
        self.read_fallback(kind)
    }

    fn set_token(&self, kind: TokenKind, token: &str, ttl_days: u32) {
        let expires_at = expiry_after(Utc::now(), ttl_days);

        if let Err(error) = self
            .primary
            .set(self.keys.primary(kind), token, Some(expires_at))
        {
            tracing::warn!(backend = self.primary.name(), token = %kind, error = %error, "Failed to write token");
        }

        if !self.fallback.is_available() {
            tracing::warn!(backend = self.fallback.name(), token = %kind, "Fallback backend unavailable, skipping write");
            return;
        }
        let record = TokenRecord::new(token, expires_at);
        let written = serde_json::to_string(&record)
            .map_err(StoreError::from)
            .and_then(|json| self.fallback.set(&self.keys.fallback(kind), &json, None));
        if let Err(error) = written {
            tracing::warn!(backend = self.fallback.name(), token = %kind, error = %error, "Failed to write fallback token");
        }
    }

    fn remove_tokens(&self) {
        for kind in [TokenKind::Access, TokenKind::Refresh] {
            if let Err(error) = self.primary.remove(self.keys.primary(kind)) {
                tracing::warn!(backend = self.primary.name(), token = %kind, error = %error, "Failed to remove token");
            }
            if let Err(error) = self.fallback.remove(&self.keys.fallback(kind)) {
                tracing::warn!(backend = self.fallback.name(), token = %kind, error = %error, "Failed to remove fallback token");
            }
        }
    }
}

static DEFAULT_STORE: OnceLock<Arc<DualTokenStore>> = OnceLock::new();

/// Shared default store: in-memory primary, file fallback under `~/.belay`.
///
/// Only a convenience for binaries and quick scripts; clients always receive
/// their store explicitly.
pub fn default_token_store() -> Arc<dyn TokenStore> {
    DEFAULT_STORE
        .get_or_init(|| {
            Arc::new(DualTokenStore::new(
                Arc::new(MemoryBackend::new()),
                Arc::new(FileBackend::new_default()),
            ))
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::file::FileBackendConfig;
    use chrono::Duration;
    use tempfile::TempDir;

    fn memory_store() -> (Arc<MemoryBackend>, Arc<MemoryBackend>, DualTokenStore) {
        let primary = Arc::new(MemoryBackend::new());
        let fallback = Arc::new(MemoryBackend::new());
        let store = DualTokenStore::new(primary.clone(), fallback.clone());
        (primary, fallback, store)
    }

    #[test]
    fn set_tokens_writes_both_backends() {
        let (primary, fallback, store) = memory_store();
        store.set_tokens("access", "refresh", 1, 7);

        assert_eq!(primary.get("auth-token").unwrap().as_deref(), Some("access"));
        assert_eq!(primary.get("refresh-token").unwrap().as_deref(), Some("refresh"));

        let raw = fallback.get("fallback_refresh-token").unwrap().unwrap();
        let record: TokenRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.token, "refresh");
        let ttl = record.expires_at - Utc::now();
        assert!(ttl > Duration::days(6) && ttl <= Duration::days(7));
    }

    #[test]
    fn primary_miss_reads_fallback_and_resyncs() {
        let (primary, _fallback, store) = memory_store();
        store.set_access_token("access", 1);
        primary.remove("auth-token").unwrap();

        assert_eq!(store.access_token().as_deref(), Some("access"));
        assert_eq!(primary.get("auth-token").unwrap().as_deref(), Some("access"));
    }

    #[test]
    fn expired_fallback_record_is_deleted() {
        let (_primary, fallback, store) = memory_store();
        let stale = TokenRecord::new("old", Utc::now() - Duration::seconds(5));
        fallback
            .set("fallback_auth-token", &serde_json::to_string(&stale).unwrap(), None)
            .unwrap();

        assert_eq!(store.access_token(), None);
        assert_eq!(fallback.get("fallback_auth-token").unwrap(), None);
    }

    #[test]
    fn malformed_fallback_record_is_deleted() {
        let (_primary, fallback, store) = memory_store();
        fallback.set("fallback_auth-token", "{not-json", None).unwrap();

        assert_eq!(store.access_token(), None);
        assert_eq!(fallback.get("fallback_auth-token").unwrap(), None);
    }

    #[test]
    fn remove_tokens_clears_everything() {
        let (primary, fallback, store) = memory_store();
        store.set_tokens("a", "r", 1, 7);
        store.remove_tokens();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(primary.get("auth-token").unwrap(), None);
        assert_eq!(fallback.get("fallback_refresh-token").unwrap(), None);
    }

    #[test]
    fn custom_keys_are_used_in_both_backends() {
        let primary = Arc::new(MemoryBackend::new());
        let fallback = Arc::new(MemoryBackend::new());
        let store = DualTokenStore::new(primary.clone(), fallback.clone()).with_keys(TokenKeys {
            access: "app-auth".to_string(),
            refresh: "app-refresh".to_string(),
            fallback_prefix: "ls_".to_string(),
        });
        store.set_access_token("a", 1);

        assert_eq!(primary.get("app-auth").unwrap().as_deref(), Some("a"));
        assert!(fallback.get("ls_app-auth").unwrap().is_some());
    }

    #[test]
    fn file_fallback_survives_a_fresh_primary() {
        let dir = TempDir::new().unwrap();
        let fallback = Arc::new(FileBackend::new(FileBackendConfig::new(dir.path().to_path_buf())));
        DualTokenStore::new(Arc::new(MemoryBackend::new()), fallback.clone())
            .set_tokens("access", "refresh", 1, 7);

        let restarted = DualTokenStore::new(Arc::new(MemoryBackend::new()), fallback);
        assert_eq!(restarted.refresh_token().as_deref(), Some("refresh"));
    }
}
