//! Token persistence and credential refresh.

pub mod backend;
pub mod file;
pub mod refresh;
pub mod store;
pub mod token;

pub use backend::{MemoryBackend, StorageBackend, StoreError};
pub use file::{FileBackend, FileBackendConfig};
pub use refresh::{RefreshCoordinator, RefreshError};
pub use store::{default_token_store, DualTokenStore, TokenStore};
pub use token::{TokenKeys, TokenKind, TokenRecord, ACCESS_TOKEN_TTL_DAYS, REFRESH_TOKEN_TTL_DAYS};
