//! Convenience re-exports for common use.

pub use crate::auth::{default_token_store, DualTokenStore, TokenStore};
pub use crate::client::{ApiResponse, Client};
pub use crate::config::ClientConfig;
pub use crate::error::{BelayError, ErrorCategory, Result};
pub use crate::util::retry::{Jitter, RetryPolicy};
