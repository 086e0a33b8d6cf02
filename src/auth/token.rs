use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default lifetime of an access token, in days.
pub const ACCESS_TOKEN_TTL_DAYS: u32 = 1;
/// Default lifetime of a refresh token, in days.
pub const REFRESH_TOKEN_TTL_DAYS: u32 = 7;

/// Which half of the token pair an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn default_ttl_days(self) -> u32 {
        match self {
            Self::Access => ACCESS_TOKEN_TTL_DAYS,
            Self::Refresh => REFRESH_TOKEN_TTL_DAYS,
        }
    }
}

/// Compute the expiry instant `ttl_days` whole days after `issued_at`.
pub fn expiry_after(issued_at: DateTime<Utc>, ttl_days: u32) -> DateTime<Utc> {
    issued_at + Duration::days(i64::from(ttl_days))
}

/// Token payload stored in the fallback backend.
///
/// Serialized as `{"token": "...", "expiresAt": <epoch millis>}`. The record
/// carries its own expiry because the fallback backend has no native one.
///
/// # Example
/// ```
/// use belay::auth::TokenRecord;
/// use chrono::{Duration, Utc};
///
/// let record = TokenRecord::new("access", Utc::now() + Duration::days(1));
/// assert!(!record.is_expired_at(Utc::now()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    #[serde(rename = "expiresAt", with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Key names used by a [`crate::auth::DualTokenStore`].
///
/// The primary backend stores each token under its plain key; the fallback
/// backend stores the JSON [`TokenRecord`] under `fallback_prefix + key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenKeys {
    pub access: String,
    pub refresh: String,
    pub fallback_prefix: String,
}

impl Default for TokenKeys {
    fn default() -> Self {
        Self {
            access: "auth-token".to_string(),
            refresh: "refresh-token".to_string(),
            fallback_prefix: "fallback_".to_string(),
        }
    }
}

impl TokenKeys {
    pub fn primary(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn fallback(&self, kind: TokenKind) -> String {
        format!("{}{}", self.fallback_prefix, self.primary(kind))
    }
}
