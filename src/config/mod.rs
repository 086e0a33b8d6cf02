//! Client configuration (builder, defaults, environment loading).

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bon::Builder;

use crate::auth::ACCESS_TOKEN_TTL_DAYS;
use crate::error::{BelayError, Result};
use crate::util::retry::Jitter;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";

/// Called once per failed refresh, after the token store has been cleared.
pub type AuthErrorHook = Arc<dyn Fn() + Send + Sync>;

fn default_retryable_statuses() -> BTreeSet<u16> {
    DEFAULT_RETRYABLE_STATUSES.iter().copied().collect()
}

/// Configuration for a [`crate::client::Client`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use belay::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://api.example.com/api/v1")
///     .max_retries(5)
///     .base_retry_delay(Duration::from_millis(250))
///     .build();
/// assert_eq!(config.url_for("/users/me"), "https://api.example.com/api/v1/users/me");
/// ```
#[derive(Clone, Builder)]
pub struct ClientConfig {
    #[builder(into)]
    pub base_url: String,
    /// Per-attempt transport timeout.
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
    #[builder(default = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    #[builder(default = DEFAULT_RETRY_DELAY)]
    pub base_retry_delay: Duration,
    pub max_retry_delay: Option<Duration>,
    #[builder(default = default_retryable_statuses())]
    pub retryable_statuses: BTreeSet<u16>,
    #[builder(default)]
    pub jitter: Jitter,
    #[builder(into, default = DEFAULT_REFRESH_PATH.to_string())]
    pub refresh_path: String,
    #[builder(default = ACCESS_TOKEN_TTL_DAYS)]
    pub access_token_ttl_days: u32,
    pub on_auth_error: Option<AuthErrorHook>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("base_retry_delay", &self.base_retry_delay)
            .field("max_retry_delay", &self.max_retry_delay)
            .field("retryable_statuses", &self.retryable_statuses)
            .field("jitter", &self.jitter)
            .field("refresh_path", &self.refresh_path)
            .field("access_token_ttl_days", &self.access_token_ttl_days)
            .field("on_auth_error", &self.on_auth_error.as_ref().map(|_| ".."))
            .finish()
    }
}

impl ClientConfig {
    /// Install the auth-error hook.
    pub fn with_on_auth_error(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_auth_error = Some(Arc::new(hook));
        self
    }

    /// Load from environment variables (after reading `.env` if present).
    ///
    /// `BELAY_BASE_URL` is required. Optional: `BELAY_TIMEOUT_MS`,
    /// `BELAY_MAX_RETRIES`, `BELAY_RETRY_DELAY_MS`, `BELAY_MAX_RETRY_DELAY_MS`,
    /// `BELAY_RETRYABLE_STATUSES` (comma separated), `BELAY_RETRY_JITTER`
    /// (`none`, `full`, or a proportional spread such as `0.25`).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name: &str| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("BELAY_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| BelayError::Configuration("BELAY_BASE_URL is not set".to_string()))?;
        let mut config = Self::builder().base_url(base_url.trim()).build();

        if let Some(ms) = parse_var::<u64>(&lookup, "BELAY_TIMEOUT_MS")? {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var::<u32>(&lookup, "BELAY_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "BELAY_RETRY_DELAY_MS")? {
            config.base_retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "BELAY_MAX_RETRY_DELAY_MS")? {
            config.max_retry_delay = Some(Duration::from_millis(ms));
        }
        if let Some(raw) = lookup("BELAY_RETRYABLE_STATUSES") {
            config.retryable_statuses = parse_status_list(&raw)?;
        }
        if let Some(raw) = lookup("BELAY_RETRY_JITTER") {
            config.jitter = parse_jitter(&raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations a client cannot run with.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(BelayError::Configuration(format!(
                "base_url must be an http(s) URL, got {base:?}"
            )));
        }
        if self.retryable_statuses.iter().any(|s| !(100..=599).contains(s)) {
            return Err(BelayError::Configuration(
                "retryable_statuses must be HTTP status codes".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    /// Full URL of the refresh exchange endpoint.
    pub fn refresh_url(&self) -> String {
        self.url_for(&self.refresh_path)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            BelayError::Configuration(format!("{name} has invalid value {raw:?}"))
        }),
    }
}

fn parse_status_list(raw: &str) -> Result<BTreeSet<u16>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u16>().map_err(|_| {
                BelayError::Configuration(format!(
                    "BELAY_RETRYABLE_STATUSES has invalid status {part:?}"
                ))
            })
        })
        .collect()
}

fn parse_jitter(raw: &str) -> Result<Jitter> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "none" => Ok(Jitter::None),
        "full" => Ok(Jitter::Full),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|spread| (0.0..=1.0).contains(spread))
            .map(Jitter::Proportional)
            .ok_or_else(|| {
                BelayError::Configuration(format!("BELAY_RETRY_JITTER has invalid value {raw:?}"))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn builder_applies_defaults() {
        let config = ClientConfig::builder().base_url("https://api.test").build();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_retry_delay, Duration::from_secs(1));
        assert_eq!(
            config.retryable_statuses.iter().copied().collect::<Vec<_>>(),
            vec![429, 502, 503, 504]
        );
        assert_eq!(config.jitter, Jitter::None);
        assert_eq!(config.refresh_path, "/auth/refresh-token");
        assert_eq!(config.access_token_ttl_days, 1);
        assert!(config.on_auth_error.is_none());
    }

    #[test]
    fn url_for_joins_slashes_once() {
        let config = ClientConfig::builder().base_url("https://api.test/v1/").build();
        assert_eq!(config.url_for("/users"), "https://api.test/v1/users");
        assert_eq!(config.url_for("users"), "https://api.test/v1/users");
        assert_eq!(config.url_for(""), "https://api.test/v1");
        assert_eq!(config.url_for("https://other.test/x"), "https://other.test/x");
        assert_eq!(config.refresh_url(), "https://api.test/v1/auth/refresh-token");
    }

    #[test]
    fn from_lookup_requires_base_url() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, BelayError::Configuration(msg) if msg.contains("BELAY_BASE_URL")));
    }

    #[test]
    fn from_lookup_reads_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("BELAY_BASE_URL", "http://localhost:8787/api/v1"),
            ("BELAY_TIMEOUT_MS", "2500"),
            ("BELAY_MAX_RETRIES", "5"),
            ("BELAY_RETRY_DELAY_MS", "200"),
            ("BELAY_MAX_RETRY_DELAY_MS", "3000"),
            ("BELAY_RETRYABLE_STATUSES", "500, 503"),
            ("BELAY_RETRY_JITTER", "0.2"),
        ]))
        .unwrap();

        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_retry_delay, Duration::from_millis(200));
        assert_eq!(config.max_retry_delay, Some(Duration::from_secs(3)));
        assert_eq!(config.retryable_statuses, [500, 503].into_iter().collect());
        assert_eq!(config.jitter, Jitter::Proportional(0.2));
    }

    #[test]
    fn from_lookup_rejects_garbage_numbers() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            ("BELAY_BASE_URL", "https://api.test"),
            ("BELAY_MAX_RETRIES", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, BelayError::Configuration(msg) if msg.contains("BELAY_MAX_RETRIES")));
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let config = ClientConfig::builder().base_url("ftp://files.test").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn jitter_parsing_accepts_named_and_numeric_forms() {
        assert_eq!(parse_jitter("FULL").unwrap(), Jitter::Full);
        assert_eq!(parse_jitter("none").unwrap(), Jitter::None);
        assert_eq!(parse_jitter("0.5").unwrap(), Jitter::Proportional(0.5));
        assert!(parse_jitter("1.5").is_err());
    }

    #[test]
    fn debug_hides_hook() {
        let config = ClientConfig::builder()
            .base_url("https://api.test")
            .build()
            .with_on_auth_error(|| {});
        let rendered = format!("{config:?}");
        assert!(rendered.contains("on_auth_error: Some(\"..\")"));
    }
}
