use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::store::TokenStore;
use crate::config::ClientConfig;

/// Why an access token could not be renewed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("No refresh token stored")]
    NoRefreshToken,
    #[error("Refresh request failed: {0}")]
    Network(String),
    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16 },
    #[error("Malformed refresh response: {0}")]
    MalformedResponse(String),
}

/// Exchanges the stored refresh token for a new access token.
///
/// The exchange goes straight to the transport: it never carries a bearer
/// header and is never retried. Purging tokens after a failure is the
/// caller's job.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use belay::auth::{DualTokenStore, MemoryBackend, RefreshCoordinator};
/// use belay::config::ClientConfig;
///
/// # async fn example() -> Result<(), belay::auth::RefreshError> {
/// let config = ClientConfig::builder().base_url("https://api.example.com").build();
/// let store = DualTokenStore::new(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()));
/// let coordinator = RefreshCoordinator::new(reqwest::Client::new(), &config);
/// let access_token = coordinator.refresh(&store).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    http: reqwest::Client,
    endpoint: String,
    access_ttl_days: u32,
}

impl RefreshCoordinator {
    pub fn new(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http,
            endpoint: config.refresh_url(),
            access_ttl_days: config.access_token_ttl_days,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn refresh(&self, store: &dyn TokenStore) -> Result<String, RefreshError> {
        let refresh_token = store.refresh_token().ok_or(RefreshError::NoRefreshToken)?;

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|err| RefreshError::Network(err.to_string()))?;
        if !resp.status().is_success() {
            return Err(RefreshError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        let body = resp
            .text()
            .await
            .map_err(|err| RefreshError::Network(err.to_string()))?;
        let access_token = parse_refresh_body(&body)?;

        store.set_access_token(&access_token, self.access_ttl_days);
        tracing::info!(endpoint = %self.endpoint, "Access token refreshed");
        Ok(access_token)
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    success: bool,
    data: Option<RefreshData>,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    access_token: String,
}

fn parse_refresh_body(body: &str) -> Result<String, RefreshError> {
    let payload: RefreshResponse = serde_json::from_str(body)
        .map_err(|err| RefreshError::MalformedResponse(err.to_string()))?;
    if !payload.success {
        return Err(RefreshError::MalformedResponse(
            "success flag is false".to_string(),
        ));
    }
    match payload.data {
        Some(data) if !data.access_token.is_empty() => Ok(data.access_token),
        _ => Err(RefreshError::MalformedResponse(
            "missing access_token".to_string(),
        )),
    }
}
