//! Request pipeline: bearer injection, refresh-and-replay, transient retry.

pub mod attempt;
pub mod envelope;
pub mod http;

pub use attempt::RequestAttempt;
pub use envelope::ApiResponse;

use std::sync::Arc;

use futures::FutureExt;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::{RefreshCoordinator, RefreshError, TokenStore};
use crate::config::ClientConfig;
use crate::error::{BelayError, Result};
use crate::util::retry::RetryPolicy;
use crate::util::single_flight::SingleFlight;

/// API client wrapping every request in the resilience pipeline.
///
/// Cloning is cheap; clones share the transport, the token store and the
/// in-flight refresh.
///
/// # Example
/// ```no_run
/// use belay::auth::default_token_store;
/// use belay::client::Client;
/// use belay::config::ClientConfig;
///
/// # async fn example() -> belay::error::Result<()> {
/// let config = ClientConfig::builder().base_url("https://api.example.com/api/v1").build();
/// let client = Client::new(config, default_token_store())?;
/// let me: serde_json::Value = client.send_json(client.get("/users/me")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    retry: RetryPolicy,
    store: Arc<dyn TokenStore>,
    refresher: Arc<RefreshCoordinator>,
    refresh_flight: SingleFlight<std::result::Result<String, RefreshError>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client with its own transport using `config.timeout`.
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| BelayError::Configuration(format!("HTTP client: {err}")))?;
        Self::with_http_client(config, store, http)
    }

    /// Build a client on a caller-supplied transport. The transport's own
    /// timeout settings apply.
    pub fn with_http_client(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        http: reqwest::Client,
    ) -> Result<Self> {
        config.validate()?;
        let refresher = Arc::new(RefreshCoordinator::new(http.clone(), &config));
        Ok(Self {
            inner: Arc::new(ClientInner {
                retry: RetryPolicy::from_config(&config),
                http,
                config,
                store,
                refresher,
                refresh_flight: SingleFlight::new(),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    /// Start a request against `path`, resolved relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.inner.http.request(method, self.inner.config.url_for(path))
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Build and run `builder` through the pipeline.
    pub async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = builder
            .build()
            .map_err(|err| BelayError::Configuration(format!("invalid request: {err}")))?;
        self.execute(request).await
    }

    /// Run `builder` and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        let body = self.send(builder).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Run `builder` and unwrap the `{ success, data }` envelope.
    pub async fn send_api<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        self.send_json::<ApiResponse<T>>(builder).await?.into_data()
    }

    /// Run a prepared request through the pipeline.
    ///
    /// A 2xx response is returned as-is. Any other outcome is an error
    /// carrying the status and body of the last attempt.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let attempt = RequestAttempt::new(Uuid::new_v4());
        let span = tracing::info_span!(
            "belay.request",
            request_id = %attempt.id,
            method = %request.method(),
            url = %request.url(),
        );
        self.run(request, attempt).instrument(span).await
    }

    async fn run(
        &self,
        template: reqwest::Request,
        mut attempt: RequestAttempt,
    ) -> Result<reqwest::Response> {
        // Reject streaming bodies before anything is sent.
        http::replay(&template)?;
        let mut refreshed: Option<String> = None;

        loop {
            let mut request = http::replay(&template)?;
            let sent_token = refreshed.take().or_else(|| self.inner.store.access_token());
            if let Some(token) = sent_token.as_deref() {
                http::attach_bearer(request.headers_mut(), token);
            }

            let error = match self.inner.http.execute(request).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => http::status_to_error(response).await,
                Err(err) => BelayError::Network(err),
            };

            if error.is_unauthorized() && attempt.begin_auth_retry() {
                tracing::debug!("Unauthorized, refreshing access token");
                match self.renew_access_token(sent_token.as_deref()).await {
                    Ok(token) => {
                        refreshed = Some(token);
                        continue;
                    }
                    Err(refresh_error) => {
                        tracing::debug!(error = %refresh_error, "Refresh failed, surfacing original error");
                        return Err(error);
                    }
                }
            }

            if self.inner.retry.should_retry(&error, attempt.retry_count) {
                let delay = self.inner.retry.delay(attempt.retry_count);
                attempt.record_retry();
                tracing::warn!(
                    attempt = attempt.retry_count,
                    max_retries = self.inner.retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(error);
        }
    }

    /// New access token for a request rejected while holding `sent_token`.
    ///
    /// If the store already holds a different token, another request has
    /// refreshed since this one was sent and that token is reused. If the
    /// store was emptied after this request went out, the failure is reported
    /// without a new exchange or a second `on_auth_error`. Otherwise the
    /// refresh joins or starts the client's single in-flight exchange.
    async fn renew_access_token(
        &self,
        sent_token: Option<&str>,
    ) -> std::result::Result<String, RefreshError> {
        match self.inner.store.access_token() {
            Some(current) if !current.is_empty() && sent_token != Some(current.as_str()) => {
                tracing::debug!("Access token already rotated, replaying with it");
                return Ok(current);
            }
            // The session this request was sent with has already been torn
            // down by an earlier failed refresh; its hook has fired.
            None if sent_token.is_some() && self.inner.store.refresh_token().is_none() => {
                tracing::debug!("Tokens already cleared, skipping refresh");
                return Err(RefreshError::NoRefreshToken);
            }
            _ => {}
        }

        let refresher = Arc::clone(&self.inner.refresher);
        let store = Arc::clone(&self.inner.store);
        let on_auth_error = self.inner.config.on_auth_error.clone();
        self.inner
            .refresh_flight
            .run(move || {
                async move {
                    match refresher.refresh(store.as_ref()).await {
                        Ok(token) => Ok(token),
                        Err(error) => {
                            tracing::warn!(error = %error, "Token refresh failed, clearing stored tokens");
                            store.remove_tokens();
                            if let Some(hook) = on_auth_error {
                                hook();
                            }
                            Err(error)
                        }
                    }
                }
                .boxed()
            })
            .await
    }
}
