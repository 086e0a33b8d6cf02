//! Request decoration and response classification helpers.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::{BelayError, Result};

/// Set `Authorization: Bearer <token>`, replacing any caller-supplied value.
///
/// A token that is not a valid header value is skipped and the request goes
/// out unauthenticated.
pub fn attach_bearer(headers: &mut HeaderMap, token: &str) {
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(_) => tracing::warn!("Stored access token is not a valid header value"),
    }
}

/// Fresh copy of `request` for one attempt.
pub fn replay(request: &reqwest::Request) -> Result<reqwest::Request> {
    request
        .try_clone()
        .ok_or_else(|| BelayError::NonReplayable(request.url().to_string()))
}

/// Turn a non-success response into [`BelayError::Status`].
pub async fn status_to_error(response: reqwest::Response) -> BelayError {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    BelayError::status(status, url, body)
}
