//! Error types for belay.

pub mod category;

pub use category::ErrorCategory;

use thiserror::Error;

/// Primary error type returned by the client.
///
/// A non-success HTTP response always surfaces as [`BelayError::Status`] with
/// the status and body of the attempt that ended the request, so the caller
/// sees the same error the server produced even after refreshes and retries.
#[derive(Error, Debug)]
pub enum BelayError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request to {0} cannot be replayed (streaming body)")]
    NonReplayable(String),
}

impl BelayError {
    /// Create a status error for a response that was received.
    pub fn status(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// HTTP status of the response that produced this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the transport never produced a response.
    pub fn is_no_response(&self) -> bool {
        self.category() == ErrorCategory::Network
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::NonReplayable(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api(_) => ErrorCategory::Api,
            Self::Status { status, .. } => ErrorCategory::from_status(*status),
            Self::Network(err) => {
                if err.is_builder() {
                    ErrorCategory::Configuration
                } else if err.is_decode() {
                    ErrorCategory::Serialization
                } else if let Some(status) = err.status() {
                    ErrorCategory::from_status(status.as_u16())
                } else {
                    ErrorCategory::Network
                }
            }
        }
    }

    /// Whether this error is retryable under the default status set.
    ///
    /// For callers outside [`crate::client::Client`] that run their own retry
    /// loops; the client itself consults its configured
    /// [`crate::util::retry::RetryPolicy`].
    pub fn is_retryable(&self) -> bool {
        match self.category() {
            ErrorCategory::Network => true,
            ErrorCategory::Server => self
                .status_code()
                .is_some_and(|s| crate::config::DEFAULT_RETRYABLE_STATUSES.contains(&s)),
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BelayError>;
