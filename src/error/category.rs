//! Error classification shared by the retry policy and callers.

use strum::{Display, EnumString};

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// No response was received (connect failure, timeout, broken body).
    Network,
    /// A 5xx or rate-limit status.
    Server,
    /// 401 or 403.
    Authentication,
    /// Any other non-success status.
    Client,
    /// The server answered 2xx but the envelope reported failure.
    Api,
    Configuration,
    Serialization,
}

impl ErrorCategory {
    /// Classify an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 | 500..=599 => Self::Server,
            _ => Self::Client,
        }
    }
}
