use uuid::Uuid;

/// Bookkeeping for one logical request across its replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestAttempt {
    pub id: Uuid,
    /// Set once the request has been replayed after a token refresh.
    pub auth_retried: bool,
    /// Transient-failure replays performed so far.
    pub retry_count: u32,
}

impl RequestAttempt {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            auth_retried: false,
            retry_count: 0,
        }
    }

    /// Claim the single refresh-and-replay. Returns false if already used.
    pub fn begin_auth_retry(&mut self) -> bool {
        if self.auth_retried {
            return false;
        }
        self.auth_retried = true;
        true
    }

    pub fn record_retry(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }
}
