use crate::{TransactionId, WeaveError, WeaveResult};

/// Outcome class of a transaction status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 202: accepted but still propagating
    Pending,
    /// 429: the status endpoint is rate limiting us
    RateLimited,
    /// Any other 2xx
    Success,
    /// 4xx other than 429
    ClientError,
    /// 5xx
    ServerError,
    /// Anything else, including a missing status
    Unknown,
}

impl StatusClass {
    pub fn classify(status: Option<u16>) -> Self {
        match status {
            Some(202) => Self::Pending,
            Some(429) => Self::RateLimited,
            Some(200..=299) => Self::Success,
            Some(400..=499) => Self::ClientError,
            Some(500..=599) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Pending and rate-limited statuses are polled again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Pending | Self::RateLimited)
    }
}

/// Turn a final (non-retryable) status into the upload result
pub fn finalize(transaction_id: &TransactionId, status: Option<u16>) -> WeaveResult<TransactionId> {
    let transaction_id = transaction_id.clone();
    match (StatusClass::classify(status), status) {
        (StatusClass::Success | StatusClass::Pending, _) => Ok(transaction_id),
        (StatusClass::ClientError | StatusClass::RateLimited, Some(status)) => {
            Err(WeaveError::InvalidTransaction { transaction_id, status })
        }
        (StatusClass::ServerError, Some(status)) => {
            Err(WeaveError::TransactionFailed { transaction_id, status })
        }
        _ => Err(WeaveError::UnhandledStatus { transaction_id, status }),
    }
}
