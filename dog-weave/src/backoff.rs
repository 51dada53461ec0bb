use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{TransactionId, WeaveConfig, WeaveError, WeaveResult};

/// Which of the two configured waits to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Propagation lag: after chunk completion and pending statuses
    Normal,
    /// Rate limiting: after any 429
    Long,
}

impl Backoff {
    pub fn duration(&self, config: &WeaveConfig) -> Duration {
        match self {
            Self::Normal => config.normal_backoff,
            Self::Long => config.long_backoff,
        }
    }
}

/// Delay primitive used by the chunk retry loop and the confirmation poller.
///
/// Swap in a different implementation to test without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleep for `duration`, returning early with [`WeaveError::Cancelled`] if
/// the token fires first.
pub async fn pause(
    sleeper: &dyn Sleeper,
    duration: Duration,
    cancel: &CancellationToken,
    transaction_id: Option<&TransactionId>,
) -> WeaveResult<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WeaveError::cancelled(transaction_id.cloned())),
        _ = sleeper.sleep(duration) => Ok(()),
    }
}

/// Run `future` unless the token fires first
pub async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    transaction_id: Option<&TransactionId>,
    future: F,
) -> WeaveResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WeaveError::cancelled(transaction_id.cloned())),
        output = future => Ok(output),
    }
}
