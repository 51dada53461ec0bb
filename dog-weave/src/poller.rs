use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::{cancellable, pause, Backoff, Sleeper};
use crate::status::{finalize, StatusClass};
use crate::{TransactionId, TransactionStatus, WeaveClient, WeaveConfig, WeaveError, WeaveResult};

/// Poll the network until it gives a final answer about `transaction_id`.
///
/// The first status is fetched right away but only looked at after one
/// normal backoff, to let the transaction propagate. Pending (202) and rate
/// limited (429) answers are polled again, waiting the normal or long
/// interval respectively. The final status is classified numerically: 2xx
/// returns it, everything else is an error.
pub async fn await_confirmation<C>(
    client: &C,
    transaction_id: &TransactionId,
    config: &WeaveConfig,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
) -> WeaveResult<TransactionStatus>
where
    C: WeaveClient + ?Sized,
{
    let mut response = fetch_status(client, transaction_id, cancel).await?;
    pause(sleeper, Backoff::Normal.duration(config), cancel, Some(transaction_id)).await?;

    let mut polls: u32 = 0;
    while StatusClass::classify(response.status).is_retryable() {
        polls += 1;
        if let Some(max) = config.max_status_polls {
            if polls > max {
                warn!(%transaction_id, polls = max, "giving up on confirmation");
                return Err(WeaveError::ConfirmationTimeout {
                    transaction_id: transaction_id.clone(),
                    last_status: response.status,
                });
            }
        }

        debug!(%transaction_id, status = ?response.status, polls, "waiting for final status");
        response = fetch_status(client, transaction_id, cancel).await?;

        match StatusClass::classify(response.status) {
            StatusClass::Pending => {
                pause(sleeper, Backoff::Normal.duration(config), cancel, Some(transaction_id)).await?
            }
            StatusClass::RateLimited => {
                warn!(%transaction_id, "status endpoint rate limited");
                pause(sleeper, Backoff::Long.duration(config), cancel, Some(transaction_id)).await?
            }
            _ => {}
        }
    }

    finalize(transaction_id, response.status)?;
    info!(%transaction_id, status = ?response.status, "transaction accepted by network");
    Ok(response)
}

// A 429 raised as an error is treated like a 429 status
async fn fetch_status<C>(
    client: &C,
    transaction_id: &TransactionId,
    cancel: &CancellationToken,
) -> WeaveResult<TransactionStatus>
where
    C: WeaveClient + ?Sized,
{
    match cancellable(cancel, Some(transaction_id), client.get_status(transaction_id)).await? {
        Ok(status) => Ok(status),
        Err(err) if err.is_rate_limited() => Ok(TransactionStatus::new(429)),
        Err(err) => Err(err.into()),
    }
}
