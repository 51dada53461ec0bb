use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, field, info, instrument, warn, Span};

use crate::backoff::{cancellable, pause, Backoff, Sleeper, TokioSleeper};
use crate::poller::await_confirmation;
use crate::{
    ChunkUploader, MemoryRecoveryLedger, Payload, RecoveryLedger, TransactionId,
    TransactionStatus, UploadRecord, Wallet, WeaveClient, WeaveConfig, WeaveError,
    WeaveResult, WeaveTransaction, CONTENT_TYPE_TAG,
};

/// Drives uploads to the weave and keeps enough state to resume them.
///
/// Embed one manager per wallet; it is cheap to share behind an `Arc` and
/// safe to use from many tasks at once.
pub struct WeaveManager<C: WeaveClient> {
    client: Arc<C>,
    wallet: Wallet,
    ledger: Arc<dyn RecoveryLedger>,
    sleeper: Arc<dyn Sleeper>,
    config: WeaveConfig,
}

impl<C: WeaveClient> WeaveManager<C> {
    /// Create a manager with an in-memory ledger and real sleeps
    pub fn new(client: C, wallet: Wallet, config: WeaveConfig) -> Self {
        Self {
            client: Arc::new(client),
            wallet,
            ledger: Arc::new(MemoryRecoveryLedger::new()),
            sleeper: Arc::new(TokioSleeper),
            config,
        }
    }

    /// Use a different recovery ledger
    pub fn with_ledger<L: RecoveryLedger + 'static>(mut self, ledger: L) -> Self {
        self.ledger = Arc::new(ledger);
        self
    }

    /// Share a recovery ledger with other managers
    pub fn with_shared_ledger(mut self, ledger: Arc<dyn RecoveryLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Use a different delay implementation
    pub fn with_sleeper<S: Sleeper + 'static>(mut self, sleeper: S) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Upload `payload` and wait until the network accepts it.
    ///
    /// `content_type` defaults to the configured default
    /// (`application/octet-stream`). A chunk failure other than rate limiting
    /// returns [`WeaveError::Verification`]; the transaction stays in the
    /// ledger and can be passed to [`WeaveManager::resume`].
    pub async fn upload(
        &self,
        payload: impl Into<Payload>,
        content_type: Option<&str>,
    ) -> WeaveResult<TransactionId> {
        self.upload_with_cancel(payload, content_type, &CancellationToken::new())
            .await
    }

    /// [`WeaveManager::upload`], stopping with [`WeaveError::Cancelled`] when
    /// `cancel` fires. Cancelling during chunk upload keeps the ledger entry.
    #[instrument(
        name = "weave.upload",
        skip_all,
        fields(size = field::Empty, content_type = field::Empty, transaction_id = field::Empty)
    )]
    pub async fn upload_with_cancel(
        &self,
        payload: impl Into<Payload>,
        content_type: Option<&str>,
        cancel: &CancellationToken,
    ) -> WeaveResult<TransactionId> {
        let data = payload.into().into_bytes();
        let content_type = content_type
            .unwrap_or(&self.config.default_content_type)
            .to_string();
        let span = Span::current();
        span.record("size", data.len());
        span.record("content_type", content_type.as_str());

        let mut transaction = cancellable(
            cancel,
            None,
            self.client.create_transaction(data.clone(), &self.wallet),
        )
        .await??;
        transaction.add_tag(CONTENT_TYPE_TAG, &content_type);
        cancellable(cancel, None, self.client.sign(&mut transaction, &self.wallet)).await??;

        let transaction_id = transaction
            .id()
            .filter(|id| !id.as_str().is_empty())
            .ok_or(WeaveError::Unsigned)?;
        span.record("transaction_id", field::display(&transaction_id));
        info!("transaction signed");

        let mut uploader = cancellable(
            cancel,
            Some(&transaction_id),
            self.client.get_uploader(&transaction),
        )
        .await??;

        // Registered before the first chunk so even that one is recoverable
        self.ledger
            .insert(UploadRecord::new(
                transaction_id.clone(),
                uploader.state(),
                data,
                content_type,
            ))
            .await?;

        self.drain_chunks(&mut uploader, &transaction_id, true, cancel)
            .await?;
        self.ledger.remove(&transaction_id).await?;
        info!("all chunks uploaded");

        await_confirmation(
            self.client.as_ref(),
            &transaction_id,
            &self.config,
            self.sleeper.as_ref(),
            cancel,
        )
        .await?;

        Ok(transaction_id)
    }

    /// Finish uploading a transaction left in the ledger by a failed upload.
    ///
    /// Fails with [`WeaveError::TransactionNotFound`] before touching the
    /// network if the id is unknown. Does not wait for confirmation; use
    /// [`WeaveManager::confirm`] for that.
    pub async fn resume(
        &self,
        transaction_id: impl Into<TransactionId>,
    ) -> WeaveResult<TransactionId> {
        self.resume_with_cancel(transaction_id, &CancellationToken::new())
            .await
    }

    /// [`WeaveManager::resume`] honouring a cancellation token
    #[instrument(name = "weave.resume", skip_all, fields(transaction_id = field::Empty))]
    pub async fn resume_with_cancel(
        &self,
        transaction_id: impl Into<TransactionId>,
        cancel: &CancellationToken,
    ) -> WeaveResult<TransactionId> {
        let transaction_id = transaction_id.into();
        Span::current().record("transaction_id", field::display(&transaction_id));

        let record = self
            .ledger
            .get(&transaction_id)
            .await?
            .ok_or_else(|| WeaveError::not_found(&transaction_id))?;

        let mut uploader = cancellable(
            cancel,
            Some(&transaction_id),
            self.client.resume_uploader(&record.uploader, record.data.clone()),
        )
        .await?
        .map_err(|err| WeaveError::verification(&transaction_id, err))?;
        debug!(chunk_index = record.uploader.chunk_index, "uploader restored");

        self.drain_chunks(&mut uploader, &transaction_id, false, cancel)
            .await?;
        self.ledger.remove(&transaction_id).await?;
        info!("resumed upload complete");

        Ok(transaction_id)
    }

    /// Wait for the network's final verdict on a fully uploaded transaction
    pub async fn confirm(
        &self,
        transaction_id: impl Into<TransactionId>,
    ) -> WeaveResult<TransactionStatus> {
        self.confirm_with_cancel(transaction_id, &CancellationToken::new())
            .await
    }

    /// [`WeaveManager::confirm`] honouring a cancellation token
    #[instrument(name = "weave.confirm", skip_all, fields(transaction_id = field::Empty))]
    pub async fn confirm_with_cancel(
        &self,
        transaction_id: impl Into<TransactionId>,
        cancel: &CancellationToken,
    ) -> WeaveResult<TransactionStatus> {
        let transaction_id = transaction_id.into();
        Span::current().record("transaction_id", field::display(&transaction_id));

        await_confirmation(
            self.client.as_ref(),
            &transaction_id,
            &self.config,
            self.sleeper.as_ref(),
            cancel,
        )
        .await
    }

    /// Upload chunks until the uploader reports completion, keeping the
    /// ledger snapshot current. Rate-limited chunks are retried only when
    /// `retry_rate_limited` is set; every other failure is a verification
    /// error.
    async fn drain_chunks(
        &self,
        uploader: &mut C::Uploader,
        transaction_id: &TransactionId,
        retry_rate_limited: bool,
        cancel: &CancellationToken,
    ) -> WeaveResult<()> {
        let mut rate_limited: u32 = 0;

        while !uploader.is_complete() {
            let result = cancellable(cancel, Some(transaction_id), uploader.upload_chunk()).await?;
            self.ledger
                .update_uploader(transaction_id, uploader.state())
                .await?;

            match result {
                Ok(()) => {
                    rate_limited = 0;
                    debug!(
                        uploaded = uploader.uploaded_chunks(),
                        total = ?uploader.total_chunks(),
                        "chunk uploaded"
                    );
                }
                Err(err) if retry_rate_limited && err.is_rate_limited() => {
                    rate_limited += 1;
                    if let Some(max) = self.config.max_rate_limit_retries {
                        if rate_limited > max {
                            error!(retries = max, error = %err, "chunk still rate limited, giving up");
                            return Err(WeaveError::verification(transaction_id, err));
                        }
                    }
                    warn!(attempt = rate_limited, "chunk upload rate limited, backing off");
                    pause(
                        self.sleeper.as_ref(),
                        Backoff::Long.duration(&self.config),
                        cancel,
                        Some(transaction_id),
                    )
                    .await?;
                }
                Err(err) => {
                    error!(error = %err, "chunk upload failed");
                    return Err(WeaveError::verification(transaction_id, err));
                }
            }
        }

        Ok(())
    }

    /// The recovery ledger, for inspecting transactions after a
    /// verification error
    pub fn ledger(&self) -> &Arc<dyn RecoveryLedger> {
        &self.ledger
    }

    /// Get the network client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Get the wallet used for signing
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Get configuration
    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }
}
