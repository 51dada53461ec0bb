use async_trait::async_trait;
use bytes::Bytes;

use crate::{ClientResult, TransactionId, TransactionStatus, UploaderState, Wallet};

/// Network client for the permanent storage network.
///
/// Building, signing and chunking transactions, and the wire protocol, live
/// behind this trait. The manager only drives it through a transaction's
/// lifecycle.
#[async_trait]
pub trait WeaveClient: Send + Sync {
    type Transaction: WeaveTransaction;
    type Uploader: ChunkUploader;

    /// Wrap `data` in a new, unsigned transaction owned by `wallet`
    async fn create_transaction(
        &self,
        data: Bytes,
        wallet: &Wallet,
    ) -> ClientResult<Self::Transaction>;

    /// Sign the transaction, assigning its id
    async fn sign(&self, transaction: &mut Self::Transaction, wallet: &Wallet) -> ClientResult<()>;

    /// Chunk uploader for a freshly signed transaction
    async fn get_uploader(&self, transaction: &Self::Transaction) -> ClientResult<Self::Uploader>;

    /// Rebuild an uploader from a saved snapshot and the original bytes
    async fn resume_uploader(
        &self,
        state: &UploaderState,
        data: Bytes,
    ) -> ClientResult<Self::Uploader>;

    /// Current network status of a transaction
    async fn get_status(&self, transaction_id: &TransactionId) -> ClientResult<TransactionStatus>;
}

/// A transaction being prepared for upload
pub trait WeaveTransaction: Send + Sync {
    fn add_tag(&mut self, name: &str, value: &str);

    /// `None` until the transaction is signed
    fn id(&self) -> Option<TransactionId>;
}

/// Stateful helper that sends a transaction's chunks one by one
#[async_trait]
pub trait ChunkUploader: Send {
    fn is_complete(&self) -> bool;

    /// Upload the next chunk. On failure the same chunk is attempted again
    /// on the next call.
    async fn upload_chunk(&mut self) -> ClientResult<()>;

    /// Snapshot that [`WeaveClient::resume_uploader`] can rebuild from
    fn state(&self) -> UploaderState;

    /// Chunks sent so far, for progress logging
    fn uploaded_chunks(&self) -> usize {
        self.state().chunk_index
    }

    /// Total chunk count, if the uploader knows it
    fn total_chunks(&self) -> Option<usize> {
        None
    }
}
