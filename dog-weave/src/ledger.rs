use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{TransactionId, UploadRecord, UploaderState, WeaveResult};

/// Recovery ledger: transaction id -> uploader snapshot + original bytes.
///
/// An id is present exactly while its chunks are not all uploaded. Each
/// operation touches a single key and must be atomic for that key, so many
/// uploads can share one ledger.
#[async_trait]
pub trait RecoveryLedger: Send + Sync {
    /// Register a transaction, replacing any entry with the same id
    async fn insert(&self, record: UploadRecord) -> WeaveResult<()>;

    /// Look up a transaction's recoverable state
    async fn get(&self, transaction_id: &TransactionId) -> WeaveResult<Option<UploadRecord>>;

    /// Refresh the uploader snapshot of an existing entry.
    /// Returns false if the entry is gone.
    async fn update_uploader(
        &self,
        transaction_id: &TransactionId,
        uploader: UploaderState,
    ) -> WeaveResult<bool>;

    /// Evict a transaction, returning the removed entry
    async fn remove(&self, transaction_id: &TransactionId) -> WeaveResult<Option<UploadRecord>>;

    /// Ids of every in-flight transaction
    async fn transaction_ids(&self) -> WeaveResult<Vec<TransactionId>>;

    /// Copy of every entry
    async fn records(&self) -> WeaveResult<Vec<UploadRecord>>;

    async fn contains(&self, transaction_id: &TransactionId) -> WeaveResult<bool> {
        Ok(self.get(transaction_id).await?.is_some())
    }

    async fn len(&self) -> WeaveResult<usize> {
        Ok(self.transaction_ids().await?.len())
    }

    async fn is_empty(&self) -> WeaveResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Export every entry so a caller can persist it outside the process
    async fn snapshot(&self) -> WeaveResult<LedgerSnapshot> {
        let mut records = self.records().await?;
        records.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
        Ok(LedgerSnapshot {
            version: LedgerSnapshot::VERSION,
            exported_at: Utc::now(),
            records,
        })
    }

    /// Load entries from a snapshot. Existing entries win over imported ones;
    /// returns how many entries were added.
    async fn restore(&self, snapshot: LedgerSnapshot) -> WeaveResult<usize> {
        let mut restored = 0;
        for record in snapshot.records {
            if self.contains(&record.transaction_id).await? {
                tracing::debug!(transaction_id = %record.transaction_id, "keeping existing ledger entry");
                continue;
            }
            self.insert(record).await?;
            restored += 1;
        }
        Ok(restored)
    }
}

/// Portable export of a recovery ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub records: Vec<UploadRecord>,
}

impl LedgerSnapshot {
    pub const VERSION: u32 = 1;

    pub fn to_json(&self) -> WeaveResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> WeaveResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// In-process ledger. Entries live as long as the process does.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecoveryLedger {
    records: Arc<DashMap<TransactionId, UploadRecord>>,
}

impl MemoryRecoveryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecoveryLedger for MemoryRecoveryLedger {
    async fn insert(&self, record: UploadRecord) -> WeaveResult<()> {
        self.records.insert(record.transaction_id.clone(), record);
        Ok(())
    }

    async fn get(&self, transaction_id: &TransactionId) -> WeaveResult<Option<UploadRecord>> {
        Ok(self.records.get(transaction_id).map(|entry| entry.value().clone()))
    }

    async fn update_uploader(
        &self,
        transaction_id: &TransactionId,
        uploader: UploaderState,
    ) -> WeaveResult<bool> {
        match self.records.get_mut(transaction_id) {
            Some(mut entry) => {
                let record = entry.value_mut();
                record.uploader = uploader;
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, transaction_id: &TransactionId) -> WeaveResult<Option<UploadRecord>> {
        Ok(self.records.remove(transaction_id).map(|(_, record)| record))
    }

    async fn transaction_ids(&self) -> WeaveResult<Vec<TransactionId>> {
        Ok(self.records.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn records(&self) -> WeaveResult<Vec<UploadRecord>> {
        Ok(self.records.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn contains(&self, transaction_id: &TransactionId) -> WeaveResult<bool> {
        Ok(self.records.contains_key(transaction_id))
    }

    async fn len(&self) -> WeaveResult<usize> {
        Ok(self.records.len())
    }
}
