#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use dog_weave::{
    ChunkUploader, ClientError, ClientResult, Confirmation, Sleeper, TransactionId,
    TransactionStatus, UploaderState, Wallet, WeaveClient, WeaveConfig, WeaveManager,
    WeaveTransaction,
};

pub const SIGNED_TRANSACTION_ID: &str = "signed-transaction-id";

pub const HTML_DATA: &str = r#"
<html>
  <head>
    <meta charset="UTF-8">
    <title>Info about arweave</title>
  </head>
  <body>
    Arweave is the best web3-related thing out there!!!
  </body>
</html>"#;

pub fn test_wallet() -> Wallet {
    Wallet::new("", "", "")
}

/// Build a manager over a scripted client whose sleeps return immediately
pub fn setup_manager(client: ScriptedClient) -> (WeaveManager<ScriptedClient>, RecordingSleeper) {
    setup_manager_with_config(client, WeaveConfig::default())
}

pub fn setup_manager_with_config(
    client: ScriptedClient,
    config: WeaveConfig,
) -> (WeaveManager<ScriptedClient>, RecordingSleeper) {
    let sleeper = RecordingSleeper::default();
    let manager = WeaveManager::new(client, test_wallet(), config).with_sleeper(sleeper.clone());
    (manager, sleeper)
}

/// Status response the way the network reports it
pub fn status_response(status: u16) -> TransactionStatus {
    let response = TransactionStatus::new(status);
    if (200..300).contains(&status) {
        response.with_confirmation(Confirmation {
            block_height: 0,
            block_indep_hash: "test-hash".to_string(),
            number_of_confirmations: 0,
        })
    } else {
        response
    }
}

/// Records requested delays without waiting
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Fires a cancellation token the first time it is asked to sleep, then
/// never wakes up
#[derive(Clone)]
pub struct CancellingSleeper {
    pub cancel: CancellationToken,
}

#[async_trait]
impl Sleeper for CancellingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.cancel.cancel();
        std::future::pending::<()>().await
    }
}

/// Counters for every call the manager makes into the client
#[derive(Debug, Default)]
pub struct CallLog {
    pub create_transaction: AtomicUsize,
    pub sign: AtomicUsize,
    pub get_uploader: AtomicUsize,
    pub resume_uploader: AtomicUsize,
    pub upload_chunk: AtomicUsize,
    pub get_status: AtomicUsize,
}

impl CallLog {
    pub fn total(&self) -> usize {
        [
            &self.create_transaction,
            &self.sign,
            &self.get_uploader,
            &self.resume_uploader,
            &self.upload_chunk,
            &self.get_status,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

#[derive(Default)]
struct Script {
    chunks: VecDeque<ClientResult<()>>,
    statuses: VecDeque<ClientResult<TransactionStatus>>,
    last_status: Option<ClientResult<TransactionStatus>>,
}

struct Shared {
    calls: CallLog,
    script: Mutex<Script>,
    tags: Mutex<Vec<(String, String)>>,
    created_with: Mutex<Vec<(Bytes, Wallet)>>,
    resumed_with: Mutex<Vec<(UploaderState, Bytes)>>,
    total_chunks: usize,
    unique_ids: bool,
    leave_unsigned: bool,
    next_id: AtomicUsize,
}

/// In-memory stand-in for the network client.
///
/// Chunk outcomes are consumed one per `upload_chunk` call and default to
/// success once the script runs out. Status responses are consumed in order
/// and the last one repeats.
#[derive(Clone)]
pub struct ScriptedClient {
    shared: Arc<Shared>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::build(1, false, false)
    }

    /// Transactions split into `total` chunks
    pub fn with_chunks(total: usize) -> Self {
        Self::build(total, false, false)
    }

    /// Every signed transaction gets a distinct id
    pub fn with_unique_ids() -> Self {
        Self::build(1, true, false)
    }

    /// Signing "succeeds" but assigns no id
    pub fn unsigned() -> Self {
        Self::build(1, false, true)
    }

    fn build(total_chunks: usize, unique_ids: bool, leave_unsigned: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                calls: CallLog::default(),
                script: Mutex::new(Script::default()),
                tags: Mutex::new(Vec::new()),
                created_with: Mutex::new(Vec::new()),
                resumed_with: Mutex::new(Vec::new()),
                total_chunks,
                unique_ids,
                leave_unsigned,
                next_id: AtomicUsize::new(0),
            }),
        }
    }

    /// Queue the outcome of the next chunk uploads, by HTTP status
    pub fn script_chunks(self, statuses: &[u16]) -> Self {
        {
            let mut script = self.shared.script.lock().unwrap();
            for &status in statuses {
                script.chunks.push_back(if (200..300).contains(&status) {
                    Ok(())
                } else {
                    Err(ClientError::from_status(status))
                });
            }
        }
        self
    }

    /// Queue a raw chunk failure
    pub fn script_chunk_error(self, error: ClientError) -> Self {
        self.shared.script.lock().unwrap().chunks.push_back(Err(error));
        self
    }

    /// Queue status responses
    pub fn script_statuses(self, statuses: &[u16]) -> Self {
        {
            let mut script = self.shared.script.lock().unwrap();
            for &status in statuses {
                script.statuses.push_back(Ok(status_response(status)));
            }
        }
        self
    }

    /// Queue a raw status response
    pub fn script_status(self, response: ClientResult<TransactionStatus>) -> Self {
        self.shared.script.lock().unwrap().statuses.push_back(response);
        self
    }

    pub fn calls(&self) -> &CallLog {
        &self.shared.calls
    }

    pub fn tags(&self) -> Vec<(String, String)> {
        self.shared.tags.lock().unwrap().clone()
    }

    pub fn created_with(&self) -> Vec<(Bytes, Wallet)> {
        self.shared.created_with.lock().unwrap().clone()
    }

    pub fn resumed_with(&self) -> Vec<(UploaderState, Bytes)> {
        self.shared.resumed_with.lock().unwrap().clone()
    }

    fn next_chunk(&self) -> ClientResult<()> {
        self.shared
            .script
            .lock()
            .unwrap()
            .chunks
            .pop_front()
            .unwrap_or(Ok(()))
    }

    fn next_status(&self) -> ClientResult<TransactionStatus> {
        let mut script = self.shared.script.lock().unwrap();
        match script.statuses.pop_front() {
            Some(response) => {
                script.last_status = Some(response.clone());
                response
            }
            None => script
                .last_status
                .clone()
                .unwrap_or_else(|| Ok(status_response(200))),
        }
    }
}

pub struct ScriptedTransaction {
    id: Option<TransactionId>,
    shared: Arc<Shared>,
}

impl WeaveTransaction for ScriptedTransaction {
    fn add_tag(&mut self, name: &str, value: &str) {
        self.shared
            .tags
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
    }

    fn id(&self) -> Option<TransactionId> {
        self.id.clone()
    }
}

pub struct ScriptedUploader {
    client: ScriptedClient,
    transaction_id: TransactionId,
    chunk_index: usize,
    tx_posted: bool,
    last_response_status: u16,
    last_response_error: String,
}

#[async_trait]
impl ChunkUploader for ScriptedUploader {
    fn is_complete(&self) -> bool {
        self.tx_posted && self.chunk_index >= self.client.shared.total_chunks
    }

    async fn upload_chunk(&mut self) -> ClientResult<()> {
        self.client
            .shared
            .calls
            .upload_chunk
            .fetch_add(1, Ordering::SeqCst);
        match self.client.next_chunk() {
            Ok(()) => {
                self.tx_posted = true;
                self.chunk_index += 1;
                self.last_response_status = 200;
                self.last_response_error.clear();
                Ok(())
            }
            Err(err) => {
                self.last_response_status = err.status.unwrap_or_default();
                self.last_response_error = err.message.clone();
                Err(err)
            }
        }
    }

    fn state(&self) -> UploaderState {
        UploaderState {
            chunk_index: self.chunk_index,
            tx_posted: self.tx_posted,
            transaction: serde_json::json!({ "id": self.transaction_id.as_str() }),
            last_request_time_end: 0,
            last_response_status: self.last_response_status,
            last_response_error: self.last_response_error.clone(),
        }
    }

    fn total_chunks(&self) -> Option<usize> {
        Some(self.client.shared.total_chunks)
    }
}

#[async_trait]
impl WeaveClient for ScriptedClient {
    type Transaction = ScriptedTransaction;
    type Uploader = ScriptedUploader;

    async fn create_transaction(
        &self,
        data: Bytes,
        wallet: &Wallet,
    ) -> ClientResult<ScriptedTransaction> {
        self.shared
            .calls
            .create_transaction
            .fetch_add(1, Ordering::SeqCst);
        self.shared
            .created_with
            .lock()
            .unwrap()
            .push((data, wallet.clone()));
        Ok(ScriptedTransaction {
            id: None,
            shared: self.shared.clone(),
        })
    }

    async fn sign(&self, transaction: &mut ScriptedTransaction, _wallet: &Wallet) -> ClientResult<()> {
        self.shared.calls.sign.fetch_add(1, Ordering::SeqCst);
        if self.shared.leave_unsigned {
            return Ok(());
        }
        let id = if self.shared.unique_ids {
            let n = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
            format!("{SIGNED_TRANSACTION_ID}-{n}")
        } else {
            SIGNED_TRANSACTION_ID.to_string()
        };
        transaction.id = Some(TransactionId::from(id));
        Ok(())
    }

    async fn get_uploader(&self, transaction: &ScriptedTransaction) -> ClientResult<ScriptedUploader> {
        self.shared.calls.get_uploader.fetch_add(1, Ordering::SeqCst);
        let transaction_id = transaction
            .id
            .clone()
            .ok_or_else(|| ClientError::new("transaction is not signed"))?;
        Ok(ScriptedUploader {
            client: self.clone(),
            transaction_id,
            chunk_index: 0,
            tx_posted: false,
            last_response_status: 0,
            last_response_error: String::new(),
        })
    }

    async fn resume_uploader(
        &self,
        state: &UploaderState,
        data: Bytes,
    ) -> ClientResult<ScriptedUploader> {
        self.shared
            .calls
            .resume_uploader
            .fetch_add(1, Ordering::SeqCst);
        self.shared
            .resumed_with
            .lock()
            .unwrap()
            .push((state.clone(), data));
        let transaction_id = state.transaction["id"]
            .as_str()
            .map(TransactionId::from)
            .ok_or_else(|| ClientError::new("serialized uploader has no transaction"))?;
        Ok(ScriptedUploader {
            client: self.clone(),
            transaction_id,
            chunk_index: state.chunk_index,
            tx_posted: state.tx_posted,
            last_response_status: state.last_response_status,
            last_response_error: state.last_response_error.clone(),
        })
    }

    async fn get_status(&self, _transaction_id: &TransactionId) -> ClientResult<TransactionStatus> {
        self.shared.calls.get_status.fetch_add(1, Ordering::SeqCst);
        self.next_status()
    }
}
