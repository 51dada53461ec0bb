//! # dog-weave: Resumable uploads to permanent weave storage
//!
//! `dog-weave` drives a transaction through the permanent storage network's
//! upload lifecycle (create, tag, sign, chunked upload, confirmation) and keeps
//! a recovery ledger so a failed upload can be finished later without sending
//! the data again.
//!
//! ## Key Features
//!
//! - **Checkpoint before risk**: the uploader snapshot and payload bytes are
//!   recorded before the first chunk is sent
//! - **Transparent rate limiting**: 429s during chunk upload and status polling
//!   are waited out with a long backoff
//! - **Typed failures**: verification failures carry the transaction id and
//!   are distinct from rejected (4xx), failed (5xx) and unknown statuses
//! - **Cancellation everywhere**: every network call and sleep honours a
//!   `CancellationToken`
//! - **Client agnostic**: the network client, signing and wire format sit
//!   behind the [`WeaveClient`] trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dog_weave::prelude::*;
//!
//! # async fn run(client: impl WeaveClient) -> WeaveResult<()> {
//! let wallet = Wallet::from_json(&std::fs::read_to_string("wallet.json").unwrap())?;
//! let manager = WeaveManager::new(client, wallet, WeaveConfig::from_env("DOGWEAVE")?);
//!
//! match manager.upload("<html>...</html>", Some("text/html")).await {
//!     Ok(id) => println!("stored as {id}"),
//!     Err(err) if err.is_verification_error() => {
//!         // chunks are still in the ledger; try again later
//!         let id = err.transaction_id().cloned().unwrap();
//!         manager.resume(id.clone()).await?;
//!         manager.confirm(id).await?;
//!     }
//!     Err(err) => return Err(err),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Your Service   │  ← Business logic only
//! ├─────────────────┤
//! │  WeaveManager   │  ← Upload / resume / confirm
//! ├────────┬────────┤
//! │ Ledger │ Client │  ← Recovery state / network
//! └────────┴────────┘
//! ```

pub mod backoff;
mod client;
mod config;
mod error;
pub mod ledger;
mod manager;
pub mod poller;
pub mod status;
mod types;

// Re-export main types for clean API
pub use backoff::{Backoff, Sleeper, TokioSleeper};
pub use client::{ChunkUploader, WeaveClient, WeaveTransaction};
pub use config::WeaveConfig;
pub use error::{is_verification_error, ClientError, ClientResult, WeaveError, WeaveResult};
pub use ledger::{LedgerSnapshot, MemoryRecoveryLedger, RecoveryLedger};
pub use manager::WeaveManager;
pub use status::StatusClass;
pub use types::{
    Confirmation, Payload, TransactionId, TransactionStatus, UploadRecord, UploaderState, Wallet,
    CONTENT_TYPE_TAG, DEFAULT_CONTENT_TYPE,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        is_verification_error, Payload, RecoveryLedger, TransactionId, Wallet, WeaveClient,
        WeaveConfig, WeaveError, WeaveManager, WeaveResult,
    };
}
