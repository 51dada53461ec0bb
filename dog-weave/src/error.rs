use thiserror::Error;

use crate::TransactionId;

/// Result type for weave operations
pub type WeaveResult<T> = Result<T, WeaveError>;

/// Result type returned by network client collaborators
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while uploading, resuming or confirming a transaction
#[derive(Error, Debug)]
pub enum WeaveError {
    #[error("Transaction ID not found: {transaction_id}")]
    TransactionNotFound { transaction_id: TransactionId },

    /// A chunk failed to upload. The ledger still holds the transaction, so
    /// it can be resumed.
    #[error("Transaction {transaction_id} failed verification: {source}")]
    Verification {
        transaction_id: TransactionId,
        #[source]
        source: ClientError,
    },

    #[error("Invalid weave transaction {transaction_id}: {status}")]
    InvalidTransaction {
        transaction_id: TransactionId,
        status: u16,
    },

    #[error("Weave transaction error {transaction_id}: {status}")]
    TransactionFailed {
        transaction_id: TransactionId,
        status: u16,
    },

    #[error("Unhandled weave status for {transaction_id}: {}", display_status(.status))]
    UnhandledStatus {
        transaction_id: TransactionId,
        status: Option<u16>,
    },

    #[error("Gave up waiting for confirmation of {transaction_id} (last status: {})", display_status(.last_status))]
    ConfirmationTimeout {
        transaction_id: TransactionId,
        last_status: Option<u16>,
    },

    #[error("Operation cancelled{}", cancelled_suffix(.transaction_id))]
    Cancelled { transaction_id: Option<TransactionId> },

    #[error("Transaction has no id after signing")]
    Unsigned,

    #[error("Network client error: {source}")]
    Client {
        #[from]
        source: ClientError,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

fn cancelled_suffix(transaction_id: &Option<TransactionId>) -> String {
    transaction_id
        .as_ref()
        .map(|id| format!(" for {id}"))
        .unwrap_or_default()
}

impl WeaveError {
    /// Create a not found error for a transaction missing from the ledger
    pub fn not_found(transaction_id: impl Into<TransactionId>) -> Self {
        Self::TransactionNotFound {
            transaction_id: transaction_id.into(),
        }
    }

    /// Create a verification error for a failed chunk upload
    pub fn verification(transaction_id: impl Into<TransactionId>, source: ClientError) -> Self {
        Self::Verification {
            transaction_id: transaction_id.into(),
            source,
        }
    }

    /// Create a cancellation error
    pub fn cancelled(transaction_id: Option<TransactionId>) -> Self {
        Self::Cancelled { transaction_id }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when this error is a chunk verification failure that carries a
    /// transaction id, i.e. the upload can be resumed from the ledger.
    pub fn is_verification_error(&self) -> bool {
        matches!(self, Self::Verification { transaction_id, .. } if !transaction_id.as_str().is_empty())
    }

    /// The resumable transaction id, if this is a verification failure
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            Self::Verification { transaction_id, .. } if !transaction_id.as_str().is_empty() => {
                Some(transaction_id)
            }
            _ => None,
        }
    }

    /// Status code reported by the network, for status-classified failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidTransaction { status, .. } | Self::TransactionFailed { status, .. } => {
                Some(*status)
            }
            Self::UnhandledStatus { status, .. } => *status,
            Self::ConfirmationTimeout { last_status, .. } => *last_status,
            _ => None,
        }
    }
}

/// Free-standing form of [`WeaveError::is_verification_error`]
pub fn is_verification_error(error: &WeaveError) -> bool {
    error.is_verification_error()
}

/// Failure reported by the network client (chunk upload, status query, ...)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClientError {
    pub message: String,
    /// HTTP status of the failed request, when the client knows it
    pub status: Option<u16>,
}

impl ClientError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Build an error from an HTTP status alone
    pub fn from_status(status: u16) -> Self {
        Self::new(status.to_string()).with_status(status)
    }

    /// True when the network asked us to slow down (HTTP 429).
    ///
    /// Some clients only surface the status inside the message text, so the
    /// message is checked too.
    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(429) || self.message.contains("429")
    }
}
