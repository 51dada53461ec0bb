use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag name used to record the payload's media type on a transaction
pub const CONTENT_TYPE_TAG: &str = "Content-Type";

/// Media type used when the caller does not name one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Identifier assigned to a transaction when it is signed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<&TransactionId> for TransactionId {
    fn from(id: &TransactionId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Data handed to [`crate::WeaveManager::upload`].
///
/// Text is encoded as UTF-8 once, before the transaction is created, and the
/// same bytes are kept for any later resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Bytes),
    Text(String),
}

impl Payload {
    /// The exact bytes that get hashed, chunked and uploaded
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => Bytes::from(text.into_bytes()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Serializable snapshot of a chunk uploader's progress.
///
/// Mirrors the network's serialized uploader: which chunk is next, whether the
/// transaction header was posted, and the last response seen. The transaction
/// body is opaque to this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderState {
    pub chunk_index: usize,
    pub tx_posted: bool,
    #[serde(default)]
    pub transaction: serde_json::Value,
    #[serde(default)]
    pub last_request_time_end: i64,
    #[serde(default)]
    pub last_response_status: u16,
    #[serde(default)]
    pub last_response_error: String,
}

/// Recovery ledger entry for one in-flight transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub transaction_id: TransactionId,
    pub uploader: UploaderState,
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadRecord {
    pub fn new(
        transaction_id: TransactionId,
        uploader: UploaderState,
        data: Bytes,
        content_type: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            transaction_id,
            uploader,
            data,
            content_type: content_type.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the uploader snapshot after progress was made
    pub fn with_uploader(mut self, uploader: UploaderState) -> Self {
        self.uploader = uploader;
        self.updated_at = Utc::now();
        self
    }
}

/// Status reported by the network for a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub status: Option<u16>,
    pub confirmed: Option<Confirmation>,
}

impl TransactionStatus {
    pub fn new(status: u16) -> Self {
        Self {
            status: Some(status),
            confirmed: None,
        }
    }

    pub fn with_confirmation(mut self, confirmed: Confirmation) -> Self {
        self.confirmed = Some(confirmed);
        self
    }
}

/// Block inclusion details for a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub block_height: u64,
    pub block_indep_hash: String,
    pub number_of_confirmations: u64,
}

/// JSON Web Key used to create and sign transactions.
///
/// Only the public members are named; private members are carried along in
/// `private` and never printed.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub kty: String,
    pub e: String,
    pub n: String,
    #[serde(flatten)]
    pub private: BTreeMap<String, serde_json::Value>,
}

impl Wallet {
    pub fn new<S: Into<String>>(kty: S, e: S, n: S) -> Self {
        Self {
            kty: kty.into(),
            e: e.into(),
            n: n.into(),
            private: BTreeMap::new(),
        }
    }

    /// Parse a JWK from its JSON form
    pub fn from_json(json: &str) -> crate::WeaveResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn has_private_key(&self) -> bool {
        self.private.contains_key("d")
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("kty", &self.kty)
            .field("e", &self.e)
            .field("n", &self.n)
            .field("private", &format_args!("<{} redacted>", self.private.len()))
            .finish()
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
