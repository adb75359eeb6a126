use std::fmt::Debug;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use crate::anoncreds::credential::Credential;
use crate::errors::AgentError;

/// UnpackedMessage is the plaintext of an envelope along with the keys it was packed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct UnpackedMessage {
    pub message: Vec<u8>,
    pub sender_verkey: Option<String>,
    pub recipient_verkey: String,
}

/// CredentialRecord is a credential held in the wallet, addressed by its referent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialRecord {
    pub referent: String,
    pub credential: Credential,
}

impl CredentialRecord {
    pub fn new(credential: Credential) -> Self {
        Self {
            referent: Uuid::new_v4().to_string(),
            credential,
        }
    }
}

/// WalletBuilder is the secure storage holding keys and credentials
#[async_trait]
pub trait WalletBuilder: Clone + Sync + Send {
    /// create_and_store_my_did generates a new pairwise key, returning `(did, verkey)`
    async fn create_and_store_my_did(&self) -> Result<(String, String), AgentError>;

    async fn sign(&self, verkey: String, data: Vec<u8>) -> Result<Vec<u8>, AgentError>;

    /// verify checks `signature` over `data`, both buffers are distinct inputs
    async fn verify(
        &self,
        verkey: String,
        data: Vec<u8>,
        signature: Vec<u8>,
    ) -> Result<bool, AgentError>;

    async fn pack_message(
        &self,
        sender_verkey: Option<String>,
        recipient_keys: Vec<String>,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError>;

    async fn unpack_message(&self, packed: Vec<u8>) -> Result<UnpackedMessage, AgentError>;

    async fn store_credential(&self, record: CredentialRecord) -> Result<(), AgentError>;
    async fn get_credential(&self, referent: String) -> Result<CredentialRecord, AgentError>;
    async fn list_credentials(&self) -> Result<Vec<CredentialRecord>, AgentError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum RecordKind {
    Schema,
    CredentialDefinition,
    RevocationRegistryDefinition,
}

/// TxnReceipt is the ledger's acknowledgement of a write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct TxnReceipt {
    pub seq_no: u64,
    pub timestamp: i64,
}

/// LedgerDelta is a revocation registry delta anchored at a ledger timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct LedgerDelta {
    pub timestamp: i64,
    pub data: String,
}

/// LedgerBuilder reads and writes public anchored objects
///
/// Records are opaque JSON documents addressed by kind and id. Reads are eventually
/// consistent, callers must not assume a write is visible on the next read.
#[async_trait]
pub trait LedgerBuilder: Clone + Sync + Send {
    async fn write_record(
        &self,
        kind: RecordKind,
        id: String,
        data: String,
    ) -> Result<TxnReceipt, AgentError>;

    async fn read_record(&self, kind: RecordKind, id: String) -> Result<String, AgentError>;

    async fn write_rev_reg_delta(
        &self,
        rev_reg_id: String,
        data: String,
    ) -> Result<TxnReceipt, AgentError>;

    /// read_rev_reg_deltas returns every delta at or before `to`, oldest first
    async fn read_rev_reg_deltas(
        &self,
        rev_reg_id: String,
        to: i64,
    ) -> Result<Vec<LedgerDelta>, AgentError>;

    /// current_time is the ledger clock in unix seconds
    async fn current_time(&self) -> Result<i64, AgentError>;
}

/// Envelope is an opaque packed message addressed to a recipient key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Envelope {
    pub id: String,
    pub recipient_verkey: String,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(recipient_verkey: String, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient_verkey,
            payload,
        }
    }
}

/// TransportBuilder delivers envelopes and exposes a mailbox per recipient key
///
/// Delivery is at-least-once, an envelope stays in the mailbox until acknowledged.
#[async_trait]
pub trait TransportBuilder: Clone + Sync + Send {
    async fn send(&self, endpoint: String, envelope: Envelope) -> Result<(), AgentError>;
    async fn receive(&self, recipient_verkey: String) -> Result<Vec<Envelope>, AgentError>;
    async fn acknowledge(
        &self,
        recipient_verkey: String,
        envelope_id: String,
    ) -> Result<(), AgentError>;
}

/// TailsFetcherBuilder retrieves a tails file from its published location
#[async_trait]
pub trait TailsFetcherBuilder: Clone + Sync + Send {
    async fn fetch(&self, location: String) -> Result<Vec<u8>, AgentError>;
}

/// ProfileBuilder bundles the collaborators of a single agent
pub trait ProfileBuilder: Clone + Debug + Sync + Send + 'static {
    type WalletImplementer: WalletBuilder + 'static;
    type LedgerImplementer: LedgerBuilder + 'static;
    type TransportImplementer: TransportBuilder + 'static;
    type TailsImplementer: TailsFetcherBuilder + 'static;

    fn wallet(&self) -> Self::WalletImplementer;
    fn ledger(&self) -> Self::LedgerImplementer;
    fn transport(&self) -> Self::TransportImplementer;
    fn tails(&self) -> Self::TailsImplementer;
}
