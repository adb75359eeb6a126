use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::collaborators::{CredentialRecord, UnpackedMessage, WalletBuilder};
use crate::errors::AgentError;

/// PackedEnvelope is the wire form of a packed message
///
/// The payload is signed by the sender key when one is given, it is not encrypted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
struct PackedEnvelope {
    recipient_keys: Vec<String>,
    sender_verkey: Option<String>,
    signature: Option<String>,
    payload: String,
}

/// InMemoryWallet keeps ed25519 keys and credentials in process memory
///
/// A verkey is the base58 public key, the DID is the base58 of its first 16 bytes.
#[derive(Clone, Default)]
pub struct InMemoryWallet {
    keys: Arc<RwLock<HashMap<String, SigningKey>>>,
    credentials: Arc<RwLock<BTreeMap<String, CredentialRecord>>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn has_key(&self, verkey: &str) -> bool {
        self.keys.read().await.contains_key(verkey)
    }

    fn decode_verkey(verkey: &str) -> Result<VerifyingKey, AgentError> {
        let raw = bs58::decode(verkey)
            .into_vec()
            .map_err(|err| AgentError::WalletError(format!("invalid verkey: {}", err)))?;

        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| AgentError::WalletError("invalid verkey length".to_string()))?;

        VerifyingKey::from_bytes(&bytes)
            .map_err(|err| AgentError::WalletError(format!("invalid verkey: {}", err)))
    }
}

#[async_trait]
impl WalletBuilder for InMemoryWallet {
    async fn create_and_store_my_did(&self) -> Result<(String, String), AgentError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public = signing_key.verifying_key().to_bytes();

        let verkey = bs58::encode(public).into_string();
        let did = bs58::encode(&public[..16]).into_string();

        let mut keys = self.keys.write().await;
        keys.insert(verkey.clone(), signing_key);
        Ok((did, verkey))
    }

    async fn sign(&self, verkey: String, data: Vec<u8>) -> Result<Vec<u8>, AgentError> {
        let keys = self.keys.read().await;
        let signing_key = keys
            .get(&verkey)
            .ok_or_else(|| AgentError::WalletError(format!("unknown verkey: {}", verkey)))?;

        Ok(signing_key.sign(&data).to_bytes().to_vec())
    }

    async fn verify(
        &self,
        verkey: String,
        data: Vec<u8>,
        signature: Vec<u8>,
    ) -> Result<bool, AgentError> {
        let verifying_key = Self::decode_verkey(&verkey)?;
        let signature = match Signature::from_slice(&signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };

        Ok(verifying_key.verify(&data, &signature).is_ok())
    }

    async fn pack_message(
        &self,
        sender_verkey: Option<String>,
        recipient_keys: Vec<String>,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError> {
        if recipient_keys.is_empty() {
            return Err(AgentError::WalletError(
                "recipient keys were missing".to_string(),
            ));
        }

        let signature = match sender_verkey.as_ref() {
            Some(verkey) => Some(STANDARD.encode(self.sign(verkey.clone(), payload.clone()).await?)),
            None => None,
        };

        let envelope = PackedEnvelope {
            recipient_keys,
            sender_verkey,
            signature,
            payload: STANDARD.encode(payload),
        };

        serde_json::to_vec(&envelope).map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    async fn unpack_message(&self, packed: Vec<u8>) -> Result<UnpackedMessage, AgentError> {
        let envelope: PackedEnvelope = serde_json::from_slice(&packed)
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        let recipient_verkey = {
            let keys = self.keys.read().await;
            envelope
                .recipient_keys
                .iter()
                .find(|key| keys.contains_key(*key))
                .cloned()
                .ok_or_else(|| {
                    AgentError::WalletError("no recipient key found in wallet".to_string())
                })?
        };

        let message = STANDARD
            .decode(&envelope.payload)
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        if let Some(sender) = envelope.sender_verkey.as_ref() {
            let signature = envelope
                .signature
                .as_ref()
                .ok_or_else(|| AgentError::VerificationFailed("sender signature was missing".to_string()))
                .and_then(|sig| {
                    STANDARD
                        .decode(sig)
                        .map_err(|err| AgentError::SerializationError(err.to_string()))
                })?;

            let verified = self
                .verify(sender.clone(), message.clone(), signature)
                .await?;

            if !verified {
                return Err(AgentError::VerificationFailed(
                    "sender signature mismatch".to_string(),
                ));
            }
        }

        Ok(UnpackedMessage {
            message,
            sender_verkey: envelope.sender_verkey,
            recipient_verkey,
        })
    }

    async fn store_credential(&self, record: CredentialRecord) -> Result<(), AgentError> {
        let mut credentials = self.credentials.write().await;
        credentials.insert(record.referent.clone(), record);
        Ok(())
    }

    async fn get_credential(&self, referent: String) -> Result<CredentialRecord, AgentError> {
        let credentials = self.credentials.read().await;
        credentials
            .get(&referent)
            .cloned()
            .ok_or_else(|| AgentError::NotFound(format!("credential {}", referent)))
    }

    async fn list_credentials(&self) -> Result<Vec<CredentialRecord>, AgentError> {
        let credentials = self.credentials.read().await;
        Ok(credentials.values().cloned().collect())
    }
}
