use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use super::Thread;

/// Invitation is the inviter's out-of-band bootstrap for a pairwise connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Invitation {
    #[serde(rename = "@id")]
    pub id: String,

    pub label: String,

    #[serde(rename = "recipientKeys")]
    pub recipient_keys: Vec<String>,

    #[serde(rename = "routingKeys", default)]
    pub routing_keys: Vec<String>,

    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

impl Invitation {
    pub fn new(label: String, recipient_keys: Vec<String>, service_endpoint: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label,
            recipient_keys,
            routing_keys: Vec::new(),
            service_endpoint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct DidDoc {
    pub id: String,
    pub verkey: String,

    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionData {
    #[serde(rename = "DID")]
    pub did: String,

    #[serde(rename = "DIDDoc")]
    pub did_doc: DidDoc,
}

impl ConnectionData {
    pub fn new(did: String, verkey: String, service_endpoint: String) -> Self {
        Self {
            did: did.clone(),
            did_doc: DidDoc {
                id: did,
                verkey,
                service_endpoint,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Request {
    #[serde(rename = "@id")]
    pub id: String,

    pub label: String,
    pub connection: ConnectionData,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Request {
    pub fn new(label: String, connection: ConnectionData, thid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label,
            connection,
            thread: Thread::new(thid),
        }
    }
}

/// SignatureDecorator is `connection~sig`: `sig_data` is the base64 encoded
/// [`ConnectionData`] and `signature` its base64 ed25519 signature by `signer`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct SignatureDecorator {
    pub signature: String,
    pub sig_data: String,
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Response {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "connection~sig")]
    pub connection_sig: SignatureDecorator,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Response {
    pub fn new(connection_sig: SignatureDecorator, thid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            connection_sig,
            thread: Thread::new(thid),
        }
    }
}
