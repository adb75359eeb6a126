use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use super::{Attachment, Thread, PROTOCOL_CONNECTIONS, PROTOCOL_DIDEXCHANGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum GoalCode {
    #[serde(rename = "issue-vc")]
    IssueVC,

    #[serde(rename = "request-proof")]
    RequestProof,

    #[serde(rename = "create-account")]
    CreateAccount,

    #[serde(rename = "p2p-messaging")]
    P2PMessaging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum HandshakeProtocol {
    #[serde(rename = "https://didcomm.org/connections/1.0")]
    ConnectionV1,

    #[serde(rename = "https://didcomm.org/didexchange/1.0")]
    DidExchangeV1,
}

impl Default for HandshakeProtocol {
    fn default() -> Self {
        HandshakeProtocol::ConnectionV1
    }
}

impl HandshakeProtocol {
    pub fn uri(&self) -> &'static str {
        match self {
            HandshakeProtocol::ConnectionV1 => PROTOCOL_CONNECTIONS,
            HandshakeProtocol::DidExchangeV1 => PROTOCOL_DIDEXCHANGE,
        }
    }
}

/// Service is an inline `did-communication` service block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Service {
    pub id: String,

    #[serde(rename = "type")]
    pub service_type: String,

    #[serde(rename = "recipientKeys")]
    pub recipient_keys: Vec<String>,

    #[serde(rename = "routingKeys", default)]
    pub routing_keys: Vec<String>,

    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

impl Service {
    pub fn new(recipient_keys: Vec<String>, service_endpoint: String) -> Self {
        Self {
            id: "#inline".to_string(),
            service_type: "did-communication".to_string(),
            recipient_keys,
            routing_keys: Vec::new(),
            service_endpoint,
        }
    }
}

/// OobService is either a public DID or an inline service block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", untagged)]
pub enum OobService {
    Did(String),
    Inline(Service),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Invitation {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub goal_code: Option<GoalCode>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub goal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub accept: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub handshake_protocols: Option<Vec<HandshakeProtocol>>,

    #[serde(default)]
    pub services: Vec<OobService>,

    #[serde(
        rename = "requests~attach",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub requests_attach: Option<Vec<Attachment>>,
}

impl Invitation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: None,
            goal_code: None,
            goal: None,
            accept: None,
            handshake_protocols: None,
            services: Vec::new(),
            requests_attach: None,
        }
    }
}

impl Default for Invitation {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct HandshakeReuse {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl HandshakeReuse {
    /// The reuse message opens its own thread, the invitation is its parent
    pub fn new(invitation_id: String) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            id: id.clone(),
            thread: Thread::with_parent(id, invitation_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct HandshakeReuseAccepted {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl HandshakeReuseAccepted {
    pub fn new(reuse: &HandshakeReuse) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread: reuse.thread.clone(),
        }
    }
}
