use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::errors::AgentError;
use crate::messages::connection::Invitation as ConnectionInvitation;
use crate::messages::out_of_band::{HandshakeProtocol, Invitation, OobService};
use crate::messages::AriesMessage;

use super::types::OutOfBandReceiverEntityAccessor;

/// OutOfBandReceiver holds an invitation received from another agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct OutOfBandReceiver {
    pub(crate) source_id: String,
    pub(crate) invitation: Invitation,
}

impl OutOfBandReceiver {
    pub fn new(source_id: String, message: AriesMessage) -> Result<Self, AgentError> {
        match message {
            AriesMessage::OutOfBandInvitation(invitation) => Ok(Self {
                source_id,
                invitation,
            }),
            other => Err(AgentError::ValidationError(format!(
                "expected an out-of-band invitation, got {}",
                other.name()
            ))),
        }
    }

    pub fn extract(&self) -> Result<Option<AriesMessage>, AgentError> {
        match self
            .invitation
            .requests_attach
            .as_ref()
            .and_then(|requests| requests.first())
        {
            Some(attachment) => Ok(Some(attachment.decode()?)),
            None => Ok(None),
        }
    }

    /// is_sender tells whether a peer identified by its verkey or DID published
    /// this invitation
    pub fn is_sender(&self, their_verkey: Option<&str>, their_did: Option<&str>) -> bool {
        self.invitation.services.iter().any(|service| match service {
            OobService::Inline(service) => their_verkey
                .map(|verkey| service.recipient_keys.iter().any(|key| key == verkey))
                .unwrap_or(false),
            OobService::Did(did) => their_did
                .map(|their| did == their || did.ends_with(&format!(":{}", their)))
                .unwrap_or(false),
        })
    }

    /// handshake_invitation derives the connection invitation for the sender's most
    /// preferred handshake, the connection thread is the out-of-band id
    pub fn handshake_invitation(
        &self,
    ) -> Result<(ConnectionInvitation, HandshakeProtocol), AgentError> {
        let protocols = self.invitation.handshake_protocols.as_ref().ok_or_else(|| {
            AgentError::ActionNotSupported(format!(
                "out-of-band {} advertises no handshake",
                self.invitation.id
            ))
        })?;

        let handshake = protocols.first().copied().ok_or_else(|| {
            AgentError::ActionNotSupported(format!(
                "out-of-band {} lists an empty handshake",
                self.invitation.id
            ))
        })?;

        let service = self
            .invitation
            .services
            .iter()
            .find_map(|service| match service {
                OobService::Inline(service) => Some(service.clone()),
                OobService::Did(_) => None,
            })
            .ok_or_else(|| {
                AgentError::ActionNotSupported(
                    "resolving a public did service is not supported".to_string(),
                )
            })?;

        let invitation = ConnectionInvitation {
            id: self.invitation.id.clone(),
            label: self.invitation.label.clone().unwrap_or_default(),
            recipient_keys: service.recipient_keys,
            routing_keys: service.routing_keys,
            service_endpoint: service.service_endpoint,
        };

        Ok((invitation, handshake))
    }
}

impl OutOfBandReceiverEntityAccessor for OutOfBandReceiver {
    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_thread_id(&self) -> String {
        self.invitation.id.to_owned()
    }

    fn get_invitation(&self) -> Invitation {
        self.invitation.clone()
    }
}

impl ToJSON for OutOfBandReceiver {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for OutOfBandReceiver {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for OutOfBandReceiver {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}
