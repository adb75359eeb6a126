use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::errors::AgentError;
use crate::messages::out_of_band::{Invitation, OobService, Service};
use crate::messages::{AriesMessage, Attachment};
use crate::protocols::out_of_band::attachment_id;

use super::types::{OutOfBandConfig, OutOfBandSenderEntityAccessor};

/// OutOfBandSender holds an invitation under construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct OutOfBandSender {
    pub(crate) source_id: String,
    pub(crate) invitation: Invitation,
    pub(crate) finalized: bool,
}

impl OutOfBandSender {
    pub fn new(source_id: String, config: OutOfBandConfig) -> Self {
        let mut invitation = Invitation::new();
        invitation.label = config.label;
        invitation.goal_code = config.goal_code;
        invitation.goal = config.goal;
        invitation.handshake_protocols = config.handshake_protocols;

        Self {
            source_id,
            invitation,
            finalized: false,
        }
    }

    pub fn append_message(&self, message: &AriesMessage) -> Result<Self, AgentError> {
        self.require_open()?;

        if !matches!(
            message,
            AriesMessage::CredentialOffer(_) | AriesMessage::PresentationRequest(_)
        ) {
            return Err(AgentError::ActionNotSupported(format!(
                "{} cannot be attached to an out-of-band invitation",
                message.name()
            )));
        }

        let mut next = self.clone();
        let requests = next.invitation.requests_attach.get_or_insert_with(Vec::new);
        requests.push(Attachment::from_json(&attachment_id(requests.len()), message)?);
        Ok(next)
    }

    pub fn append_service(&self, service: Service) -> Result<Self, AgentError> {
        self.require_open()?;

        if service.recipient_keys.is_empty() || service.service_endpoint.is_empty() {
            return Err(AgentError::ValidationError(
                "service needs recipient keys and an endpoint".to_string(),
            ));
        }

        let mut next = self.clone();
        next.invitation.services.push(OobService::Inline(service));
        Ok(next)
    }

    pub fn append_service_did(&self, did: String) -> Result<Self, AgentError> {
        self.require_open()?;

        if did.is_empty() {
            return Err(AgentError::ValidationError("service did is empty".to_string()));
        }

        let mut next = self.clone();
        next.invitation.services.push(OobService::Did(did));
        Ok(next)
    }

    /// adopt_thread renames the invitation after the connection it advertises
    pub fn adopt_thread(&self, thread_id: String) -> Result<Self, AgentError> {
        self.require_open()?;

        let mut next = self.clone();
        next.invitation.id = thread_id;
        Ok(next)
    }

    pub fn finalize(&self) -> Result<(Self, AriesMessage), AgentError> {
        if self.invitation.services.is_empty() {
            return Err(AgentError::ValidationError(format!(
                "out-of-band {} has no service to reach its sender",
                self.source_id
            )));
        }

        let has_requests = self
            .invitation
            .requests_attach
            .as_ref()
            .map(|requests| !requests.is_empty())
            .unwrap_or(false);

        if !has_requests && self.invitation.handshake_protocols.is_none() {
            return Err(AgentError::ValidationError(format!(
                "out-of-band {} carries neither a request nor a handshake",
                self.source_id
            )));
        }

        let mut next = self.clone();
        next.finalized = true;
        Ok((next, AriesMessage::OutOfBandInvitation(self.invitation.clone())))
    }

    fn require_open(&self) -> Result<(), AgentError> {
        if self.finalized {
            return Err(AgentError::InvalidState(format!(
                "out-of-band {} is already finalized",
                self.source_id
            )));
        }

        Ok(())
    }
}

impl OutOfBandSenderEntityAccessor for OutOfBandSender {
    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_thread_id(&self) -> String {
        self.invitation.id.to_owned()
    }

    fn get_invitation(&self) -> Invitation {
        self.invitation.clone()
    }

    fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl ToJSON for OutOfBandSender {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for OutOfBandSender {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for OutOfBandSender {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::messages::out_of_band::GoalCode;
    use crate::messages::presentation::PresentationRequest;
    use crate::messages::trust_ping::Ping;

    fn request_message() -> AriesMessage {
        let attachment = Attachment::from_json("libindy-request-presentation-0", &"{}").unwrap();
        AriesMessage::PresentationRequest(PresentationRequest::new(None, attachment))
    }

    fn sender() -> OutOfBandSender {
        OutOfBandSender::new(
            "oob".to_string(),
            OutOfBandConfig {
                label: Some("faber".to_string()),
                goal_code: Some(GoalCode::RequestProof),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_append_then_finalize() {
        let sender = sender()
            .append_message(&request_message())
            .unwrap()
            .append_service(Service::new(
                vec!["faber-key".to_string()],
                "http://faber".to_string(),
            ))
            .unwrap();

        let (finalized, message) = sender.finalize().unwrap();
        let invitation = match message {
            AriesMessage::OutOfBandInvitation(invitation) => invitation,
            other => panic!("unexpected {:?}", other),
        };

        let requests = invitation.requests_attach.unwrap();
        assert_eq!(requests[0].id, "request-0".to_string());
        assert_eq!(requests[0].decode::<AriesMessage>().unwrap(), request_message());

        let late = finalized.append_service_did("did:sov:faber".to_string());
        assert!(matches!(late, Err(AgentError::InvalidState(_))));
    }

    #[test]
    fn test_append_rejects_unsupported_message() {
        let ping = AriesMessage::Ping(Ping::new(true, None));
        let appended = sender().append_message(&ping);
        assert!(matches!(appended, Err(AgentError::ActionNotSupported(_))));
    }

    #[test]
    fn test_finalize_requires_service_and_payload() {
        let no_service = sender().append_message(&request_message()).unwrap();
        assert!(matches!(
            no_service.finalize(),
            Err(AgentError::ValidationError(_))
        ));

        let empty = sender()
            .append_service_did("did:sov:faber".to_string())
            .unwrap();
        assert!(matches!(empty.finalize(), Err(AgentError::ValidationError(_))));
    }
}
