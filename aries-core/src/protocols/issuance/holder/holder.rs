use std::collections::BTreeMap;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::anoncreds::credential::Credential;
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::issuance::CredentialOffer;
use crate::messages::AriesMessage;
use crate::protocols::issuance::payload::OfferPayload;
use crate::protocols::mailbox::require_thread;

use super::types::{Action, HolderCredentialEntityAccessor, State};

#[derive(Debug, Clone)]
pub struct Transition {
    pub next: HolderCredential,
    pub action: Option<Action>,
}

/// HolderCredential is the holder side of one credential exchange, created from the
/// offer it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct HolderCredential {
    pub(crate) source_id: String,
    pub(crate) state: State,
    pub(crate) thread_id: String,
    pub(crate) connection_handle: Option<Handle>,
    pub(crate) offer: CredentialOffer,
    pub(crate) payload: OfferPayload,
    pub(crate) credential_id: Option<String>,
    pub(crate) credential: Option<Credential>,
    pub(crate) problem: Option<String>,
}

impl HolderCredential {
    pub fn new(source_id: String, offer: CredentialOffer) -> Result<Self, AgentError> {
        let attachment = offer.offers_attach.first().ok_or_else(|| {
            AgentError::ValidationError("credential offer without attachment".to_string())
        })?;
        let payload: OfferPayload = attachment.decode()?;

        Ok(Self {
            source_id,
            state: State::OfferReceived,
            thread_id: offer.id.clone(),
            connection_handle: None,
            offer,
            payload,
            credential_id: None,
            credential: None,
            problem: None,
        })
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.offer.credential_preview.to_values()
    }

    pub fn request_sent(&self, connection_handle: Handle) -> Result<Self, AgentError> {
        self.require_state(State::OfferReceived, "send a request")?;

        let mut next = self.clone();
        next.state = State::RequestSent;
        next.connection_handle = Some(connection_handle);
        Ok(next)
    }

    pub fn declined(&self, comment: Option<String>) -> Result<Self, AgentError> {
        if Self::is_terminal(self.state) {
            return Err(AgentError::InvalidState(format!(
                "holder {} cannot decline in {}",
                self.source_id, self.state
            )));
        }

        let mut next = self.clone();
        next.state = State::Declined;
        next.problem = comment;
        Ok(next)
    }

    pub fn stored(&self, credential_id: String, credential: Credential) -> Self {
        let mut next = self.clone();
        next.state = State::Finished;
        next.credential_id = Some(credential_id);
        next.credential = Some(credential);
        next
    }

    /// transition is the holder table, undefined pairs are
    /// [`AgentError::ProtocolViolation`] with the object untouched
    pub fn transition(&self, message: &AriesMessage) -> Result<Transition, AgentError> {
        require_thread(&self.source_id, Some(&self.thread_id), message)?;

        match (self.state, message) {
            (state, AriesMessage::ProblemReport(report)) if !Self::is_terminal(state) => {
                let mut next = self.clone();
                next.state = State::Failed;
                next.problem = Some(
                    report
                        .comment
                        .clone()
                        .unwrap_or_else(|| report.description.code.clone()),
                );
                Ok(Transition { next, action: None })
            }
            (State::RequestSent, AriesMessage::IssueCredential(issued)) => {
                let attachment = issued.credentials_attach.first().ok_or_else(|| {
                    AgentError::ProtocolViolation("credential without attachment".to_string())
                })?;
                let credential: Credential = attachment.decode()?;

                Ok(Transition {
                    next: self.clone(),
                    action: Some(Action::StoreCredential(credential)),
                })
            }
            (state, message) => Err(AgentError::ProtocolViolation(format!(
                "holder {} cannot handle {} in {}",
                self.source_id,
                message.name(),
                state
            ))),
        }
    }

    pub fn accepts(message: &AriesMessage) -> bool {
        matches!(
            message,
            AriesMessage::IssueCredential(_) | AriesMessage::ProblemReport(_)
        )
    }

    /// check_issued compares an issued credential with what was offered
    pub fn check_issued(&self, credential: &Credential) -> Result<(), AgentError> {
        let matches_offer = credential.cred_def_id == self.payload.cred_def_id
            && credential.schema_id == self.payload.schema_id
            && credential.rev_reg_id == self.payload.rev_reg_id
            && credential.values == self.attributes();

        if !matches_offer {
            return Err(AgentError::VerificationFailed(format!(
                "holder {} received a credential that differs from the offer",
                self.source_id
            )));
        }

        let revocation_complete = credential.cred_rev_id.is_some()
            && credential.tails_location.is_some()
            && credential.tails_hash.is_some();
        if credential.rev_reg_id.is_some() && !revocation_complete {
            return Err(AgentError::VerificationFailed(format!(
                "holder {} received a revocable credential without tails",
                self.source_id
            )));
        }

        Ok(())
    }

    pub fn require_state(&self, expected: State, action: &str) -> Result<(), AgentError> {
        if self.state != expected {
            return Err(AgentError::InvalidState(format!(
                "holder {} cannot {} in {}",
                self.source_id, action, self.state
            )));
        }

        Ok(())
    }

    pub fn require_credential(&self) -> Result<&Credential, AgentError> {
        self.credential.as_ref().ok_or_else(|| {
            AgentError::InvalidState(format!(
                "holder {} has no credential in {}",
                self.source_id, self.state
            ))
        })
    }

    pub fn is_terminal(state: State) -> bool {
        matches!(state, State::Finished | State::Declined | State::Failed)
    }
}

impl HolderCredentialEntityAccessor for HolderCredential {
    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_state(&self) -> State {
        self.state
    }

    fn get_thread_id(&self) -> String {
        self.thread_id.to_owned()
    }

    fn get_connection_handle(&self) -> Option<Handle> {
        self.connection_handle
    }

    fn get_offer(&self) -> CredentialOffer {
        self.offer.clone()
    }

    fn get_attributes(&self) -> BTreeMap<String, String> {
        self.attributes()
    }

    fn get_credential_id(&self) -> Option<String> {
        self.credential_id.clone()
    }

    fn get_credential(&self) -> Option<Credential> {
        self.credential.clone()
    }

    fn get_problem(&self) -> Option<String> {
        self.problem.clone()
    }
}

impl ToJSON for HolderCredential {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for HolderCredential {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for HolderCredential {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}
