use std::collections::{BTreeMap, BTreeSet};

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::anoncreds::credential::Credential;
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::issuance::{CredentialOffer, CredentialPreview};
use crate::messages::{AriesMessage, Attachment};

use crate::protocols::issuance::payload::{OfferPayload, RequestPayload, OFFER_ATTACHMENT_ID};
use crate::protocols::mailbox::require_thread;
use super::types::{IssuerCredentialEntityAccessor, State};

/// OfferBinding holds what an offer was built against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct OfferBinding {
    pub cred_def_handle: Handle,
    pub cred_def_id: String,
    pub schema_id: String,
    pub rev_reg_handle: Option<Handle>,
    pub rev_reg_id: Option<String>,
    pub tails_location: Option<String>,
    pub tails_hash: Option<String>,
}

/// IssuerCredential is the issuer side of one credential exchange
///
/// The connection and ledger objects are referenced by handle. A prepared credential
/// is kept once signed so that a failed send is retried with the same revocation index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct IssuerCredential {
    pub(crate) source_id: String,
    pub(crate) state: State,
    pub(crate) thread_id: Option<String>,
    pub(crate) connection_handle: Option<Handle>,
    pub(crate) binding: Option<OfferBinding>,
    pub(crate) attributes: BTreeMap<String, String>,
    pub(crate) offer: Option<CredentialOffer>,
    pub(crate) nonce: Option<String>,
    pub(crate) request: Option<RequestPayload>,
    pub(crate) credential: Option<Credential>,
    pub(crate) problem: Option<String>,
}

impl IssuerCredential {
    pub fn new(source_id: String) -> Self {
        Self {
            source_id,
            state: State::Initial,
            thread_id: None,
            connection_handle: None,
            binding: None,
            attributes: BTreeMap::new(),
            offer: None,
            nonce: None,
            request: None,
            credential: None,
            problem: None,
        }
    }

    /// check_attributes requires the offered names to equal the schema's names
    pub fn check_attributes(
        attr_names: &[String],
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), AgentError> {
        let expected: BTreeSet<&String> = attr_names.iter().collect();
        let offered: BTreeSet<&String> = attributes.keys().collect();

        let missing: Vec<&String> = expected.difference(&offered).copied().collect();
        let unknown: Vec<&String> = offered.difference(&expected).copied().collect();
        if missing.is_empty() && unknown.is_empty() {
            return Ok(());
        }

        Err(AgentError::InvalidAttributesStructure(format!(
            "missing: {:?}, unknown: {:?}",
            missing, unknown
        )))
    }

    /// build_offer moves `Initial -> OfferBuilt`, the offer id opens the exchange thread
    pub fn build_offer(
        &self,
        binding: OfferBinding,
        attributes: BTreeMap<String, String>,
        comment: Option<String>,
    ) -> Result<Self, AgentError> {
        self.require_state(State::Initial, "build an offer")?;

        let nonce = rand::random::<u64>().to_string();
        let payload = OfferPayload {
            schema_id: binding.schema_id.clone(),
            cred_def_id: binding.cred_def_id.clone(),
            rev_reg_id: binding.rev_reg_id.clone(),
            nonce: nonce.clone(),
        };

        let attachment = Attachment::from_json(OFFER_ATTACHMENT_ID, &payload)?;
        let offer = CredentialOffer::new(
            comment,
            CredentialPreview::from_values(&attributes),
            attachment,
        );

        let mut next = self.clone();
        next.thread_id = Some(offer.id.clone());
        next.offer = Some(offer);
        next.nonce = Some(nonce);
        next.binding = Some(binding);
        next.attributes = attributes;
        next.state = State::OfferBuilt;
        Ok(next)
    }

    pub fn offer_sent(&self, connection_handle: Option<Handle>) -> Result<Self, AgentError> {
        self.require_state(State::OfferBuilt, "mark the offer sent")?;

        let mut next = self.clone();
        next.state = State::OfferSent;
        if connection_handle.is_some() {
            next.connection_handle = connection_handle;
        }
        Ok(next)
    }

    /// transition is the issuer table for incoming messages, an undefined pair yields
    /// [`AgentError::ProtocolViolation`] and leaves the object untouched
    pub fn transition(&self, message: &AriesMessage) -> Result<Self, AgentError> {
        require_thread(&self.source_id, self.thread_id.as_deref(), message)?;

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
                Ok(next)
            }
            (State::OfferSent, AriesMessage::CredentialRequest(request)) => {
                let attachment = request.requests_attach.first().ok_or_else(|| {
                    AgentError::ProtocolViolation("credential request without attachment".to_string())
                })?;
                let payload: RequestPayload = attachment.decode()?;

                let binding = self.require_binding()?;
                if payload.cred_def_id != binding.cred_def_id
                    || Some(&payload.nonce) != self.nonce.as_ref()
                {
                    return Err(AgentError::ProtocolViolation(format!(
                        "{} received a request for another offer",
                        self.source_id
                    )));
                }

                let mut next = self.clone();
                next.request = Some(payload);
                next.state = State::RequestReceived;
                Ok(next)
            }
            (State::CredentialSent, AriesMessage::CredentialAck(_))
            | (State::CredentialSent, AriesMessage::Ack(_)) => {
                let mut next = self.clone();
                next.state = State::Finished;
                Ok(next)
            }
            (state, message) => Err(AgentError::ProtocolViolation(format!(
                "issuer {} cannot handle {} in {}",
                self.source_id,
                message.name(),
                state
            ))),
        }
    }

    /// accepts lists the messages a polling issuer consumes from its thread
    pub fn accepts(message: &AriesMessage) -> bool {
        matches!(
            message,
            AriesMessage::CredentialRequest(_)
                | AriesMessage::CredentialAck(_)
                | AriesMessage::Ack(_)
                | AriesMessage::ProblemReport(_)
        )
    }

    pub fn credential_sent(&self, credential: Credential) -> Self {
        let mut next = self.clone();
        next.credential = Some(credential);
        next.state = State::CredentialSent;
        next
    }

    pub fn revoked(&self) -> Result<Self, AgentError> {
        match self.state {
            State::CredentialSent | State::Finished | State::Revoked => {
                let mut next = self.clone();
                next.state = State::Revoked;
                Ok(next)
            }
            state => Err(AgentError::InvalidState(format!(
                "issuer {} cannot revoke in {}",
                self.source_id, state
            ))),
        }
    }

    pub fn require_state(&self, expected: State, action: &str) -> Result<(), AgentError> {
        if self.state != expected {
            return Err(AgentError::InvalidState(format!(
                "issuer {} cannot {} in {}",
                self.source_id, action, self.state
            )));
        }

        Ok(())
    }

    pub fn require_binding(&self) -> Result<&OfferBinding, AgentError> {
        self.binding.as_ref().ok_or_else(|| {
            AgentError::InvalidState(format!("issuer {} has no offer", self.source_id))
        })
    }

    pub fn require_thread_id(&self) -> Result<String, AgentError> {
        self.thread_id.clone().ok_or_else(|| {
            AgentError::InvalidState(format!("issuer {} has no thread yet", self.source_id))
        })
    }

    pub fn is_terminal(state: State) -> bool {
        matches!(state, State::Finished | State::Revoked | State::Failed)
    }
}

impl IssuerCredentialEntityAccessor for IssuerCredential {
    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_state(&self) -> State {
        self.state
    }

    fn get_thread_id(&self) -> Option<String> {
        self.thread_id.clone()
    }

    fn get_connection_handle(&self) -> Option<Handle> {
        self.connection_handle
    }

    fn get_cred_def_id(&self) -> Option<String> {
        self.binding.as_ref().map(|binding| binding.cred_def_id.clone())
    }

    fn get_rev_reg_id(&self) -> Option<String> {
        self.binding
            .as_ref()
            .and_then(|binding| binding.rev_reg_id.clone())
    }

    fn get_cred_rev_id(&self) -> Option<u32> {
        self.credential
            .as_ref()
            .and_then(|credential| credential.cred_rev_id)
    }

    fn get_attributes(&self) -> BTreeMap<String, String> {
        self.attributes.clone()
    }

    fn get_problem(&self) -> Option<String> {
        self.problem.clone()
    }
}

impl ToJSON for IssuerCredential {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for IssuerCredential {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for IssuerCredential {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}
