use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::anoncreds::proof::{Proof, ProofRequest};
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::presentation::{PresentationPreview, PresentationRequest};
use crate::messages::{AriesMessage, Attachment};
use crate::protocols::mailbox::require_thread;
use crate::protocols::presentation::REQUEST_ATTACHMENT_ID;

use super::types::{Action, ProofState, State, VerifierProofEntityAccessor};

#[derive(Debug, Clone)]
pub struct Transition {
    pub next: VerifierProof,
    pub action: Option<Action>,
}

/// VerifierProof is the verifier side of one presentation exchange
///
/// The request message is built at creation, its id is the exchange thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct VerifierProof {
    pub(crate) source_id: String,
    pub(crate) state: State,
    pub(crate) proof_state: ProofState,
    pub(crate) request: ProofRequest,
    pub(crate) request_msg: PresentationRequest,
    pub(crate) thread_id: String,
    pub(crate) connection_handle: Option<Handle>,
    pub(crate) proof: Option<Proof>,
    pub(crate) proposal: Option<PresentationPreview>,
    pub(crate) problem: Option<String>,
}

impl VerifierProof {
    pub fn new(source_id: String, request: ProofRequest) -> Result<Self, AgentError> {
        if request.requested_attributes.is_empty() && request.requested_predicates.is_empty() {
            return Err(AgentError::ValidationError(
                "a proof request needs at least one attribute or predicate".to_string(),
            ));
        }

        let attachment = Attachment::from_json(REQUEST_ATTACHMENT_ID, &request)?;
        let request_msg = PresentationRequest::new(Some(request.name.clone()), attachment);

        Ok(Self {
            source_id,
            state: State::Initial,
            proof_state: ProofState::Undefined,
            thread_id: request_msg.id.clone(),
            request,
            request_msg,
            connection_handle: None,
            proof: None,
            proposal: None,
            problem: None,
        })
    }

    pub fn request_sent(&self, connection_handle: Option<Handle>) -> Result<Self, AgentError> {
        if self.state != State::Initial {
            return Err(AgentError::InvalidState(format!(
                "verifier {} cannot send its request in {}",
                self.source_id, self.state
            )));
        }

        let mut next = self.clone();
        next.state = State::RequestSent;
        if connection_handle.is_some() {
            next.connection_handle = connection_handle;
        }
        Ok(next)
    }

    pub fn verified(&self, proof: Option<Proof>, proof_state: ProofState) -> Self {
        let mut next = self.clone();
        next.proof = proof;
        next.proof_state = proof_state;
        next.state = State::Finished;
        next
    }

    /// transition is the verifier table, undefined pairs are
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
            (State::RequestSent, AriesMessage::Presentation(presentation)) => Ok(Transition {
                next: self.clone(),
                action: Some(Action::Verify(presentation.clone())),
            }),
            (State::RequestSent, AriesMessage::PresentationProposal(proposal)) => {
                let mut next = self.clone();
                next.state = State::Failed;
                next.proposal = Some(proposal.presentation_proposal.clone());
                next.problem = proposal.comment.clone();
                Ok(Transition { next, action: None })
            }
            (state, message) => Err(AgentError::ProtocolViolation(format!(
                "verifier {} cannot handle {} in {}",
                self.source_id,
                message.name(),
                state
            ))),
        }
    }

    pub fn accepts(message: &AriesMessage) -> bool {
        matches!(
            message,
            AriesMessage::Presentation(_)
                | AriesMessage::PresentationProposal(_)
                | AriesMessage::ProblemReport(_)
        )
    }

    pub fn is_terminal(state: State) -> bool {
        matches!(state, State::Finished | State::Failed)
    }
}

impl VerifierProofEntityAccessor for VerifierProof {
    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_state(&self) -> State {
        self.state
    }

    fn get_proof_state(&self) -> ProofState {
        self.proof_state
    }

    fn get_thread_id(&self) -> String {
        self.thread_id.to_owned()
    }

    fn get_connection_handle(&self) -> Option<Handle> {
        self.connection_handle
    }

    fn get_proof_request(&self) -> ProofRequest {
        self.request.clone()
    }

    fn get_proof(&self) -> Option<Proof> {
        self.proof.clone()
    }

    fn get_proposal(&self) -> Option<PresentationPreview> {
        self.proposal.clone()
    }

    fn get_problem(&self) -> Option<String> {
        self.problem.clone()
    }
}

impl ToJSON for VerifierProof {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for VerifierProof {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for VerifierProof {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}
