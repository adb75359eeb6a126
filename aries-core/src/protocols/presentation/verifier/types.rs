use std::fmt::Debug;

use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};

use rstdev_domain::entity::ToJSON;

use crate::anoncreds::credential_definition::types::CredentialDefinitionAPI;
use crate::anoncreds::proof::{
    AttributeInfo, NonRevokedInterval, PredicateInfo, Proof, ProofRequest,
};
use crate::collaborators::ProfileBuilder;
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::presentation::{Presentation, PresentationPreview};
use crate::messages::AriesMessage;
use crate::protocols::connection::types::ConnectionAPI;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum State {
    Initial,
    RequestSent,
    Finished,
    Failed,
}

/// ProofState is the verdict on a received proof, independent from [`State`]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum ProofState {
    Undefined,
    Verified,
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// evaluate the received presentation, then acknowledge it
    Verify(Presentation),
}

/// VerifiedProof is a received proof along with its verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct VerifiedProof {
    pub proof_state: ProofState,
    pub proof: Option<Proof>,
}

pub trait VerifierProofEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_source_id(&self) -> String;
    fn get_state(&self) -> State;
    fn get_proof_state(&self) -> ProofState;
    fn get_thread_id(&self) -> String;
    fn get_connection_handle(&self) -> Option<Handle>;
    fn get_proof_request(&self) -> ProofRequest;
    fn get_proof(&self) -> Option<Proof>;
    fn get_proposal(&self) -> Option<PresentationPreview>;
    fn get_problem(&self) -> Option<String>;
}

#[async_trait]
pub trait VerifierAPI: Clone {
    type EntityAccessor: VerifierProofEntityAccessor;

    /// create builds the proof request, referents are `attribute_<n>` and
    /// `predicate_<n>` in input order
    async fn create(
        &self,
        source_id: String,
        requested_attributes: Vec<AttributeInfo>,
        requested_predicates: Vec<PredicateInfo>,
        non_revoked: Option<NonRevokedInterval>,
        name: String,
    ) -> Result<Handle, AgentError>;

    async fn send_presentation_request(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError>;

    async fn mark_presentation_request_msg_sent(&self, handle: Handle) -> Result<(), AgentError>;
    async fn get_request_msg(&self, handle: Handle) -> Result<AriesMessage, AgentError>;

    async fn update_state(&self, handle: Handle, connection_handle: Handle)
        -> Result<State, AgentError>;

    async fn update_state_with_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<State, AgentError>;

    async fn get_proof_state(&self, handle: Handle) -> Result<ProofState, AgentError>;
    async fn get_proof_msg(&self, handle: Handle) -> Result<VerifiedProof, AgentError>;
    async fn get_state(&self, handle: Handle) -> Result<State, AgentError>;
    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_proof(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}

pub trait UsecaseBuilder<TEntityAccessor>: VerifierAPI<EntityAccessor = TEntityAccessor>
where
    TEntityAccessor: VerifierProofEntityAccessor,
{
    type ProfileImplementer: ProfileBuilder;
    type ConnectionImplementer: ConnectionAPI;
    type CredentialDefinitionImplementer: CredentialDefinitionAPI;

    fn profile(&self) -> Self::ProfileImplementer;
    fn connections(&self) -> Self::ConnectionImplementer;
    fn cred_defs(&self) -> Self::CredentialDefinitionImplementer;
}
