use std::collections::BTreeMap;
use std::fmt::Debug;

use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};

use rstdev_domain::entity::ToJSON;

use crate::anoncreds::proof::{Proof, ProofRequest};
use crate::collaborators::ProfileBuilder;
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::presentation::{PresentationPreview, PresentationRequest};
use crate::messages::AriesMessage;
use crate::protocols::connection::types::ConnectionAPI;

/// State of the prover side, `Finished`, `Declined` and `Failed` are terminal
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum State {
    RequestReceived,
    ProofGenerated,
    ProofSent,
    Finished,
    Declined,
    Failed,
}

/// CredentialCandidate is a held credential able to answer one referent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialCandidate {
    pub referent: String,
    pub schema_id: String,
    pub cred_def_id: String,
    pub values: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rev_reg_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cred_rev_id: Option<u32>,
}

/// RetrievedCredentials groups candidates by proof request referent, a referent
/// nothing can answer maps to an empty list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RetrievedCredentials {
    pub attributes: BTreeMap<String, Vec<CredentialCandidate>>,
    pub predicates: BTreeMap<String, Vec<CredentialCandidate>>,
}

impl RetrievedCredentials {
    /// select_first picks the first candidate of every referent that has one
    pub fn select_first(&self) -> SelectedCredentials {
        let first = |candidates: &BTreeMap<String, Vec<CredentialCandidate>>| {
            candidates
                .iter()
                .filter_map(|(referent, found)| {
                    found
                        .first()
                        .map(|candidate| (referent.to_owned(), candidate.referent.to_owned()))
                })
                .collect()
        };

        SelectedCredentials {
            attributes: first(&self.attributes),
            predicates: first(&self.predicates),
        }
    }
}

/// SelectedCredentials maps a proof request referent to the wallet referent of the
/// credential chosen to answer it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct SelectedCredentials {
    pub attributes: BTreeMap<String, String>,
    pub predicates: BTreeMap<String, String>,
}

pub trait DisclosedProofEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_source_id(&self) -> String;
    fn get_state(&self) -> State;
    fn get_thread_id(&self) -> String;
    fn get_connection_handle(&self) -> Option<Handle>;
    fn get_proof_request(&self) -> ProofRequest;
    fn get_proof(&self) -> Option<Proof>;
    fn get_problem(&self) -> Option<String>;
}

#[async_trait]
pub trait ProverAPI: Clone {
    type EntityAccessor: DisclosedProofEntityAccessor;

    async fn create_with_request(
        &self,
        source_id: String,
        request: PresentationRequest,
    ) -> Result<Handle, AgentError>;

    /// get_requests lists proof requests waiting in the connection mailbox
    async fn get_requests(
        &self,
        connection_handle: Handle,
    ) -> Result<Vec<PresentationRequest>, AgentError>;

    async fn get_proof_request_attachment(&self, handle: Handle) -> Result<String, AgentError>;

    async fn retrieve_credentials(&self, handle: Handle)
        -> Result<RetrievedCredentials, AgentError>;

    /// generate_proof builds the proof from the selected credentials and the
    /// self attested values, unrestricted attributes only
    async fn generate_proof(
        &self,
        handle: Handle,
        selected: SelectedCredentials,
        self_attested: BTreeMap<String, String>,
    ) -> Result<(), AgentError>;

    async fn send_proof(&self, handle: Handle, connection_handle: Handle)
        -> Result<(), AgentError>;

    /// decline_presentation_request needs a reason, a counter proposal, or both
    async fn decline_presentation_request(
        &self,
        handle: Handle,
        connection_handle: Handle,
        reason: Option<String>,
        proposal: Option<PresentationPreview>,
    ) -> Result<(), AgentError>;

    async fn update_state(&self, handle: Handle, connection_handle: Handle)
        -> Result<State, AgentError>;

    async fn update_state_with_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<State, AgentError>;

    async fn get_proof_msg(&self, handle: Handle) -> Result<AriesMessage, AgentError>;
    async fn get_state(&self, handle: Handle) -> Result<State, AgentError>;
    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_disclosed_proof(&self, handle: Handle)
        -> Result<Self::EntityAccessor, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}

pub trait UsecaseBuilder<TEntityAccessor>: ProverAPI<EntityAccessor = TEntityAccessor>
where
    TEntityAccessor: DisclosedProofEntityAccessor,
{
    type ProfileImplementer: ProfileBuilder;
    type ConnectionImplementer: ConnectionAPI;

    fn profile(&self) -> Self::ProfileImplementer;
    fn connections(&self) -> Self::ConnectionImplementer;
}
