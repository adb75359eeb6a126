use std::fmt::Debug;

use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};

use rstdev_domain::entity::ToJSON;

use crate::errors::AgentError;
use crate::handle::Handle;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum State {
    Built,
    Published,
}

/// CredentialDefinitionRecord is the ledger document holders and verifiers resolve
/// to check an issuer signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialDefinitionRecord {
    pub id: String,
    pub schema_id: String,
    pub issuer_did: String,
    pub tag: String,
    pub verkey: String,
    pub attr_names: Vec<String>,
    pub support_revocation: bool,
}

pub trait CredentialDefinitionEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_source_id(&self) -> String;
    fn get_cred_def_id(&self) -> String;
    fn get_schema_id(&self) -> String;
    fn get_issuer_did(&self) -> String;
    fn get_tag(&self) -> String;
    fn get_verkey(&self) -> String;
    fn get_attr_names(&self) -> Vec<String>;
    fn get_support_revocation(&self) -> bool;
    fn get_state(&self) -> State;
}

#[async_trait]
pub trait CredentialDefinitionAPI: Clone {
    type EntityAccessor: CredentialDefinitionEntityAccessor;

    /// create resolves the schema from the ledger and generates the signing key
    async fn create(
        &self,
        source_id: String,
        issuer_did: String,
        schema_id: String,
        tag: String,
        support_revocation: bool,
    ) -> Result<Handle, AgentError>;

    async fn publish(&self, handle: Handle) -> Result<(), AgentError>;

    async fn get_cred_def(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError>;
    async fn get_cred_def_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_state(&self, handle: Handle) -> Result<State, AgentError>;
    async fn is_revocable(&self, handle: Handle) -> Result<bool, AgentError>;

    /// read_record resolves any published credential definition by id
    async fn read_record(&self, cred_def_id: String)
        -> Result<CredentialDefinitionRecord, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}
