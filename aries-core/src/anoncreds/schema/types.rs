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

/// SchemaRecord is the document written to the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct SchemaRecord {
    pub id: String,
    pub issuer_did: String,
    pub name: String,
    pub version: String,
    pub attr_names: Vec<String>,
}

/// SchemaID is the parsed form of `<issuer_did>:2:<name>:<version>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaID {
    pub issuer_did: String,
    pub name: String,
    pub version: String,
}

impl SchemaID {
    pub fn build(issuer_did: &str, name: &str, version: &str) -> String {
        format!("{}:2:{}:{}", issuer_did, name, version)
    }

    pub fn parse(id: &str) -> Option<Self> {
        let parts: Vec<&str> = id.split(':').collect();
        match parts.as_slice() {
            [issuer_did, "2", name, version] => Some(Self {
                issuer_did: issuer_did.to_string(),
                name: name.to_string(),
                version: version.to_string(),
            }),
            _ => None,
        }
    }
}

pub trait SchemaEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_source_id(&self) -> String;
    fn get_schema_id(&self) -> String;
    fn get_issuer_did(&self) -> String;
    fn get_name(&self) -> String;
    fn get_version(&self) -> String;
    fn get_attr_names(&self) -> Vec<String>;
    fn get_state(&self) -> State;
}

#[async_trait]
pub trait SchemaAPI: Clone {
    type EntityAccessor: SchemaEntityAccessor;

    async fn create(
        &self,
        source_id: String,
        issuer_did: String,
        name: String,
        version: String,
        attr_names: Vec<String>,
    ) -> Result<Handle, AgentError>;

    async fn publish(&self, handle: Handle) -> Result<(), AgentError>;

    async fn get_schema(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError>;
    async fn get_schema_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_attributes(&self, handle: Handle) -> Result<Vec<String>, AgentError>;
    async fn get_state(&self, handle: Handle) -> Result<State, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}
