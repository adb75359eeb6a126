use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::errors::AgentError;

use super::types::{CredentialDefinitionEntityAccessor, CredentialDefinitionRecord, State};

/// CredentialDefinition binds a schema to the key its credentials are signed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialDefinition {
    pub(crate) source_id: String,
    pub(crate) cred_def_id: String,
    pub(crate) schema_id: String,
    pub(crate) issuer_did: String,
    pub(crate) tag: String,
    pub(crate) verkey: String,
    pub(crate) attr_names: Vec<String>,
    pub(crate) support_revocation: bool,
    pub(crate) state: State,
}

impl CredentialDefinition {
    pub fn build_id(issuer_did: &str, schema_id: &str, tag: &str) -> String {
        format!("{}:3:CL:{}:{}", issuer_did, schema_id, tag)
    }

    pub fn new(
        source_id: String,
        issuer_did: String,
        schema_id: String,
        tag: String,
        verkey: String,
        attr_names: Vec<String>,
        support_revocation: bool,
    ) -> Result<Self, AgentError> {
        if tag.is_empty() {
            return Err(AgentError::ValidationError(
                "credential definition tag was missing".to_string(),
            ));
        }

        Ok(Self {
            source_id,
            cred_def_id: Self::build_id(&issuer_did, &schema_id, &tag),
            schema_id,
            issuer_did,
            tag,
            verkey,
            attr_names,
            support_revocation,
            state: State::Built,
        })
    }

    pub fn to_record(&self) -> CredentialDefinitionRecord {
        CredentialDefinitionRecord {
            id: self.cred_def_id.clone(),
            schema_id: self.schema_id.clone(),
            issuer_did: self.issuer_did.clone(),
            tag: self.tag.clone(),
            verkey: self.verkey.clone(),
            attr_names: self.attr_names.clone(),
            support_revocation: self.support_revocation,
        }
    }
}

impl CredentialDefinitionEntityAccessor for CredentialDefinition {
    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_cred_def_id(&self) -> String {
        self.cred_def_id.to_owned()
    }

    fn get_schema_id(&self) -> String {
        self.schema_id.to_owned()
    }

    fn get_issuer_did(&self) -> String {
        self.issuer_did.to_owned()
    }

    fn get_tag(&self) -> String {
        self.tag.to_owned()
    }

    fn get_verkey(&self) -> String {
        self.verkey.to_owned()
    }

    fn get_attr_names(&self) -> Vec<String> {
        self.attr_names.clone()
    }

    fn get_support_revocation(&self) -> bool {
        self.support_revocation
    }

    fn get_state(&self) -> State {
        self.state
    }
}

impl ToJSON for CredentialDefinition {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for CredentialDefinition {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for CredentialDefinition {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}
