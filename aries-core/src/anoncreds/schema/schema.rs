use std::collections::HashSet;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::errors::AgentError;

use super::types::{SchemaEntityAccessor, SchemaID, SchemaRecord, State};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Schema {
    pub(crate) source_id: String,
    pub(crate) schema_id: String,
    pub(crate) issuer_did: String,
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) attr_names: Vec<String>,
    pub(crate) state: State,
}

impl Schema {
    pub fn new(
        source_id: String,
        issuer_did: String,
        name: String,
        version: String,
        attr_names: Vec<String>,
    ) -> Result<Self, AgentError> {
        if name.is_empty() || name.contains(':') {
            return Err(AgentError::ValidationError("schema name is invalid".to_string()));
        }

        if version.is_empty() || version.contains(':') {
            return Err(AgentError::ValidationError(
                "schema version is invalid".to_string(),
            ));
        }

        if attr_names.is_empty() {
            return Err(AgentError::InvalidAttributesStructure(
                "schema attributes were missing".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for attr in attr_names.iter() {
            if attr.trim().is_empty() || !seen.insert(attr.to_owned()) {
                return Err(AgentError::InvalidAttributesStructure(format!(
                    "schema attribute is empty or duplicated: {}",
                    attr
                )));
            }
        }

        Ok(Self {
            source_id,
            schema_id: SchemaID::build(&issuer_did, &name, &version),
            issuer_did,
            name,
            version,
            attr_names,
            state: State::Built,
        })
    }

    pub fn to_record(&self) -> SchemaRecord {
        SchemaRecord {
            id: self.schema_id.clone(),
            issuer_did: self.issuer_did.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            attr_names: self.attr_names.clone(),
        }
    }
}

impl SchemaEntityAccessor for Schema {
    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_schema_id(&self) -> String {
        self.schema_id.to_owned()
    }

    fn get_issuer_did(&self) -> String {
        self.issuer_did.to_owned()
    }

    fn get_name(&self) -> String {
        self.name.to_owned()
    }

    fn get_version(&self) -> String {
        self.version.to_owned()
    }

    fn get_attr_names(&self) -> Vec<String> {
        self.attr_names.clone()
    }

    fn get_state(&self) -> State {
        self.state
    }
}

impl ToJSON for Schema {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for Schema {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for Schema {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}
