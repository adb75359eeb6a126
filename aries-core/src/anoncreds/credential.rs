use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use crate::errors::AgentError;

/// Credential is the issued credential as delivered to the holder
///
/// `signature` is the issuer's signature with the credential definition key over
/// [`Credential::signing_payload`]. The revocation fields are set only when the
/// credential definition supports revocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Credential {
    pub schema_id: String,
    pub cred_def_id: String,
    pub issuer_did: String,
    pub values: BTreeMap<String, String>,
    pub signature: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rev_reg_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cred_rev_id: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tails_location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tails_hash: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "self::serde")]
struct SigningPayload<'a> {
    schema_id: &'a str,
    cred_def_id: &'a str,
    rev_reg_id: Option<&'a str>,
    cred_rev_id: Option<u32>,
    values: &'a BTreeMap<String, String>,
}

impl Credential {
    /// signing_payload is the canonical byte form the issuer signs, the values map is
    /// ordered so both sides produce identical bytes
    pub fn signing_payload(
        schema_id: &str,
        cred_def_id: &str,
        rev_reg_id: Option<&str>,
        cred_rev_id: Option<u32>,
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, AgentError> {
        let payload = SigningPayload {
            schema_id,
            cred_def_id,
            rev_reg_id,
            cred_rev_id,
            values,
        };

        serde_json::to_vec(&payload).map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    pub fn payload(&self) -> Result<Vec<u8>, AgentError> {
        Self::signing_payload(
            &self.schema_id,
            &self.cred_def_id,
            self.rev_reg_id.as_deref(),
            self.cred_rev_id,
            &self.values,
        )
    }

    pub fn signature_bytes(&self) -> Result<Vec<u8>, AgentError> {
        STANDARD
            .decode(&self.signature)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    pub fn encode_signature(signature: &[u8]) -> String {
        STANDARD.encode(signature)
    }

    pub fn is_revocable(&self) -> bool {
        self.rev_reg_id.is_some() && self.cred_rev_id.is_some()
    }
}
