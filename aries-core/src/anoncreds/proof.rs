//! Proof request and proof payloads carried inside presentation attachments
use std::collections::BTreeMap;

use derive_more::Display;

use rst_common::standard::serde::{self, Deserialize, Serialize};

use crate::anoncreds::credential::Credential;
use crate::anoncreds::schema::types::SchemaID;
use crate::errors::AgentError;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum PredicateType {
    #[display(">=")]
    #[serde(rename = ">=")]
    GE,

    #[display(">")]
    #[serde(rename = ">")]
    GT,

    #[display("<=")]
    #[serde(rename = "<=")]
    LE,

    #[display("<")]
    #[serde(rename = "<")]
    LT,
}

impl PredicateType {
    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        match raw {
            ">=" => Ok(PredicateType::GE),
            ">" => Ok(PredicateType::GT),
            "<=" => Ok(PredicateType::LE),
            "<" => Ok(PredicateType::LT),
            _ => Err(AgentError::ValidationError(format!(
                "unknown predicate type: {}",
                raw
            ))),
        }
    }

    pub fn holds(&self, value: i64, threshold: i64) -> bool {
        match self {
            PredicateType::GE => value >= threshold,
            PredicateType::GT => value > threshold,
            PredicateType::LE => value <= threshold,
            PredicateType::LT => value < threshold,
        }
    }
}

/// Restriction filters the credentials allowed to answer a referent, every field
/// that is set must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Restriction {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema_issuer_did: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issuer_did: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cred_def_id: Option<String>,
}

impl Restriction {
    pub fn with_cred_def_id(cred_def_id: String) -> Self {
        Self {
            cred_def_id: Some(cred_def_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, schema_id: &str, cred_def_id: &str) -> bool {
        let schema = SchemaID::parse(schema_id);
        let issuer_did = cred_def_id.split(':').next().unwrap_or_default();

        let expect = |wanted: &Option<String>, actual: Option<&str>| match wanted {
            Some(wanted) => actual == Some(wanted.as_str()),
            None => true,
        };

        expect(&self.schema_id, Some(schema_id))
            && expect(&self.cred_def_id, Some(cred_def_id))
            && expect(&self.issuer_did, Some(issuer_did))
            && expect(
                &self.schema_issuer_did,
                schema.as_ref().map(|s| s.issuer_did.as_str()),
            )
            && expect(&self.schema_name, schema.as_ref().map(|s| s.name.as_str()))
            && expect(
                &self.schema_version,
                schema.as_ref().map(|s| s.version.as_str()),
            )
    }
}

/// satisfies_restrictions reads an empty list as unrestricted, otherwise any single
/// restriction may match
pub fn satisfies_restrictions(
    restrictions: &[Restriction],
    schema_id: &str,
    cred_def_id: &str,
) -> bool {
    restrictions.is_empty()
        || restrictions
            .iter()
            .any(|restriction| restriction.matches(schema_id, cred_def_id))
}

/// NonRevokedInterval bounds the ledger timestamp a non-revocation proof is made
/// against, `from` exclusive and `to` inclusive, a missing `to` means now
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct NonRevokedInterval {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub from: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub to: Option<i64>,
}

impl NonRevokedInterval {
    pub fn new(from: Option<i64>, to: Option<i64>) -> Self {
        Self { from, to }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct AttributeInfo {
    pub name: String,

    #[serde(default)]
    pub restrictions: Vec<Restriction>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl AttributeInfo {
    pub fn new(name: String, restrictions: Vec<Restriction>) -> Self {
        Self {
            name,
            restrictions,
            non_revoked: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PredicateInfo {
    pub name: String,
    pub p_type: PredicateType,
    pub p_value: i64,

    #[serde(default)]
    pub restrictions: Vec<Restriction>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl PredicateInfo {
    pub fn new(
        name: String,
        p_type: PredicateType,
        p_value: i64,
        restrictions: Vec<Restriction>,
    ) -> Self {
        Self {
            name,
            p_type,
            p_value,
            restrictions,
            non_revoked: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofRequest {
    pub name: String,
    pub version: String,
    pub nonce: String,
    pub requested_attributes: BTreeMap<String, AttributeInfo>,
    pub requested_predicates: BTreeMap<String, PredicateInfo>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl ProofRequest {
    /// new names the referents `attribute_<n>` and `predicate_<n>` in input order
    pub fn new(
        name: String,
        attributes: Vec<AttributeInfo>,
        predicates: Vec<PredicateInfo>,
        non_revoked: Option<NonRevokedInterval>,
    ) -> Self {
        let requested_attributes = attributes
            .into_iter()
            .enumerate()
            .map(|(idx, info)| (format!("attribute_{}", idx), info))
            .collect();

        let requested_predicates = predicates
            .into_iter()
            .enumerate()
            .map(|(idx, info)| (format!("predicate_{}", idx), info))
            .collect();

        Self {
            name,
            version: "1.0".to_string(),
            nonce: rand::random::<u64>().to_string(),
            requested_attributes,
            requested_predicates,
            non_revoked,
        }
    }

    /// attribute_interval resolves a referent's interval, the referent's own
    /// interval wins over the request wide one
    pub fn attribute_interval(&self, referent: &str) -> Option<NonRevokedInterval> {
        self.requested_attributes
            .get(referent)
            .and_then(|info| info.non_revoked)
            .or(self.non_revoked)
    }

    pub fn predicate_interval(&self, referent: &str) -> Option<NonRevokedInterval> {
        self.requested_predicates
            .get(referent)
            .and_then(|info| info.non_revoked)
            .or(self.non_revoked)
    }
}

/// ProofCredential is one credential disclosed in a proof
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofCredential {
    pub schema_id: String,
    pub cred_def_id: String,
    pub values: BTreeMap<String, String>,
    pub signature: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rev_reg_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cred_rev_id: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub witness: Option<String>,
}

impl ProofCredential {
    pub fn from_credential(credential: &Credential) -> Self {
        Self {
            schema_id: credential.schema_id.clone(),
            cred_def_id: credential.cred_def_id.clone(),
            values: credential.values.clone(),
            signature: credential.signature.clone(),
            rev_reg_id: credential.rev_reg_id.clone(),
            cred_rev_id: credential.cred_rev_id,
            timestamp: None,
            witness: None,
        }
    }

    pub fn payload(&self) -> Result<Vec<u8>, AgentError> {
        Credential::signing_payload(
            &self.schema_id,
            &self.cred_def_id,
            self.rev_reg_id.as_deref(),
            self.cred_rev_id,
            &self.values,
        )
    }

    pub fn signature_bytes(&self) -> Result<Vec<u8>, AgentError> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        STANDARD
            .decode(&self.signature)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RevealedAttribute {
    pub sub_proof_index: usize,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProvedPredicate {
    pub sub_proof_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RequestedProof {
    pub revealed_attrs: BTreeMap<String, RevealedAttribute>,
    pub self_attested_attrs: BTreeMap<String, String>,
    pub predicates: BTreeMap<String, ProvedPredicate>,
}

/// Proof answers a [`ProofRequest`], echoing its nonce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Proof {
    pub nonce: String,
    pub credentials: Vec<ProofCredential>,
    pub requested_proof: RequestedProof,
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_test::table_test;

    #[test]
    fn test_predicate_holds() {
        let table = vec![
            ((PredicateType::GE, 18, 18), true),
            ((PredicateType::GE, 17, 18), false),
            ((PredicateType::GT, 18, 18), false),
            ((PredicateType::LE, 18, 18), true),
            ((PredicateType::LT, 17, 18), true),
        ];

        for (validator, (p_type, value, threshold), expected) in table_test!(table) {
            validator
                .given(&format!("{} {} {}", value, p_type, threshold))
                .when("evaluate the predicate")
                .then("it should follow the comparison")
                .assert_eq(expected, p_type.holds(value, threshold));
        }
    }

    #[test]
    fn test_restriction_matching() {
        let schema_id = "issuer:2:degree:1.0";
        let cred_def_id = "issuer:3:CL:issuer:2:degree:1.0:tag1";

        let by_cred_def = Restriction::with_cred_def_id(cred_def_id.to_string());
        assert!(by_cred_def.matches(schema_id, cred_def_id));

        let by_schema_name = Restriction {
            schema_name: Some("degree".to_string()),
            issuer_did: Some("issuer".to_string()),
            ..Default::default()
        };
        assert!(by_schema_name.matches(schema_id, cred_def_id));

        let other_issuer = Restriction {
            issuer_did: Some("someone-else".to_string()),
            ..Default::default()
        };
        assert!(!other_issuer.matches(schema_id, cred_def_id));

        assert!(satisfies_restrictions(&[], schema_id, cred_def_id));
        assert!(satisfies_restrictions(
            &[other_issuer, by_cred_def],
            schema_id,
            cred_def_id
        ));
    }

    #[test]
    fn test_request_referents_and_intervals() {
        let request = ProofRequest::new(
            "proof".to_string(),
            vec![
                AttributeInfo::new("name".to_string(), vec![]),
                AttributeInfo {
                    name: "degree".to_string(),
                    restrictions: vec![],
                    non_revoked: Some(NonRevokedInterval::new(None, Some(10))),
                },
            ],
            vec![PredicateInfo::new(
                "age".to_string(),
                PredicateType::GE,
                18,
                vec![],
            )],
            Some(NonRevokedInterval::new(None, Some(99))),
        );

        assert!(request.requested_attributes.contains_key("attribute_0"));
        assert!(request.requested_attributes.contains_key("attribute_1"));
        assert!(request.requested_predicates.contains_key("predicate_0"));
        assert!(!request.nonce.is_empty());

        assert_eq!(
            request.attribute_interval("attribute_0").unwrap().to,
            Some(99)
        );
        assert_eq!(
            request.attribute_interval("attribute_1").unwrap().to,
            Some(10)
        );
        assert_eq!(
            request.predicate_interval("predicate_0").unwrap().to,
            Some(99)
        );
    }
}
