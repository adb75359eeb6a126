use rst_common::standard::serde::{self, Deserialize, Serialize};

/// OfferPayload is the `offers~attach` content binding an offer to its ledger objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct OfferPayload {
    pub schema_id: String,
    pub cred_def_id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rev_reg_id: Option<String>,

    pub nonce: String,
}

/// RequestPayload is the `requests~attach` content, it echoes the offer nonce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RequestPayload {
    pub prover_did: String,
    pub cred_def_id: String,
    pub nonce: String,
}

pub const OFFER_ATTACHMENT_ID: &str = "libindy-cred-offer-0";
pub const REQUEST_ATTACHMENT_ID: &str = "libindy-cred-request-0";
pub const CREDENTIAL_ATTACHMENT_ID: &str = "libindy-cred-0";
