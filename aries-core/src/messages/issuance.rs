use std::collections::BTreeMap;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use super::{Attachment, Thread};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialPreview {
    pub attributes: Vec<CredentialAttribute>,
}

impl CredentialPreview {
    pub fn from_values(values: &BTreeMap<String, String>) -> Self {
        let attributes = values
            .iter()
            .map(|(name, value)| CredentialAttribute {
                name: name.to_owned(),
                value: value.to_owned(),
            })
            .collect();

        Self { attributes }
    }

    pub fn to_values(&self) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .map(|attr| (attr.name.to_owned(), attr.value.to_owned()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialOffer {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,

    pub credential_preview: CredentialPreview,

    #[serde(rename = "offers~attach")]
    pub offers_attach: Vec<Attachment>,
}

impl CredentialOffer {
    pub fn new(
        comment: Option<String>,
        credential_preview: CredentialPreview,
        offer: Attachment,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            comment,
            credential_preview,
            offers_attach: vec![offer],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialRequest {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,

    #[serde(rename = "requests~attach")]
    pub requests_attach: Vec<Attachment>,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl CredentialRequest {
    pub fn new(request: Attachment, thid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            comment: None,
            requests_attach: vec![request],
            thread: Thread::new(thid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct IssueCredential {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,

    #[serde(rename = "credentials~attach")]
    pub credentials_attach: Vec<Attachment>,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl IssueCredential {
    pub fn new(credential: Attachment, thid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            comment: None,
            credentials_attach: vec![credential],
            thread: Thread::new(thid),
        }
    }
}
