use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use super::{Attachment, Thread};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PresentationRequest {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,

    #[serde(rename = "request_presentations~attach")]
    pub request_presentations_attach: Vec<Attachment>,
}

impl PresentationRequest {
    pub fn new(comment: Option<String>, request: Attachment) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            comment,
            request_presentations_attach: vec![request],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Presentation {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,

    #[serde(rename = "presentations~attach")]
    pub presentations_attach: Vec<Attachment>,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Presentation {
    pub fn new(proof: Attachment, thid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            comment: None,
            presentations_attach: vec![proof],
            thread: Thread::new(thid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PreviewAttribute {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cred_def_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PreviewPredicate {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cred_def_id: Option<String>,

    pub predicate: String,
    pub threshold: i64,
}

/// PresentationPreview is the counter proposal a prover sends instead of a proof
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PresentationPreview {
    pub attributes: Vec<PreviewAttribute>,
    pub predicates: Vec<PreviewPredicate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PresentationProposal {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,

    pub presentation_proposal: PresentationPreview,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl PresentationProposal {
    pub fn new(preview: PresentationPreview, thid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            comment: None,
            presentation_proposal: preview,
            thread: Thread::new(thid),
        }
    }
}
