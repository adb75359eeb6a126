use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use super::Thread;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum AckStatus {
    #[serde(rename = "OK")]
    Ok,

    #[serde(rename = "FAIL")]
    Fail,

    #[serde(rename = "PENDING")]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Ack {
    #[serde(rename = "@id")]
    pub id: String,

    pub status: AckStatus,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Ack {
    pub fn new(thid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: AckStatus::Ok,
            thread: Thread::new(thid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Description {
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub en: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProblemReport {
    #[serde(rename = "@id")]
    pub id: String,

    pub description: Description,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl ProblemReport {
    pub fn new(thid: String, code: &str, explain: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: Description {
                code: code.to_string(),
                en: explain.clone(),
            },
            comment: explain,
            thread: Thread::new(thid),
        }
    }
}
