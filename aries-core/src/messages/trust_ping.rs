use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use super::Thread;

fn default_response_requested() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Ping {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default = "default_response_requested")]
    pub response_requested: bool,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
}

impl Ping {
    pub fn new(response_requested: bool, comment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            response_requested,
            comment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PingResponse {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl PingResponse {
    pub fn new(thid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            comment: None,
            thread: Thread::new(thid),
        }
    }
}
