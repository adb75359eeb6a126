use rst_common::standard::serde::{self, Deserialize, Serialize};

/// Thread is the `~thread` decorator, `thid` names the exchange and `pthid` its parent
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Thread {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pthid: Option<String>,
}

impl Thread {
    pub fn new(thid: String) -> Self {
        Self {
            thid: Some(thid),
            pthid: None,
        }
    }

    pub fn with_parent(thid: String, pthid: String) -> Self {
        Self {
            thid: Some(thid),
            pthid: Some(pthid),
        }
    }
}
