use rst_common::standard::serde::{self, Deserialize};

use crate::messages::PROTOCOLS_SUPPORTED;

/// `[discovery]` section, the protocols disclosed when a peer sends a feature query
///
/// When the section is absent every protocol implemented by this crate is disclosed
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Discovery {
    #[serde(default)]
    pub(super) protocols: Vec<String>,
}

impl Discovery {
    pub fn new(protocols: Vec<String>) -> Self {
        Self { protocols }
    }

    pub fn get_protocols(&self) -> Vec<String> {
        self.protocols.clone()
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            protocols: PROTOCOLS_SUPPORTED.iter().map(|p| p.to_string()).collect(),
        }
    }
}
