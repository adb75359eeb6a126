use rst_common::standard::serde::{self, Deserialize};

use crate::errors::AgentError;

use super::types::ToValidate;

/// `[agent]` section, the identity this agent presents in invitations and handshakes
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Agent {
    pub(super) label: String,
    pub(super) service_endpoint: String,
}

impl Agent {
    pub fn new(label: String, service_endpoint: String) -> Self {
        Self {
            label,
            service_endpoint,
        }
    }

    pub fn get_label(&self) -> String {
        self.label.to_owned()
    }

    pub fn get_service_endpoint(&self) -> String {
        self.service_endpoint.to_owned()
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            label: String::from(""),
            service_endpoint: String::from(""),
        }
    }
}

impl ToValidate for Agent {
    fn validate(&self) -> Result<(), AgentError> {
        if self.label.is_empty() {
            return Err(AgentError::ConfigError(
                "config: agent:label is missing".to_string(),
            ));
        }

        if self.service_endpoint.is_empty() {
            return Err(AgentError::ConfigError(
                "config: agent:service_endpoint is missing".to_string(),
            ));
        }

        Ok(())
    }
}
