use rst_common::standard::serde::{self, Deserialize};

use crate::errors::AgentError;

use super::types::ToValidate;
use super::{Agent, Discovery, Tails};

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct AgentConfig {
    pub(super) agent: Agent,
    pub(super) tails: Tails,

    #[serde(default)]
    pub(super) discovery: Discovery,
}

impl AgentConfig {
    pub fn new(agent: Agent, tails: Tails, discovery: Discovery) -> Self {
        Self {
            agent,
            tails,
            discovery,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn tails(&self) -> &Tails {
        &self.tails
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent: Agent::default(),
            tails: Tails::default(),
            discovery: Discovery::default(),
        }
    }
}

impl ToValidate for AgentConfig {
    fn validate(&self) -> Result<(), AgentError> {
        _ = self.agent.validate()?;
        _ = self.tails.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::validate;

    #[test]
    fn test_validation_failed() {
        let cfg = AgentConfig::default();
        let validation = validate(&cfg);
        assert!(validation.is_err());
        assert!(matches!(
            validation.unwrap_err(),
            AgentError::ConfigError(_)
        ))
    }

    #[test]
    fn test_default_discovery_discloses_everything() {
        let cfg = AgentConfig::default();
        let protocols = cfg.discovery().get_protocols();
        assert!(protocols
            .iter()
            .any(|p| p.contains("issue-credential")));
        assert!(protocols.iter().any(|p| p.contains("present-proof")));
    }
}
