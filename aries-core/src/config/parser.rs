use rstdev_config::format::use_toml;
use rstdev_config::parser::from_file;
use rstdev_config::{types::ConfigError, Builder};

use crate::errors::AgentError;

use super::types::ToValidate;
use super::AgentConfig;

pub struct Parser {
    conf_file: String,
}

impl Parser {
    pub fn new(conf_file: String) -> Self {
        Self { conf_file }
    }

    /// parse loads the TOML file and validates it, a file that parses but misses
    /// a required value is reported as [`AgentError::ConfigError`]
    pub fn parse(&self) -> Result<AgentConfig, AgentError> {
        let config_toml = {
            let config_builder: Result<AgentConfig, ConfigError> =
                Builder::new(from_file(self.conf_file.to_owned()))
                    .fetch()
                    .map_err(|err| AgentError::ConfigError(err.to_string()))?
                    .parse(use_toml);

            config_builder.map_err(|err| AgentError::ConfigError(err.to_string()))?
        };

        config_toml.validate()?;
        Ok(config_toml)
    }
}
