use std::path::PathBuf;

use rst_common::standard::serde::{self, Deserialize};

use crate::errors::AgentError;

use super::types::ToValidate;

/// `[tails]` section, where a holder keeps tails files it has already verified
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Tails {
    pub(super) download_dir: String,
}

impl Tails {
    pub fn new(download_dir: String) -> Self {
        Self { download_dir }
    }

    pub fn get_download_dir(&self) -> PathBuf {
        PathBuf::from(&self.download_dir)
    }
}

impl Default for Tails {
    fn default() -> Self {
        Self {
            download_dir: String::from(""),
        }
    }
}

impl ToValidate for Tails {
    fn validate(&self) -> Result<(), AgentError> {
        if self.download_dir.is_empty() {
            return Err(AgentError::ConfigError(
                "config: tails:download_dir is missing".to_string(),
            ));
        }

        Ok(())
    }
}
