use std::collections::BTreeSet;
use std::fmt::Debug;

use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;

use crate::collaborators::{LedgerDelta, TxnReceipt};
use crate::errors::AgentError;
use crate::handle::Handle;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum State {
    Built,
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RevocationRegistryConfig {
    pub issuer_did: String,
    pub cred_def_id: String,
    pub tag: String,
    pub tails_dir: String,
    pub max_creds: u32,
}

/// RevocationRegistryRecord is the registry definition written to the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RevocationRegistryRecord {
    pub id: String,
    pub cred_def_id: String,
    pub issuer_did: String,
    pub max_creds: u32,
    pub tails_location: String,
    pub tails_hash: String,
}

/// RevocationDelta lists the indices revoked since the previous delta and the
/// accumulator value after applying them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RevocationDelta {
    pub revoked: Vec<u32>,
    pub accumulator: String,
}

/// RegistryState is a registry as seen on the ledger at one delta timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryState {
    pub timestamp: i64,
    pub revoked: BTreeSet<u32>,
    pub accumulator: String,
}

impl RegistryState {
    /// latest folds the ledger deltas, oldest first, into the most recent state
    pub fn latest(deltas: &[LedgerDelta]) -> Result<Option<Self>, AgentError> {
        let mut state: Option<RegistryState> = None;
        for delta in deltas.iter() {
            let parsed: RevocationDelta = serde_json::from_str(&delta.data)
                .map_err(|err| AgentError::SerializationError(err.to_string()))?;

            let mut revoked = state
                .as_ref()
                .map(|current| current.revoked.clone())
                .unwrap_or_default();
            revoked.extend(parsed.revoked);

            state = Some(RegistryState {
                timestamp: delta.timestamp,
                revoked,
                accumulator: parsed.accumulator,
            });
        }

        Ok(state)
    }

    pub fn is_revoked(&self, index: u32) -> bool {
        self.revoked.contains(&index)
    }
}

pub trait RevocationRegistryEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_rev_reg_id(&self) -> String;
    fn get_cred_def_id(&self) -> String;
    fn get_issuer_did(&self) -> String;
    fn get_tag(&self) -> String;
    fn get_max_creds(&self) -> u32;
    fn get_tails_dir(&self) -> String;
    fn get_tails_hash(&self) -> String;
    fn get_tails_location(&self) -> Option<String>;
    fn get_accumulator(&self) -> String;
    fn get_issued_count(&self) -> u32;
    fn get_revoked(&self) -> BTreeSet<u32>;
    fn get_pending_revocations(&self) -> BTreeSet<u32>;
    fn get_state(&self) -> State;
}

#[async_trait]
pub trait RevocationRegistryAPI: Clone {
    type EntityAccessor: RevocationRegistryEntityAccessor;

    /// create sizes the registry, writes `<tails_dir>/<tails_hash>` and returns the
    /// registry in `Built`
    async fn create(&self, config: RevocationRegistryConfig) -> Result<Handle, AgentError>;

    /// publish writes the definition with the tails location and the initial delta
    async fn publish(&self, handle: Handle, tails_location: String) -> Result<(), AgentError>;

    /// publish_revocations writes the indices revoked since the last publish, `None`
    /// when there was nothing to publish
    async fn publish_revocations(&self, handle: Handle)
        -> Result<Option<TxnReceipt>, AgentError>;

    /// allocate_index reserves the next credential index, failing once the
    /// registry is full
    async fn allocate_index(&self, handle: Handle) -> Result<u32, AgentError>;

    async fn revoke_local(&self, handle: Handle, index: u32) -> Result<(), AgentError>;

    async fn get_registry(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError>;
    async fn get_rev_reg_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_tails_hash(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_tails_location(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_state(&self, handle: Handle) -> Result<State, AgentError>;

    async fn read_record(&self, rev_reg_id: String)
        -> Result<RevocationRegistryRecord, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(timestamp: i64, revoked: Vec<u32>, accumulator: &str) -> LedgerDelta {
        LedgerDelta {
            timestamp,
            data: serde_json::to_string(&RevocationDelta {
                revoked,
                accumulator: accumulator.to_string(),
            })
            .unwrap(),
        }
    }

    #[test]
    fn test_latest_folds_deltas() {
        let deltas = vec![
            delta(10, vec![], "a"),
            delta(20, vec![2], "b"),
            delta(30, vec![5], "c"),
        ];

        let state = RegistryState::latest(&deltas).unwrap().unwrap();
        assert_eq!(state.timestamp, 30);
        assert_eq!(state.accumulator, "c".to_string());
        assert!(state.is_revoked(2));
        assert!(state.is_revoked(5));
        assert!(!state.is_revoked(1));

        assert!(RegistryState::latest(&[]).unwrap().is_none());
    }
}
