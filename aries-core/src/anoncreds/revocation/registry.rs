use std::collections::BTreeSet;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::errors::AgentError;

use super::tails;
use super::types::{
    RevocationDelta, RevocationRegistryConfig, RevocationRegistryEntityAccessor,
    RevocationRegistryRecord, State,
};

/// RevocationRegistry is the issuer side of a revocation registry
///
/// `revoked` mirrors what is already on the ledger, `pending` holds local
/// revocations waiting for the next delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RevocationRegistry {
    pub(crate) rev_reg_id: String,
    pub(crate) cred_def_id: String,
    pub(crate) issuer_did: String,
    pub(crate) tag: String,
    pub(crate) max_creds: u32,
    pub(crate) tails_dir: String,
    pub(crate) tails_hash: String,
    pub(crate) tails_location: Option<String>,
    pub(crate) accumulator: String,
    pub(crate) next_index: u32,
    pub(crate) revoked: BTreeSet<u32>,
    pub(crate) pending: BTreeSet<u32>,
    pub(crate) state: State,
}

impl RevocationRegistry {
    pub fn build_id(issuer_did: &str, cred_def_id: &str, tag: &str) -> String {
        format!("{}:4:{}:CL_ACCUM:{}", issuer_did, cred_def_id, tag)
    }

    /// new validates the config and returns the registry along with its tails file
    pub fn new(config: RevocationRegistryConfig) -> Result<(Self, Vec<u8>), AgentError> {
        if config.max_creds == 0 {
            return Err(AgentError::ValidationError(
                "max_creds must be greater than zero".to_string(),
            ));
        }

        if config.tag.is_empty() || config.tails_dir.is_empty() {
            return Err(AgentError::ValidationError(
                "revocation registry tag and tails_dir are required".to_string(),
            ));
        }

        let rev_reg_id = Self::build_id(&config.issuer_did, &config.cred_def_id, &config.tag);
        let tails_file = tails::generate(&rev_reg_id, config.max_creds);
        let tails_hash = tails::tails_hash(&tails_file);
        let accumulator = tails::accumulator(&rev_reg_id, &BTreeSet::new());

        let registry = Self {
            rev_reg_id,
            cred_def_id: config.cred_def_id,
            issuer_did: config.issuer_did,
            tag: config.tag,
            max_creds: config.max_creds,
            tails_dir: config.tails_dir,
            tails_hash,
            tails_location: None,
            accumulator,
            next_index: 1,
            revoked: BTreeSet::new(),
            pending: BTreeSet::new(),
            state: State::Built,
        };

        Ok((registry, tails_file))
    }

    pub fn to_record(&self, tails_location: String) -> RevocationRegistryRecord {
        RevocationRegistryRecord {
            id: self.rev_reg_id.clone(),
            cred_def_id: self.cred_def_id.clone(),
            issuer_did: self.issuer_did.clone(),
            max_creds: self.max_creds,
            tails_location,
            tails_hash: self.tails_hash.clone(),
        }
    }

    pub fn initial_delta(&self) -> RevocationDelta {
        RevocationDelta {
            revoked: Vec::new(),
            accumulator: self.accumulator.clone(),
        }
    }

    pub fn allocate(&mut self) -> Result<u32, AgentError> {
        if self.next_index > self.max_creds {
            return Err(AgentError::ActionNotSupported(format!(
                "revocation registry {} is full",
                self.rev_reg_id
            )));
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(index)
    }

    /// revoke marks an issued index for the next delta, revoking twice is a no-op
    pub fn revoke(&mut self, index: u32) -> Result<bool, AgentError> {
        if index == 0 || index >= self.next_index {
            return Err(AgentError::ValidationError(format!(
                "credential index {} was never issued by {}",
                index, self.rev_reg_id
            )));
        }

        if self.revoked.contains(&index) {
            return Ok(false);
        }

        Ok(self.pending.insert(index))
    }

    /// pending_delta computes the delta for the pending revocations without applying it
    pub fn pending_delta(&self) -> Option<RevocationDelta> {
        if self.pending.is_empty() {
            return None;
        }

        let mut revoked = self.revoked.clone();
        revoked.extend(self.pending.iter().copied());

        Some(RevocationDelta {
            revoked: self.pending.iter().copied().collect(),
            accumulator: tails::accumulator(&self.rev_reg_id, &revoked),
        })
    }

    pub fn apply_delta(&mut self, delta: &RevocationDelta) {
        self.revoked.extend(delta.revoked.iter().copied());
        self.pending.clear();
        self.accumulator = delta.accumulator.clone();
    }
}

impl RevocationRegistryEntityAccessor for RevocationRegistry {
    fn get_rev_reg_id(&self) -> String {
        self.rev_reg_id.to_owned()
    }

    fn get_cred_def_id(&self) -> String {
        self.cred_def_id.to_owned()
    }

    fn get_issuer_did(&self) -> String {
        self.issuer_did.to_owned()
    }

    fn get_tag(&self) -> String {
        self.tag.to_owned()
    }

    fn get_max_creds(&self) -> u32 {
        self.max_creds
    }

    fn get_tails_dir(&self) -> String {
        self.tails_dir.to_owned()
    }

    fn get_tails_hash(&self) -> String {
        self.tails_hash.to_owned()
    }

    fn get_tails_location(&self) -> Option<String> {
        self.tails_location.clone()
    }

    fn get_accumulator(&self) -> String {
        self.accumulator.to_owned()
    }

    fn get_issued_count(&self) -> u32 {
        self.next_index - 1
    }

    fn get_revoked(&self) -> BTreeSet<u32> {
        self.revoked.clone()
    }

    fn get_pending_revocations(&self) -> BTreeSet<u32> {
        self.pending.clone()
    }

    fn get_state(&self) -> State {
        self.state
    }
}

impl ToJSON for RevocationRegistry {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for RevocationRegistry {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for RevocationRegistry {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_creds: u32) -> RevocationRegistryConfig {
        RevocationRegistryConfig {
            issuer_did: "issuer".to_string(),
            cred_def_id: "issuer:3:CL:schema:tag1".to_string(),
            tag: "tag1".to_string(),
            tails_dir: "/tmp/tails".to_string(),
            max_creds,
        }
    }

    #[test]
    fn test_new_registry() {
        let (registry, tails_file) = RevocationRegistry::new(config(3)).unwrap();
        assert_eq!(
            registry.get_rev_reg_id(),
            "issuer:4:issuer:3:CL:schema:tag1:CL_ACCUM:tag1".to_string()
        );
        assert_eq!(registry.get_tails_hash(), tails::tails_hash(&tails_file));
        assert_eq!(registry.get_state(), State::Built);
        assert_eq!(registry.get_issued_count(), 0);

        let zero = RevocationRegistry::new(config(0));
        assert!(matches!(zero, Err(AgentError::ValidationError(_))));
    }

    #[test]
    fn test_allocate_until_full() {
        let (mut registry, _) = RevocationRegistry::new(config(2)).unwrap();
        assert_eq!(registry.allocate().unwrap(), 1);
        assert_eq!(registry.allocate().unwrap(), 2);

        let full = registry.allocate();
        assert!(matches!(full, Err(AgentError::ActionNotSupported(_))));
    }

    #[test]
    fn test_revoke_and_delta() {
        let (mut registry, _) = RevocationRegistry::new(config(4)).unwrap();
        let _ = registry.allocate().unwrap();
        let _ = registry.allocate().unwrap();

        let unissued = registry.revoke(3);
        assert!(matches!(unissued, Err(AgentError::ValidationError(_))));
        assert!(registry.pending_delta().is_none());

        assert!(registry.revoke(2).unwrap());
        let delta = registry.pending_delta().unwrap();
        assert_eq!(delta.revoked, vec![2]);
        assert_ne!(delta.accumulator, registry.get_accumulator());

        registry.apply_delta(&delta);
        assert!(registry.get_pending_revocations().is_empty());
        assert!(registry.get_revoked().contains(&2));
        assert!(!registry.revoke(2).unwrap());
        assert!(registry.pending_delta().is_none());
    }

    #[test]
    fn test_round_trip() {
        let (mut registry, _) = RevocationRegistry::new(config(4)).unwrap();
        let _ = registry.allocate().unwrap();
        let _ = registry.revoke(1).unwrap();

        let bytes: Vec<u8> = registry.clone().try_into().unwrap();
        let restored = RevocationRegistry::try_from(bytes).unwrap();
        assert_eq!(restored, registry);
    }
}
