use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::errors::AgentError;

pub const TAILS_VERSION: [u8; 2] = [0, 2];

const HEADER_LEN: usize = 6;
const ENTRY_LEN: usize = 32;

/// entry_for derives the tails entry of one credential index
pub fn entry_for(rev_reg_id: &str, index: u32) -> [u8; ENTRY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(b"tails");
    hasher.update(rev_reg_id.as_bytes());
    hasher.update(index.to_be_bytes());
    hasher.finalize().into()
}

/// generate builds a tails file: a version header, the capacity, then one entry per
/// credential index starting at 1
pub fn generate(rev_reg_id: &str, max_creds: u32) -> Vec<u8> {
    let mut tails = Vec::with_capacity(HEADER_LEN + ENTRY_LEN * max_creds as usize);
    tails.extend_from_slice(&TAILS_VERSION);
    tails.extend_from_slice(&max_creds.to_be_bytes());

    for index in 1..=max_creds {
        tails.extend_from_slice(&entry_for(rev_reg_id, index));
    }

    tails
}

pub fn capacity(tails: &[u8]) -> Result<u32, AgentError> {
    if tails.len() < HEADER_LEN || tails[..2] != TAILS_VERSION {
        return Err(AgentError::VerificationFailed(
            "tails header is invalid".to_string(),
        ));
    }

    let mut raw = [0u8; 4];
    raw.copy_from_slice(&tails[2..HEADER_LEN]);
    Ok(u32::from_be_bytes(raw))
}

pub fn read_entry(tails: &[u8], index: u32) -> Result<[u8; ENTRY_LEN], AgentError> {
    let max_creds = capacity(tails)?;
    if index == 0 || index > max_creds {
        return Err(AgentError::ValidationError(format!(
            "credential index {} out of range",
            index
        )));
    }

    let start = HEADER_LEN + (index as usize - 1) * ENTRY_LEN;
    let end = start + ENTRY_LEN;
    if tails.len() < end {
        return Err(AgentError::VerificationFailed(
            "tails file is truncated".to_string(),
        ));
    }

    let mut entry = [0u8; ENTRY_LEN];
    entry.copy_from_slice(&tails[start..end]);
    Ok(entry)
}

/// tails_hash is the content address of a tails file, base58 of its SHA-256
pub fn tails_hash(tails: &[u8]) -> String {
    bs58::encode(Sha256::digest(tails)).into_string()
}

pub fn verify_tails(tails: &[u8], expected_hash: &str) -> Result<(), AgentError> {
    let actual = tails_hash(tails);
    if actual != expected_hash {
        return Err(AgentError::VerificationFailed(format!(
            "tails hash mismatch: expected {}, got {}",
            expected_hash, actual
        )));
    }

    Ok(())
}

/// accumulator commits to the registry id and the full set of revoked indices
pub fn accumulator(rev_reg_id: &str, revoked: &BTreeSet<u32>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rev_reg_id.as_bytes());
    for index in revoked.iter() {
        hasher.update(index.to_be_bytes());
    }

    hex::encode(hasher.finalize())
}

/// witness binds a tails entry to one accumulator value
pub fn witness(entry: &[u8; ENTRY_LEN], accumulator: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry);
    hasher.update(accumulator.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_read() {
        let tails = generate("rev-reg", 3);
        assert_eq!(capacity(&tails).unwrap(), 3);
        assert_eq!(read_entry(&tails, 2).unwrap(), entry_for("rev-reg", 2));

        let out_of_range = read_entry(&tails, 4);
        assert!(matches!(out_of_range, Err(AgentError::ValidationError(_))));
        let zero = read_entry(&tails, 0);
        assert!(matches!(zero, Err(AgentError::ValidationError(_))));
    }

    #[test]
    fn test_single_byte_mutation_rejected() {
        let tails = generate("rev-reg", 5);
        let hash = tails_hash(&tails);
        assert!(verify_tails(&tails, &hash).is_ok());

        let mut mutated = tails.clone();
        let last = mutated.len() - 1;
        mutated[last] ^= 0x01;

        let verified = verify_tails(&mutated, &hash);
        assert!(matches!(verified, Err(AgentError::VerificationFailed(_))));
    }

    #[test]
    fn test_accumulator_tracks_revocations() {
        let empty = accumulator("rev-reg", &BTreeSet::new());
        let revoked: BTreeSet<u32> = vec![2].into_iter().collect();
        let after = accumulator("rev-reg", &revoked);
        assert_ne!(empty, after);

        let entry = entry_for("rev-reg", 1);
        assert_ne!(witness(&entry, &empty), witness(&entry, &after));
    }
}
