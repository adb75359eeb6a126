use std::collections::BTreeSet;

use crate::anoncreds::proof::{
    satisfies_restrictions, NonRevokedInterval, Proof, ProofCredential, ProofRequest,
};
use crate::anoncreds::revocation::tails;
use crate::anoncreds::revocation::types::RegistryState;
use crate::errors::AgentError;

fn rejected(reason: String) -> AgentError {
    AgentError::VerificationFailed(reason)
}

/// check_requested matches the proof against the request: the nonce, every requested
/// attribute and predicate, and their restrictions
pub fn check_requested(request: &ProofRequest, proof: &Proof) -> Result<(), AgentError> {
    if proof.nonce != request.nonce {
        return Err(rejected("nonce does not match the request".to_string()));
    }

    let requested = &proof.requested_proof;
    for (referent, info) in request.requested_attributes.iter() {
        if let Some(revealed) = requested.revealed_attrs.get(referent) {
            let credential = credential_at(proof, revealed.sub_proof_index, referent)?;
            if credential.values.get(&info.name) != Some(&revealed.raw) {
                return Err(rejected(format!(
                    "{} reveals a value the credential does not hold",
                    referent
                )));
            }

            if !satisfies_restrictions(
                &info.restrictions,
                &credential.schema_id,
                &credential.cred_def_id,
            ) {
                return Err(rejected(format!("{} violates its restrictions", referent)));
            }

            continue;
        }

        if requested.self_attested_attrs.contains_key(referent) {
            if !info.restrictions.is_empty() {
                return Err(rejected(format!(
                    "{} is restricted and cannot be self attested",
                    referent
                )));
            }

            continue;
        }

        return Err(rejected(format!("{} is missing from the proof", referent)));
    }

    for (referent, info) in request.requested_predicates.iter() {
        let proved = requested
            .predicates
            .get(referent)
            .ok_or_else(|| rejected(format!("{} is missing from the proof", referent)))?;

        let credential = credential_at(proof, proved.sub_proof_index, referent)?;
        let value = credential
            .values
            .get(&info.name)
            .and_then(|raw| raw.parse::<i64>().ok())
            .ok_or_else(|| rejected(format!("{} has no numeric {}", referent, info.name)))?;

        if !info.p_type.holds(value, info.p_value) {
            return Err(rejected(format!(
                "{} does not satisfy {} {} {}",
                referent, info.name, info.p_type, info.p_value
            )));
        }

        if !satisfies_restrictions(
            &info.restrictions,
            &credential.schema_id,
            &credential.cred_def_id,
        ) {
            return Err(rejected(format!("{} violates its restrictions", referent)));
        }
    }

    Ok(())
}

fn credential_at<'a>(
    proof: &'a Proof,
    index: usize,
    referent: &str,
) -> Result<&'a ProofCredential, AgentError> {
    proof
        .credentials
        .get(index)
        .ok_or_else(|| rejected(format!("{} points to unknown credential {}", referent, index)))
}

/// revocation_requirements pairs every disclosed revocable credential with the
/// intervals requested for the referents it answers
pub fn revocation_requirements(
    request: &ProofRequest,
    proof: &Proof,
) -> Vec<(usize, NonRevokedInterval)> {
    let mut seen = BTreeSet::new();
    let mut requirements = Vec::new();

    let attributes = proof
        .requested_proof
        .revealed_attrs
        .iter()
        .map(|(referent, revealed)| (revealed.sub_proof_index, request.attribute_interval(referent)));
    let predicates = proof
        .requested_proof
        .predicates
        .iter()
        .map(|(referent, proved)| (proved.sub_proof_index, request.predicate_interval(referent)));

    for (index, interval) in attributes.chain(predicates) {
        let interval = match interval {
            Some(interval) => interval,
            None => continue,
        };

        let revocable = proof
            .credentials
            .get(index)
            .map(|credential| credential.rev_reg_id.is_some())
            .unwrap_or(false);

        if revocable && seen.insert((index, interval.from, interval.to)) {
            requirements.push((index, interval));
        }
    }

    requirements
}

/// check_revocation validates one credential's non-revocation proof
///
/// `state` is the registry folded from every delta at or before the interval's `to`.
/// Its timestamp must be strictly after `from` and equal to the one the prover used,
/// the index must not be revoked in it, and the witness must recompute.
pub fn check_revocation(
    interval: &NonRevokedInterval,
    state: Option<&RegistryState>,
    credential: &ProofCredential,
) -> Result<(), AgentError> {
    let rev_reg_id = credential
        .rev_reg_id
        .as_deref()
        .ok_or_else(|| rejected("credential is not revocable".to_string()))?;

    let state = state.ok_or_else(|| {
        rejected(format!(
            "{} has no published state at or before {:?}",
            rev_reg_id, interval.to
        ))
    })?;

    if let Some(from) = interval.from {
        if state.timestamp <= from {
            return Err(rejected(format!(
                "{} state at {} is not after {}",
                rev_reg_id, state.timestamp, from
            )));
        }
    }

    let (index, timestamp, witness) = match (
        credential.cred_rev_id,
        credential.timestamp,
        credential.witness.as_ref(),
    ) {
        (Some(index), Some(timestamp), Some(witness)) => (index, timestamp, witness),
        _ => return Err(rejected("non-revocation proof is missing".to_string())),
    };

    if timestamp != state.timestamp {
        return Err(rejected(format!(
            "proof made at {}, registry state is at {}",
            timestamp, state.timestamp
        )));
    }

    if state.is_revoked(index) {
        return Err(rejected(format!("{} index {} is revoked", rev_reg_id, index)));
    }

    let expected = tails::witness(&tails::entry_for(rev_reg_id, index), &state.accumulator);
    if *witness != expected {
        return Err(rejected(format!("{} witness does not match", rev_reg_id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use table_test::table_test;

    use crate::anoncreds::proof::{
        AttributeInfo, PredicateInfo, PredicateType, ProvedPredicate, RequestedProof,
        Restriction, RevealedAttribute,
    };

    const REV_REG_ID: &str = "issuer:4:issuer:3:CL:schema:tag1:CL_ACCUM:tag1";

    fn state(timestamp: i64, revoked: Vec<u32>) -> RegistryState {
        let revoked: BTreeSet<u32> = revoked.into_iter().collect();
        RegistryState {
            timestamp,
            accumulator: tails::accumulator(REV_REG_ID, &revoked),
            revoked,
        }
    }

    fn proved_against(state: &RegistryState, index: u32) -> ProofCredential {
        ProofCredential {
            schema_id: "issuer:2:degree:1.0".to_string(),
            cred_def_id: "issuer:3:CL:issuer:2:degree:1.0:tag1".to_string(),
            values: BTreeMap::new(),
            signature: String::new(),
            rev_reg_id: Some(REV_REG_ID.to_string()),
            cred_rev_id: Some(index),
            timestamp: Some(state.timestamp),
            witness: Some(tails::witness(
                &tails::entry_for(REV_REG_ID, index),
                &state.accumulator,
            )),
        }
    }

    #[test]
    fn test_interval_bounds() {
        let at_t2 = state(200, vec![]);
        let after_t2 = state(201, vec![]);

        let table = vec![
            ((NonRevokedInterval::new(None, Some(200)), Some(at_t2.clone())), true),
            ((NonRevokedInterval::new(None, Some(200)), None), false),
            ((NonRevokedInterval::new(Some(100), Some(200)), Some(at_t2.clone())), true),
            ((NonRevokedInterval::new(Some(200), Some(200)), Some(at_t2.clone())), false),
            ((NonRevokedInterval::new(Some(199), None), Some(after_t2.clone())), true),
        ];

        for (validator, (interval, registry), expected) in table_test!(table) {
            let credential = match registry.as_ref() {
                Some(registry) => proved_against(registry, 1),
                None => proved_against(&after_t2, 1),
            };

            validator
                .given(&format!("{:?} against {:?}", interval, registry))
                .when("check the non-revocation proof")
                .then("only states inside the interval verify")
                .assert_eq(
                    expected,
                    check_revocation(&interval, registry.as_ref(), &credential).is_ok(),
                );
        }
    }

    #[test]
    fn test_revoked_index_rejected() {
        let registry = state(300, vec![2]);
        let interval = NonRevokedInterval::new(None, Some(300));

        assert!(check_revocation(&interval, Some(&registry), &proved_against(&registry, 1)).is_ok());
        let revoked = check_revocation(&interval, Some(&registry), &proved_against(&registry, 2));
        assert!(matches!(revoked, Err(AgentError::VerificationFailed(_))));
    }

    #[test]
    fn test_stale_witness_rejected() {
        let before = state(100, vec![]);
        let after = state(200, vec![3]);
        let interval = NonRevokedInterval::new(None, Some(200));

        let mut stale = proved_against(&before, 1);
        stale.timestamp = Some(200);
        let outcome = check_revocation(&interval, Some(&after), &stale);
        assert!(matches!(outcome, Err(AgentError::VerificationFailed(_))));
    }

    fn request() -> ProofRequest {
        ProofRequest::new(
            "proof".to_string(),
            vec![
                AttributeInfo::new(
                    "name".to_string(),
                    vec![Restriction::with_cred_def_id(
                        "issuer:3:CL:issuer:2:degree:1.0:tag1".to_string(),
                    )],
                ),
                AttributeInfo::new("nickname".to_string(), vec![]),
            ],
            vec![PredicateInfo::new(
                "age".to_string(),
                PredicateType::GE,
                18,
                vec![],
            )],
            None,
        )
    }

    fn proof_for(request: &ProofRequest, age: &str) -> Proof {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), "alice".to_string());
        values.insert("age".to_string(), age.to_string());

        let mut requested = RequestedProof::default();
        requested.revealed_attrs.insert(
            "attribute_0".to_string(),
            RevealedAttribute {
                sub_proof_index: 0,
                raw: "alice".to_string(),
            },
        );
        requested
            .self_attested_attrs
            .insert("attribute_1".to_string(), "ali".to_string());
        requested
            .predicates
            .insert("predicate_0".to_string(), ProvedPredicate { sub_proof_index: 0 });

        Proof {
            nonce: request.nonce.clone(),
            credentials: vec![ProofCredential {
                schema_id: "issuer:2:degree:1.0".to_string(),
                cred_def_id: "issuer:3:CL:issuer:2:degree:1.0:tag1".to_string(),
                values,
                signature: String::new(),
                rev_reg_id: None,
                cred_rev_id: None,
                timestamp: None,
                witness: None,
            }],
            requested_proof: requested,
        }
    }

    #[test]
    fn test_check_requested() {
        let request = request();
        assert!(check_requested(&request, &proof_for(&request, "25")).is_ok());

        let underage = check_requested(&request, &proof_for(&request, "17"));
        assert!(matches!(underage, Err(AgentError::VerificationFailed(_))));

        let mut replayed = proof_for(&request, "25");
        replayed.nonce = "other".to_string();
        assert!(check_requested(&request, &replayed).is_err());

        let mut forged = proof_for(&request, "25");
        forged
            .requested_proof
            .revealed_attrs
            .get_mut("attribute_0")
            .unwrap()
            .raw = "mallory".to_string();
        assert!(check_requested(&request, &forged).is_err());

        let mut attested = proof_for(&request, "25");
        attested.requested_proof.revealed_attrs.remove("attribute_0");
        attested
            .requested_proof
            .self_attested_attrs
            .insert("attribute_0".to_string(), "alice".to_string());
        assert!(check_requested(&request, &attested).is_err());
    }

    #[test]
    fn test_revocation_requirements() {
        let mut request = request();
        request.non_revoked = Some(NonRevokedInterval::new(None, Some(50)));

        let mut proof = proof_for(&request, "25");
        assert!(revocation_requirements(&request, &proof).is_empty());

        proof.credentials[0].rev_reg_id = Some(REV_REG_ID.to_string());
        let requirements = revocation_requirements(&request, &proof);
        assert_eq!(requirements, vec![(0, NonRevokedInterval::new(None, Some(50)))]);
    }
}
