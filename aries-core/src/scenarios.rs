//! Multi-agent flows driven over the in-memory ledger and transport
use std::collections::BTreeMap;

use rst_common::with_tokio::tokio;

use crate::agent::Dispatched;
use crate::anoncreds::proof::{
    AttributeInfo, NonRevokedInterval, PredicateInfo, PredicateType, Restriction,
};
use crate::anoncreds::revocation::types::RevocationRegistryAPI;
use crate::collaborators::{LedgerBuilder, ProfileBuilder, WalletBuilder};
use crate::handle::Handle;
use crate::messages::out_of_band::{GoalCode, Service};
use crate::protocols::connection::types::ConnectionAPI;
use crate::protocols::issuance::holder::types::HolderAPI;
use crate::protocols::issuance::issuer::types::{IssuerAPI, State as IssuerState};
use crate::protocols::out_of_band::receiver::types::ReceiverAPI;
use crate::protocols::out_of_band::sender::types::{OutOfBandConfig, SenderAPI};
use crate::protocols::presentation::prover::types::{ProverAPI, State as ProverState};
use crate::protocols::presentation::verifier::types::{
    ProofState, State as VerifierState, VerifierAPI,
};
use crate::testing::{connect, issue, network, publish_cred_def, values, Published, TestAgent};

fn degree_request(published: &Published) -> (Vec<AttributeInfo>, Vec<PredicateInfo>) {
    let restrictions = vec![Restriction::with_cred_def_id(published.cred_def_id.clone())];

    let attributes = vec![AttributeInfo::new(
        "name".to_string(),
        restrictions.clone(),
    )];
    let predicates = vec![PredicateInfo::new(
        "age".to_string(),
        PredicateType::GE,
        18,
        restrictions,
    )];

    (attributes, predicates)
}

/// present runs a proof request over a connection and returns the verdict
async fn present(
    verifier: &TestAgent,
    prover: &TestAgent,
    connections: (Handle, Handle),
    published: &Published,
    non_revoked: Option<NonRevokedInterval>,
) -> ProofState {
    let (verifier_conn, prover_conn) = connections;
    let (attributes, predicates) = degree_request(published);

    let verifier_handle = verifier
        .verifiers()
        .create(
            "degree-check".to_string(),
            attributes,
            predicates,
            non_revoked,
            "degree-check".to_string(),
        )
        .await
        .unwrap();
    verifier
        .verifiers()
        .send_presentation_request(verifier_handle, verifier_conn)
        .await
        .unwrap();

    let requests = prover.provers().get_requests(prover_conn).await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = requests[0].clone();

    let prover_handle = prover
        .provers()
        .create_with_request("degree-check".to_string(), request)
        .await
        .unwrap();
    let retrieved = prover
        .provers()
        .retrieve_credentials(prover_handle)
        .await
        .unwrap();
    prover
        .provers()
        .generate_proof(prover_handle, retrieved.select_first(), BTreeMap::new())
        .await
        .unwrap();
    prover
        .provers()
        .send_proof(prover_handle, prover_conn)
        .await
        .unwrap();

    let state = verifier
        .verifiers()
        .update_state(verifier_handle, verifier_conn)
        .await
        .unwrap();
    assert_eq!(state, VerifierState::Finished);

    let state = prover
        .provers()
        .update_state(prover_handle, prover_conn)
        .await
        .unwrap();
    assert_eq!(state, ProverState::Finished);

    verifier
        .verifiers()
        .get_proof_state(verifier_handle)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_revocable_issuance() {
    let network = network();
    let faber = network.agent("faber");
    let alice = network.agent("alice");

    let connections = connect(&faber, &alice).await;
    let published = publish_cred_def(&faber, true).await;
    let (issuer_handle, holder_handle) = issue(
        &faber,
        &alice,
        connections,
        &published,
        values("alice", "25"),
    )
    .await;

    let rev_reg = published.rev_reg.unwrap();
    let expected_location = faber
        .registries()
        .get_tails_location(rev_reg)
        .await
        .unwrap();
    let expected_hash = faber.registries().get_tails_hash(rev_reg).await.unwrap();

    let holders = alice.holders();
    assert_eq!(
        holders.get_tails_location(holder_handle).await.unwrap(),
        expected_location
    );
    assert_eq!(
        holders.get_tails_hash(holder_handle).await.unwrap(),
        expected_hash
    );
    assert_eq!(
        holders.get_rev_reg_id(holder_handle).await.unwrap(),
        published.rev_reg_id.clone()
    );

    let attributes = holders.get_attributes(holder_handle).await.unwrap();
    assert_eq!(attributes.get("name"), Some(&"alice".to_string()));

    assert!(faber.issuers().is_revokable(issuer_handle).await.unwrap());
    assert_eq!(
        faber.issuers().get_rev_reg_id(issuer_handle).await.unwrap(),
        published.rev_reg_id.unwrap()
    );

    let stored = alice.profile().wallet().list_credentials().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].credential.schema_id, published.schema_id);

    let tails_dir = published.tails_dir.unwrap();
    assert!(expected_location.starts_with(&tails_dir.display().to_string()));
}

#[tokio::test]
async fn test_out_of_band_request_over_existing_connection() {
    let network = network();
    let faber = network.agent("faber");
    let alice = network.agent("alice");

    let (faber_conn, alice_conn) = connect(&faber, &alice).await;
    let published = publish_cred_def(&faber, false).await;
    issue(
        &faber,
        &alice,
        (faber_conn, alice_conn),
        &published,
        values("alice", "25"),
    )
    .await;

    let (attributes, predicates) = degree_request(&published);
    let verifier_handle = faber
        .verifiers()
        .create(
            "oob-check".to_string(),
            attributes,
            predicates,
            None,
            "oob-check".to_string(),
        )
        .await
        .unwrap();
    let request = faber
        .verifiers()
        .get_request_msg(verifier_handle)
        .await
        .unwrap();
    faber
        .verifiers()
        .mark_presentation_request_msg_sent(verifier_handle)
        .await
        .unwrap();

    let info = faber.connections().info(faber_conn).await.unwrap();
    let sender = faber
        .oob_senders()
        .create(
            "oob-check".to_string(),
            OutOfBandConfig {
                label: Some("faber".to_string()),
                goal_code: Some(GoalCode::RequestProof),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    faber
        .oob_senders()
        .append_service(
            sender,
            Service::new(vec![info.my_verkey], "http://faber".to_string()),
        )
        .await
        .unwrap();
    faber
        .oob_senders()
        .append_message(sender, request)
        .await
        .unwrap();
    let invitation = faber.oob_senders().to_message(sender).await.unwrap();

    let receiver = alice
        .oob_receivers()
        .create_with_message("oob-check".to_string(), invitation)
        .await
        .unwrap();
    let existing = alice
        .oob_receivers()
        .connection_exists(receiver, vec![alice_conn])
        .await
        .unwrap();
    assert_eq!(existing, Some(alice_conn));

    alice
        .oob_receivers()
        .send_handshake_reuse(receiver, alice_conn)
        .await
        .unwrap();
    faber.connections().update_state(faber_conn).await.unwrap();

    let prover_handle = match alice.dispatch_out_of_band(receiver, alice_conn).await.unwrap() {
        Dispatched::Prover(handle) => handle,
        other => panic!("unexpected dispatch: {:?}", other),
    };

    let retrieved = alice
        .provers()
        .retrieve_credentials(prover_handle)
        .await
        .unwrap();
    alice
        .provers()
        .generate_proof(prover_handle, retrieved.select_first(), BTreeMap::new())
        .await
        .unwrap();
    alice
        .provers()
        .send_proof(prover_handle, alice_conn)
        .await
        .unwrap();

    let state = faber
        .verifiers()
        .update_state(verifier_handle, faber_conn)
        .await
        .unwrap();
    assert_eq!(state, VerifierState::Finished);
    assert_eq!(
        faber.verifiers().get_proof_state(verifier_handle).await.unwrap(),
        ProofState::Verified
    );

    let verified = faber
        .verifiers()
        .get_proof_msg(verifier_handle)
        .await
        .unwrap();
    let proof = verified.proof.unwrap();
    let revealed = proof.requested_proof.revealed_attrs.values().next().unwrap();
    assert_eq!(revealed.raw, "alice".to_string());
}

#[tokio::test]
async fn test_revocation_observed_by_verifier() {
    let network = network();
    let faber = network.agent("faber");
    let alice = network.agent("alice");

    let connections = connect(&faber, &alice).await;
    let published = publish_cred_def(&faber, true).await;
    let (issuer_handle, _) = issue(
        &faber,
        &alice,
        connections,
        &published,
        values("alice", "25"),
    )
    .await;

    let issued_at = network.ledger.current_time().await.unwrap();
    let state = present(
        &faber,
        &alice,
        connections,
        &published,
        Some(NonRevokedInterval::new(None, None)),
    )
    .await;
    assert_eq!(state, ProofState::Verified);

    faber
        .issuers()
        .revoke_credential_local(issuer_handle)
        .await
        .unwrap();
    assert_eq!(
        faber.issuers().get_state(issuer_handle).await.unwrap(),
        IssuerState::Revoked
    );

    // nothing reaches the ledger before the registry publishes
    let state = present(
        &faber,
        &alice,
        connections,
        &published,
        Some(NonRevokedInterval::new(None, None)),
    )
    .await;
    assert_eq!(state, ProofState::Verified);

    network.ledger.advance_time(60).await;
    let receipt = faber
        .registries()
        .publish_revocations(published.rev_reg.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(receipt.timestamp > issued_at);

    let state = present(
        &faber,
        &alice,
        connections,
        &published,
        Some(NonRevokedInterval::new(None, None)),
    )
    .await;
    assert_eq!(state, ProofState::Invalid);

    let state = present(
        &faber,
        &alice,
        connections,
        &published,
        Some(NonRevokedInterval::new(None, Some(receipt.timestamp))),
    )
    .await;
    assert_eq!(state, ProofState::Invalid);

    let state = present(
        &faber,
        &alice,
        connections,
        &published,
        Some(NonRevokedInterval::new(None, Some(receipt.timestamp - 1))),
    )
    .await;
    assert_eq!(state, ProofState::Verified);
}

#[tokio::test]
async fn test_unrevocable_credential_ignores_interval() {
    let network = network();
    let faber = network.agent("faber");
    let alice = network.agent("alice");

    let connections = connect(&faber, &alice).await;
    let published = publish_cred_def(&faber, false).await;
    issue(
        &faber,
        &alice,
        connections,
        &published,
        values("alice", "25"),
    )
    .await;

    let state = present(
        &faber,
        &alice,
        connections,
        &published,
        Some(NonRevokedInterval::new(None, None)),
    )
    .await;
    assert_eq!(state, ProofState::Verified);
}

#[tokio::test]
async fn test_predicate_not_met_cannot_be_proven() {
    let network = network();
    let faber = network.agent("faber");
    let alice = network.agent("alice");

    let (faber_conn, alice_conn) = connect(&faber, &alice).await;
    let published = publish_cred_def(&faber, false).await;
    issue(
        &faber,
        &alice,
        (faber_conn, alice_conn),
        &published,
        values("alice", "16"),
    )
    .await;

    let (attributes, predicates) = degree_request(&published);
    let verifier_handle = faber
        .verifiers()
        .create(
            "adult".to_string(),
            attributes,
            predicates,
            None,
            "adult".to_string(),
        )
        .await
        .unwrap();
    faber
        .verifiers()
        .send_presentation_request(verifier_handle, faber_conn)
        .await
        .unwrap();

    let request = alice.provers().get_requests(alice_conn).await.unwrap()[0].clone();
    let prover_handle = alice
        .provers()
        .create_with_request("adult".to_string(), request)
        .await
        .unwrap();
    let retrieved = alice
        .provers()
        .retrieve_credentials(prover_handle)
        .await
        .unwrap();
    let generated = alice
        .provers()
        .generate_proof(prover_handle, retrieved.select_first(), BTreeMap::new())
        .await;
    assert!(generated.is_err());

    alice
        .provers()
        .decline_presentation_request(
            prover_handle,
            alice_conn,
            Some("not old enough".to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        alice.provers().get_state(prover_handle).await.unwrap(),
        ProverState::Declined
    );

    let state = faber
        .verifiers()
        .update_state(verifier_handle, faber_conn)
        .await
        .unwrap();
    assert_eq!(state, VerifierState::Failed);
}
