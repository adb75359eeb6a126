use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, info, warn};

use rstdev_domain::entity::ToJSON;

use crate::anoncreds::credential_definition::types::CredentialDefinitionAPI;
use crate::anoncreds::proof::{AttributeInfo, NonRevokedInterval, PredicateInfo, Proof, ProofRequest};
use crate::anoncreds::revocation::types::RegistryState;
use crate::collaborators::{LedgerBuilder, ProfileBuilder, WalletBuilder};
use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};
use crate::messages::notification::Ack;
use crate::messages::presentation::Presentation;
use crate::messages::AriesMessage;
use crate::protocols::connection::types::ConnectionAPI;
use crate::protocols::mailbox;
use crate::protocols::presentation::verification;

use super::types::{
    Action, ProofState, State, UsecaseBuilder, VerifiedProof, VerifierAPI,
    VerifierProofEntityAccessor,
};
use super::verifier::VerifierProof;

#[derive(Clone)]
pub struct Usecase<TProfile, TConnection, TCredDef>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
    TCredDef: CredentialDefinitionAPI + Send + Sync + 'static,
{
    profile: TProfile,
    connections: TConnection,
    cred_defs: TCredDef,
    cache: Arc<ObjectCache<VerifierProof>>,
}

impl<TProfile, TConnection, TCredDef> Usecase<TProfile, TConnection, TCredDef>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
    TCredDef: CredentialDefinitionAPI + Send + Sync + 'static,
{
    pub fn new(profile: TProfile, connections: TConnection, cred_defs: TCredDef) -> Self {
        Self {
            profile,
            connections,
            cred_defs,
            cache: Arc::new(ObjectCache::new("verifier-proof")),
        }
    }

    /// evaluate decides the proof state, an `Err` is only returned for collaborator
    /// failures worth retrying
    async fn evaluate(
        &self,
        request: &ProofRequest,
        presentation: &Presentation,
    ) -> Result<(Option<Proof>, ProofState), AgentError> {
        let proof = match presentation
            .presentations_attach
            .first()
            .map(|attachment| attachment.decode::<Proof>())
        {
            Some(Ok(proof)) => proof,
            Some(Err(err)) => {
                warn!("[verifier] undecodable proof: {}", err);
                return Ok((None, ProofState::Invalid));
            }
            None => {
                warn!("[verifier] presentation carries no proof");
                return Ok((None, ProofState::Invalid));
            }
        };

        match self.check(request, &proof).await {
            Ok(_) => Ok((Some(proof), ProofState::Verified)),
            Err(AgentError::VerificationFailed(reason))
            | Err(AgentError::NotFound(reason))
            | Err(AgentError::SerializationError(reason)) => {
                info!("[verifier] proof rejected: {}", reason);
                Ok((Some(proof), ProofState::Invalid))
            }
            Err(err) => Err(err),
        }
    }

    async fn check(&self, request: &ProofRequest, proof: &Proof) -> Result<(), AgentError> {
        for credential in proof.credentials.iter() {
            let cred_def = self
                .cred_defs
                .read_record(credential.cred_def_id.clone())
                .await?;

            if cred_def.schema_id != credential.schema_id {
                return Err(AgentError::VerificationFailed(format!(
                    "{} is not bound to schema {}",
                    credential.cred_def_id, credential.schema_id
                )));
            }

            let valid = self
                .profile
                .wallet()
                .verify(
                    cred_def.verkey,
                    credential.payload()?,
                    credential.signature_bytes()?,
                )
                .await?;

            if !valid {
                return Err(AgentError::VerificationFailed(format!(
                    "signature does not match {}",
                    credential.cred_def_id
                )));
            }
        }

        verification::check_requested(request, proof)?;

        let ledger = self.profile.ledger();
        for (index, interval) in verification::revocation_requirements(request, proof) {
            let credential = &proof.credentials[index];
            let rev_reg_id = credential.rev_reg_id.clone().ok_or_else(|| {
                AgentError::VerificationFailed("credential is not revocable".to_string())
            })?;

            let to = match interval.to {
                Some(to) => to,
                None => ledger.current_time().await?,
            };

            let deltas = ledger.read_rev_reg_deltas(rev_reg_id, to).await?;
            let state = RegistryState::latest(&deltas)?;
            verification::check_revocation(
                &NonRevokedInterval::new(interval.from, Some(to)),
                state.as_ref(),
                credential,
            )?;
        }

        Ok(())
    }

    async fn step(
        &self,
        verifier: &mut VerifierProof,
        message: &AriesMessage,
    ) -> Result<(), AgentError> {
        let transition = verifier.transition(message)?;

        match transition.action {
            None => {
                *verifier = transition.next;
            }
            Some(Action::Verify(presentation)) => {
                let (proof, proof_state) = self.evaluate(&verifier.request, &presentation).await?;
                *verifier = transition.next.verified(proof, proof_state);

                // the verdict stands once reached, a lost ack only leaves the prover waiting
                match verifier.connection_handle {
                    Some(connection_handle) => {
                        let ack =
                            AriesMessage::PresentationAck(Ack::new(verifier.thread_id.clone()));
                        if let Err(err) = self.connections.send_message(connection_handle, ack).await
                        {
                            warn!(
                                "[verifier:{}] ack not delivered: {}",
                                verifier.source_id, err
                            );
                        }
                    }
                    None => warn!(
                        "[verifier:{}] no connection to acknowledge on",
                        verifier.source_id
                    ),
                }

                info!(
                    "[verifier:{}] proof is {}",
                    verifier.source_id, verifier.proof_state
                );
            }
        }

        debug!("[verifier:{}] now {}", verifier.source_id, verifier.state);
        Ok(())
    }
}

impl<TProfile, TConnection, TCredDef> UsecaseBuilder<VerifierProof>
    for Usecase<TProfile, TConnection, TCredDef>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
    TCredDef: CredentialDefinitionAPI + Send + Sync + 'static,
{
    type ProfileImplementer = TProfile;
    type ConnectionImplementer = TConnection;
    type CredentialDefinitionImplementer = TCredDef;

    fn profile(&self) -> Self::ProfileImplementer {
        self.profile.clone()
    }

    fn connections(&self) -> Self::ConnectionImplementer {
        self.connections.clone()
    }

    fn cred_defs(&self) -> Self::CredentialDefinitionImplementer {
        self.cred_defs.clone()
    }
}

#[async_trait]
impl<TProfile, TConnection, TCredDef> VerifierAPI for Usecase<TProfile, TConnection, TCredDef>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
    TCredDef: CredentialDefinitionAPI + Send + Sync + 'static,
{
    type EntityAccessor = VerifierProof;

    async fn create(
        &self,
        source_id: String,
        requested_attributes: Vec<AttributeInfo>,
        requested_predicates: Vec<PredicateInfo>,
        non_revoked: Option<NonRevokedInterval>,
        name: String,
    ) -> Result<Handle, AgentError> {
        let request = ProofRequest::new(name, requested_attributes, requested_predicates, non_revoked);
        let verifier = VerifierProof::new(source_id, request)?;
        Ok(self.cache.insert(verifier).await)
    }

    async fn send_presentation_request(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let next = guard.request_sent(Some(connection_handle))?;

        let message = AriesMessage::PresentationRequest(guard.request_msg.clone());
        self.connections
            .send_message(connection_handle, message)
            .await?;

        *guard = next;
        debug!(
            "[verifier:{}] request sent on thread {}",
            guard.source_id, guard.thread_id
        );
        Ok(())
    }

    async fn mark_presentation_request_msg_sent(&self, handle: Handle) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        *guard = guard.request_sent(None)?;
        Ok(())
    }

    async fn get_request_msg(&self, handle: Handle) -> Result<AriesMessage, AgentError> {
        let verifier = self.cache.snapshot(handle).await?;
        Ok(AriesMessage::PresentationRequest(verifier.request_msg))
    }

    async fn update_state(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<State, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let thread_id = guard.thread_id.clone();

        let received = mailbox::next_on_thread(
            &self.connections,
            connection_handle,
            &thread_id,
            VerifierProof::accepts,
        )
        .await?;

        if let Some(received) = received {
            if guard.connection_handle.is_none() {
                guard.connection_handle = Some(connection_handle);
            }

            let before = guard.clone();
            let outcome = self.step(&mut guard, &received.message).await;
            mailbox::consume(
                &self.connections,
                connection_handle,
                received,
                &outcome,
                &before,
                &*guard,
            )
            .await?;
            outcome?;
        }

        Ok(guard.state)
    }

    async fn update_state_with_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<State, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        self.step(&mut guard, &message).await?;
        Ok(guard.state)
    }

    async fn get_proof_state(&self, handle: Handle) -> Result<ProofState, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_proof_state())
    }

    async fn get_proof_msg(&self, handle: Handle) -> Result<VerifiedProof, AgentError> {
        let verifier = self.cache.snapshot(handle).await?;
        if verifier.state != State::Finished {
            return Err(AgentError::InvalidState(format!(
                "verifier {} has not received a proof",
                verifier.source_id
            )));
        }

        Ok(VerifiedProof {
            proof_state: verifier.proof_state,
            proof: verifier.proof,
        })
    }

    async fn get_state(&self, handle: Handle) -> Result<State, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_state())
    }

    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_thread_id())
    }

    async fn get_proof(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError> {
        self.cache.snapshot(handle).await
    }

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        self.cache
            .snapshot(handle)
            .await?
            .to_json()
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    async fn deserialize(&self, data: String) -> Result<Handle, AgentError> {
        let verifier = VerifierProof::try_from(data.into_bytes())?;
        Ok(self.cache.insert(verifier).await)
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}
