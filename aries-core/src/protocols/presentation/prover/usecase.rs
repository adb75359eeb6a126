use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json;
use rst_common::with_logging::log::{debug, info, warn};

use rstdev_domain::entity::ToJSON;

use crate::anoncreds::revocation::tails;
use crate::anoncreds::revocation::types::RegistryState;
use crate::anoncreds::revocation::TailsCache;
use crate::collaborators::{CredentialRecord, LedgerBuilder, ProfileBuilder, WalletBuilder};
use crate::config::Tails;
use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};
use crate::messages::notification::ProblemReport;
use crate::messages::presentation::{
    Presentation, PresentationPreview, PresentationProposal, PresentationRequest,
};
use crate::messages::{AriesMessage, Attachment};
use crate::protocols::connection::types::ConnectionAPI;
use crate::protocols::mailbox;
use crate::protocols::presentation::PRESENTATION_ATTACHMENT_ID;

use super::prover::{DisclosedProof, Draft};
use super::types::{
    DisclosedProofEntityAccessor, ProverAPI, RetrievedCredentials, SelectedCredentials, State,
    UsecaseBuilder,
};

#[derive(Clone)]
pub struct Usecase<TProfile, TConnection>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    profile: TProfile,
    connections: TConnection,
    download_dir: PathBuf,
    cache: Arc<ObjectCache<DisclosedProof>>,
}

impl<TProfile, TConnection> Usecase<TProfile, TConnection>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    pub fn new(profile: TProfile, connections: TConnection, tails: Tails) -> Self {
        Self {
            profile,
            connections,
            download_dir: tails.get_download_dir(),
            cache: Arc::new(ObjectCache::new("disclosed-proof")),
        }
    }

    /// prove_non_revocation attaches a witness for the latest registry state at or
    /// before the interval end, the credential may well be revoked in it
    async fn prove_non_revocation(&self, draft: &mut Draft) -> Result<(), AgentError> {
        let cache = TailsCache::new(self.profile.tails(), self.download_dir.clone());
        let ledger = self.profile.ledger();

        for (position, interval) in draft.intervals.clone() {
            let source = draft.sources.get(position).cloned().ok_or_else(|| {
                AgentError::InvalidState(format!("no credential at position {}", position))
            })?;

            let (rev_reg_id, index, location, tails_hash) = match (
                source.rev_reg_id,
                source.cred_rev_id,
                source.tails_location,
                source.tails_hash,
            ) {
                (Some(rev_reg_id), Some(index), Some(location), Some(tails_hash)) => {
                    (rev_reg_id, index, location, tails_hash)
                }
                _ => {
                    return Err(AgentError::ValidationError(format!(
                        "{} lacks its revocation details",
                        source.cred_def_id
                    )))
                }
            };

            let file = cache.fetch(&location, &tails_hash).await?;
            let entry = tails::read_entry(&file, index)?;

            let to = match interval.to {
                Some(to) => to,
                None => ledger.current_time().await?,
            };
            let deltas = ledger.read_rev_reg_deltas(rev_reg_id.clone(), to).await?;
            let state = RegistryState::latest(&deltas)?.ok_or_else(|| {
                AgentError::VerificationFailed(format!(
                    "{} has no published state at or before {}",
                    rev_reg_id, to
                ))
            })?;

            if state.is_revoked(index) {
                warn!("[prover] {} index {} is revoked at {}", rev_reg_id, index, state.timestamp);
            }

            if let Some(credential) = draft.proof.credentials.get_mut(position) {
                credential.timestamp = Some(state.timestamp);
                credential.witness = Some(tails::witness(&entry, &state.accumulator));
            }
        }

        Ok(())
    }

    async fn settle_request(&self, connection_handle: Handle, thread_id: &str) {
        let outcome = mailbox::settle(&self.connections, connection_handle, |message| {
            matches!(message, AriesMessage::PresentationRequest(request) if request.id == thread_id)
        })
        .await;

        if let Err(err) = outcome {
            warn!("[prover] request {} stays in the mailbox: {}", thread_id, err);
        }
    }

    fn presentation(prover: &DisclosedProof) -> Result<AriesMessage, AgentError> {
        let attachment = Attachment::from_json(PRESENTATION_ATTACHMENT_ID, prover.require_proof()?)?;
        Ok(AriesMessage::Presentation(Presentation::new(
            attachment,
            prover.thread_id.clone(),
        )))
    }
}

impl<TProfile, TConnection> UsecaseBuilder<DisclosedProof> for Usecase<TProfile, TConnection>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    type ProfileImplementer = TProfile;
    type ConnectionImplementer = TConnection;

    fn profile(&self) -> Self::ProfileImplementer {
        self.profile.clone()
    }

    fn connections(&self) -> Self::ConnectionImplementer {
        self.connections.clone()
    }
}

#[async_trait]
impl<TProfile, TConnection> ProverAPI for Usecase<TProfile, TConnection>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    type EntityAccessor = DisclosedProof;

    async fn create_with_request(
        &self,
        source_id: String,
        request: PresentationRequest,
    ) -> Result<Handle, AgentError> {
        let prover = DisclosedProof::new(source_id, request)?;
        Ok(self.cache.insert(prover).await)
    }

    async fn get_requests(
        &self,
        connection_handle: Handle,
    ) -> Result<Vec<PresentationRequest>, AgentError> {
        let messages = self.connections.download_messages(connection_handle).await?;
        Ok(messages
            .into_iter()
            .filter_map(|received| match received.message {
                AriesMessage::PresentationRequest(request) => Some(request),
                _ => None,
            })
            .collect())
    }

    async fn get_proof_request_attachment(&self, handle: Handle) -> Result<String, AgentError> {
        let prover = self.cache.snapshot(handle).await?;
        serde_json::to_string(&prover.request)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    async fn retrieve_credentials(
        &self,
        handle: Handle,
    ) -> Result<RetrievedCredentials, AgentError> {
        let prover = self.cache.snapshot(handle).await?;
        let records = self.profile.wallet().list_credentials().await?;
        Ok(prover.retrieve(&records))
    }

    async fn generate_proof(
        &self,
        handle: Handle,
        selected: SelectedCredentials,
        self_attested: BTreeMap<String, String>,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        if !matches!(guard.state, State::RequestReceived | State::ProofGenerated) {
            return Err(AgentError::InvalidState(format!(
                "prover {} cannot generate a proof in {}",
                guard.source_id, guard.state
            )));
        }

        let records: BTreeMap<String, CredentialRecord> = self
            .profile
            .wallet()
            .list_credentials()
            .await?
            .into_iter()
            .map(|record| (record.referent.clone(), record))
            .collect();

        let mut draft = guard.assemble(&selected, &self_attested, &records)?;
        self.prove_non_revocation(&mut draft).await?;

        *guard = guard.proof_generated(draft.proof)?;
        debug!(
            "[prover:{}] proof generated over {} credentials",
            guard.source_id,
            guard.require_proof()?.credentials.len()
        );
        Ok(())
    }

    async fn send_proof(&self, handle: Handle, connection_handle: Handle) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let next = guard.proof_sent(connection_handle)?;

        let message = Self::presentation(&guard)?;
        self.connections
            .send_message(connection_handle, message)
            .await?;
        *guard = next;

        self.settle_request(connection_handle, &guard.thread_id).await;
        info!("[prover:{}] proof sent", guard.source_id);
        Ok(())
    }

    async fn decline_presentation_request(
        &self,
        handle: Handle,
        connection_handle: Handle,
        reason: Option<String>,
        proposal: Option<PresentationPreview>,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let next = guard.declined(reason.clone())?;

        let message = match (reason, proposal) {
            (None, None) => {
                return Err(AgentError::ValidationError(
                    "declining needs a reason or a proposal".to_string(),
                ))
            }
            (reason, Some(preview)) => {
                let mut proposal = PresentationProposal::new(preview, guard.thread_id.clone());
                proposal.comment = reason;
                AriesMessage::PresentationProposal(proposal)
            }
            (reason, None) => AriesMessage::ProblemReport(ProblemReport::new(
                guard.thread_id.clone(),
                "request-rejected",
                reason,
            )),
        };

        self.connections
            .send_message(connection_handle, message)
            .await?;
        *guard = next;

        self.settle_request(connection_handle, &guard.thread_id).await;
        info!("[prover:{}] declined the request", guard.source_id);
        Ok(())
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
            DisclosedProof::accepts,
        )
        .await?;

        if let Some(received) = received {
            let before = guard.clone();
            let outcome = guard.transition(&received.message).map(|next| {
                *guard = next;
            });

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
            debug!("[prover:{}] now {}", guard.source_id, guard.state);
        }

        Ok(guard.state)
    }

    async fn update_state_with_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<State, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        *guard = guard.transition(&message)?;
        Ok(guard.state)
    }

    async fn get_proof_msg(&self, handle: Handle) -> Result<AriesMessage, AgentError> {
        let prover = self.cache.snapshot(handle).await?;
        Self::presentation(&prover)
    }

    async fn get_state(&self, handle: Handle) -> Result<State, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_state())
    }

    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_thread_id())
    }

    async fn get_disclosed_proof(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError> {
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
        let prover = DisclosedProof::try_from(data.into_bytes())?;
        Ok(self.cache.insert(prover).await)
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}
