use std::collections::BTreeMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json;
use rst_common::with_logging::log::{debug, info, warn};

use rstdev_domain::entity::ToJSON;

use crate::anoncreds::credential::Credential;
use crate::anoncreds::credential_definition::types::CredentialDefinitionAPI;
use crate::anoncreds::revocation::types::RevocationRegistryAPI;
use crate::collaborators::{CredentialRecord, ProfileBuilder, WalletBuilder};
use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};
use crate::messages::issuance::{CredentialOffer, CredentialRequest};
use crate::messages::notification::{Ack, ProblemReport};
use crate::messages::{AriesMessage, Attachment};
use crate::protocols::connection::types::ConnectionAPI;
use crate::protocols::issuance::payload::{RequestPayload, REQUEST_ATTACHMENT_ID};
use crate::protocols::mailbox;

use super::holder::HolderCredential;
use super::types::{Action, HolderAPI, HolderCredentialEntityAccessor, State, UsecaseBuilder};

#[derive(Clone)]
pub struct Usecase<TProfile, TConnection, TCredDef, TRevReg>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
    TCredDef: CredentialDefinitionAPI + Send + Sync + 'static,
    TRevReg: RevocationRegistryAPI + Send + Sync + 'static,
{
    profile: TProfile,
    connections: TConnection,
    cred_defs: TCredDef,
    registries: TRevReg,
    cache: Arc<ObjectCache<HolderCredential>>,
}

impl<TProfile, TConnection, TCredDef, TRevReg> Usecase<TProfile, TConnection, TCredDef, TRevReg>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
    TCredDef: CredentialDefinitionAPI + Send + Sync + 'static,
    TRevReg: RevocationRegistryAPI + Send + Sync + 'static,
{
    pub fn new(
        profile: TProfile,
        connections: TConnection,
        cred_defs: TCredDef,
        registries: TRevReg,
    ) -> Self {
        Self {
            profile,
            connections,
            cred_defs,
            registries,
            cache: Arc::new(ObjectCache::new("holder-credential")),
        }
    }

    /// verify checks the issuer signature against the ledger credential definition and,
    /// for a revocable credential, the tails published for its registry
    async fn verify(
        &self,
        holder: &HolderCredential,
        credential: &Credential,
    ) -> Result<(), AgentError> {
        holder.check_issued(credential)?;

        let cred_def = self
            .cred_defs
            .read_record(credential.cred_def_id.clone())
            .await?;
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
                "credential signature does not match {}",
                credential.cred_def_id
            )));
        }

        if let Some(rev_reg_id) = credential.rev_reg_id.clone() {
            let registry = self.registries.read_record(rev_reg_id).await?;
            if Some(&registry.tails_hash) != credential.tails_hash.as_ref()
                || Some(&registry.tails_location) != credential.tails_location.as_ref()
            {
                return Err(AgentError::VerificationFailed(format!(
                    "credential tails do not match registry {}",
                    registry.id
                )));
            }
        }

        Ok(())
    }

    async fn step(
        &self,
        holder: &mut HolderCredential,
        message: &AriesMessage,
    ) -> Result<(), AgentError> {
        let transition = holder.transition(message)?;

        match transition.action {
            None => {
                *holder = transition.next;
            }
            Some(Action::StoreCredential(credential)) => {
                self.verify(holder, &credential).await?;

                let record = CredentialRecord::new(credential.clone());
                let referent = record.referent.clone();
                self.profile.wallet().store_credential(record).await?;
                *holder = transition.next.stored(referent, credential);

                // the credential is stored by now, a lost ack only leaves the issuer waiting
                match holder.connection_handle {
                    Some(connection_handle) => {
                        let ack = AriesMessage::CredentialAck(Ack::new(holder.thread_id.clone()));
                        if let Err(err) = self.connections.send_message(connection_handle, ack).await
                        {
                            warn!("[holder:{}] ack not delivered: {}", holder.source_id, err);
                        }
                    }
                    None => warn!(
                        "[holder:{}] no connection to acknowledge on",
                        holder.source_id
                    ),
                }
            }
        }

        debug!("[holder:{}] now {}", holder.source_id, holder.state);
        if HolderCredential::is_terminal(holder.state) {
            info!("[holder:{}] reached {}", holder.source_id, holder.state);
        }

        Ok(())
    }

    async fn settle_offer(&self, connection_handle: Handle, thread_id: &str) {
        let outcome = mailbox::settle(&self.connections, connection_handle, |message| {
            matches!(message, AriesMessage::CredentialOffer(offer) if offer.id == thread_id)
        })
        .await;

        if let Err(err) = outcome {
            warn!("[holder] offer {} stays in the mailbox: {}", thread_id, err);
        }
    }
}

impl<TProfile, TConnection, TCredDef, TRevReg> UsecaseBuilder<HolderCredential>
    for Usecase<TProfile, TConnection, TCredDef, TRevReg>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
    TCredDef: CredentialDefinitionAPI + Send + Sync + 'static,
    TRevReg: RevocationRegistryAPI + Send + Sync + 'static,
{
    type ProfileImplementer = TProfile;
    type ConnectionImplementer = TConnection;
    type CredentialDefinitionImplementer = TCredDef;
    type RevocationRegistryImplementer = TRevReg;

    fn profile(&self) -> Self::ProfileImplementer {
        self.profile.clone()
    }

    fn connections(&self) -> Self::ConnectionImplementer {
        self.connections.clone()
    }

    fn cred_defs(&self) -> Self::CredentialDefinitionImplementer {
        self.cred_defs.clone()
    }

    fn registries(&self) -> Self::RevocationRegistryImplementer {
        self.registries.clone()
    }
}

#[async_trait]
impl<TProfile, TConnection, TCredDef, TRevReg> HolderAPI
    for Usecase<TProfile, TConnection, TCredDef, TRevReg>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
    TCredDef: CredentialDefinitionAPI + Send + Sync + 'static,
    TRevReg: RevocationRegistryAPI + Send + Sync + 'static,
{
    type EntityAccessor = HolderCredential;

    async fn create_with_offer(
        &self,
        source_id: String,
        offer: CredentialOffer,
    ) -> Result<Handle, AgentError> {
        let holder = HolderCredential::new(source_id, offer)?;
        Ok(self.cache.insert(holder).await)
    }

    async fn get_offers(
        &self,
        connection_handle: Handle,
    ) -> Result<Vec<CredentialOffer>, AgentError> {
        let messages = self.connections.download_messages(connection_handle).await?;
        Ok(messages
            .into_iter()
            .filter_map(|received| match received.message {
                AriesMessage::CredentialOffer(offer) => Some(offer),
                _ => None,
            })
            .collect())
    }

    async fn send_request(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let next = guard.request_sent(connection_handle)?;

        let payload = RequestPayload {
            prover_did: self.connections.get_pw_did(connection_handle).await?,
            cred_def_id: guard.payload.cred_def_id.clone(),
            nonce: guard.payload.nonce.clone(),
        };
        let attachment = Attachment::from_json(REQUEST_ATTACHMENT_ID, &payload)?;
        let request = AriesMessage::CredentialRequest(CredentialRequest::new(
            attachment,
            guard.thread_id.clone(),
        ));

        self.connections
            .send_message(connection_handle, request)
            .await?;
        *guard = next;

        self.settle_offer(connection_handle, &guard.thread_id).await;
        debug!("[holder:{}] request sent", guard.source_id);
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
            HolderCredential::accepts,
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

    async fn decline_offer(
        &self,
        handle: Handle,
        connection_handle: Handle,
        comment: Option<String>,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let next = guard.declined(comment.clone())?;

        let report = AriesMessage::ProblemReport(ProblemReport::new(
            guard.thread_id.clone(),
            "issuance-abandoned",
            comment,
        ));
        self.connections
            .send_message(connection_handle, report)
            .await?;
        *guard = next;

        self.settle_offer(connection_handle, &guard.thread_id).await;
        info!("[holder:{}] declined the offer", guard.source_id);
        Ok(())
    }

    async fn get_attributes(&self, handle: Handle) -> Result<BTreeMap<String, String>, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_attributes())
    }

    async fn get_attachment(&self, handle: Handle) -> Result<String, AgentError> {
        let holder = self.cache.snapshot(handle).await?;
        serde_json::to_string(&holder.payload)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    async fn get_tails_location(&self, handle: Handle) -> Result<String, AgentError> {
        let holder = self.cache.snapshot(handle).await?;
        holder.require_credential()?.tails_location.clone().ok_or_else(|| {
            AgentError::ActionNotSupported(format!(
                "holder {} credential is not revocable",
                holder.source_id
            ))
        })
    }

    async fn get_tails_hash(&self, handle: Handle) -> Result<String, AgentError> {
        let holder = self.cache.snapshot(handle).await?;
        holder.require_credential()?.tails_hash.clone().ok_or_else(|| {
            AgentError::ActionNotSupported(format!(
                "holder {} credential is not revocable",
                holder.source_id
            ))
        })
    }

    async fn get_rev_reg_id(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        Ok(self.cache.snapshot(handle).await?.payload.rev_reg_id)
    }

    async fn get_credential_id(&self, handle: Handle) -> Result<String, AgentError> {
        let holder = self.cache.snapshot(handle).await?;
        holder.get_credential_id().ok_or_else(|| {
            AgentError::InvalidState(format!(
                "holder {} has no stored credential",
                holder.source_id
            ))
        })
    }

    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_thread_id())
    }

    async fn get_state(&self, handle: Handle) -> Result<State, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_state())
    }

    async fn get_credential(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError> {
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
        let holder = HolderCredential::try_from(data.into_bytes())?;
        Ok(self.cache.insert(holder).await)
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}
