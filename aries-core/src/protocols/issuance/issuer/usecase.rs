use std::collections::BTreeMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, info};

use rstdev_domain::entity::ToJSON;

use crate::anoncreds::credential::Credential;
use crate::anoncreds::credential_definition::types::{
    CredentialDefinitionAPI, CredentialDefinitionEntityAccessor, State as CredentialDefinitionState,
};
use crate::anoncreds::revocation::types::{
    RevocationRegistryAPI, RevocationRegistryEntityAccessor, State as RevocationRegistryState,
};
use crate::collaborators::{ProfileBuilder, WalletBuilder};
use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};
use crate::messages::issuance::IssueCredential;
use crate::messages::{AriesMessage, Attachment};
use crate::protocols::connection::types::ConnectionAPI;
use crate::protocols::issuance::payload::CREDENTIAL_ATTACHMENT_ID;
use crate::protocols::mailbox;

use super::issuer::{IssuerCredential, OfferBinding};
use super::types::{IssuerAPI, IssuerCredentialEntityAccessor, State, UsecaseBuilder};

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
    cache: Arc<ObjectCache<IssuerCredential>>,
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
            cache: Arc::new(ObjectCache::new("issuer-credential")),
        }
    }

    async fn bind(
        &self,
        cred_def_handle: Handle,
        rev_reg_handle: Option<Handle>,
        attributes: &BTreeMap<String, String>,
    ) -> Result<OfferBinding, AgentError> {
        let cred_def = self.cred_defs.get_cred_def(cred_def_handle).await?;
        if cred_def.get_state() != CredentialDefinitionState::Published {
            return Err(AgentError::InvalidState(format!(
                "credential definition {} is not published",
                cred_def.get_cred_def_id()
            )));
        }

        IssuerCredential::check_attributes(&cred_def.get_attr_names(), attributes)?;

        let mut binding = OfferBinding {
            cred_def_handle,
            cred_def_id: cred_def.get_cred_def_id(),
            schema_id: cred_def.get_schema_id(),
            rev_reg_handle: None,
            rev_reg_id: None,
            tails_location: None,
            tails_hash: None,
        };

        match (cred_def.get_support_revocation(), rev_reg_handle) {
            (false, None) => Ok(binding),
            (false, Some(_)) => Err(AgentError::ActionNotSupported(format!(
                "credential definition {} does not support revocation",
                binding.cred_def_id
            ))),
            (true, None) => Err(AgentError::ValidationError(format!(
                "credential definition {} requires a revocation registry",
                binding.cred_def_id
            ))),
            (true, Some(rev_reg_handle)) => {
                let registry = self.registries.get_registry(rev_reg_handle).await?;
                if registry.get_state() != RevocationRegistryState::Published {
                    return Err(AgentError::InvalidState(format!(
                        "revocation registry {} is not published",
                        registry.get_rev_reg_id()
                    )));
                }

                if registry.get_cred_def_id() != binding.cred_def_id {
                    return Err(AgentError::ValidationError(format!(
                        "revocation registry {} belongs to {}",
                        registry.get_rev_reg_id(),
                        registry.get_cred_def_id()
                    )));
                }

                binding.rev_reg_handle = Some(rev_reg_handle);
                binding.rev_reg_id = Some(registry.get_rev_reg_id());
                binding.tails_location = registry.get_tails_location();
                binding.tails_hash = Some(registry.get_tails_hash());
                Ok(binding)
            }
        }
    }

    /// prepare signs the credential once, later retries reuse it and its index
    async fn prepare(&self, issuer: &mut IssuerCredential) -> Result<Credential, AgentError> {
        if let Some(credential) = issuer.credential.clone() {
            return Ok(credential);
        }

        let binding = issuer.require_binding()?.clone();
        let cred_def = self.cred_defs.get_cred_def(binding.cred_def_handle).await?;

        let cred_rev_id = match binding.rev_reg_handle {
            Some(rev_reg_handle) => Some(self.registries.allocate_index(rev_reg_handle).await?),
            None => None,
        };

        let payload = Credential::signing_payload(
            &binding.schema_id,
            &binding.cred_def_id,
            binding.rev_reg_id.as_deref(),
            cred_rev_id,
            &issuer.attributes,
        )?;
        let signature = self
            .profile
            .wallet()
            .sign(cred_def.get_verkey(), payload)
            .await?;

        let credential = Credential {
            schema_id: binding.schema_id,
            cred_def_id: binding.cred_def_id,
            issuer_did: cred_def.get_issuer_did(),
            values: issuer.attributes.clone(),
            signature: Credential::encode_signature(&signature),
            rev_reg_id: binding.rev_reg_id,
            cred_rev_id,
            tails_location: binding.tails_location,
            tails_hash: binding.tails_hash,
        };

        issuer.credential = Some(credential.clone());
        Ok(credential)
    }

    fn apply(issuer: &mut IssuerCredential, message: &AriesMessage) -> Result<(), AgentError> {
        let next = issuer.transition(message)?;
        debug!(
            "[issuer:{}] {} -> {} on {}",
            issuer.source_id,
            issuer.state,
            next.state,
            message.name()
        );

        *issuer = next;
        if IssuerCredential::is_terminal(issuer.state) {
            info!("[issuer:{}] reached {}", issuer.source_id, issuer.state);
        }

        Ok(())
    }
}

impl<TProfile, TConnection, TCredDef, TRevReg> UsecaseBuilder<IssuerCredential>
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
impl<TProfile, TConnection, TCredDef, TRevReg> IssuerAPI
    for Usecase<TProfile, TConnection, TCredDef, TRevReg>
where
    TProfile: ProfileBuilder,
    TConnection: ConnectionAPI + Send + Sync + 'static,
    TCredDef: CredentialDefinitionAPI + Send + Sync + 'static,
    TRevReg: RevocationRegistryAPI + Send + Sync + 'static,
{
    type EntityAccessor = IssuerCredential;

    async fn create(&self, source_id: String) -> Result<Handle, AgentError> {
        Ok(self.cache.insert(IssuerCredential::new(source_id)).await)
    }

    async fn build_credential_offer_msg(
        &self,
        handle: Handle,
        cred_def_handle: Handle,
        rev_reg_handle: Option<Handle>,
        attributes: BTreeMap<String, String>,
        comment: Option<String>,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        guard.require_state(State::Initial, "build an offer")?;

        let binding = self.bind(cred_def_handle, rev_reg_handle, &attributes).await?;
        *guard = guard.build_offer(binding, attributes, comment)?;

        debug!(
            "[issuer:{}] offer built on thread {:?}",
            guard.source_id, guard.thread_id
        );
        Ok(())
    }

    async fn get_offer_msg(&self, handle: Handle) -> Result<AriesMessage, AgentError> {
        let issuer = self.cache.snapshot(handle).await?;
        issuer
            .offer
            .map(AriesMessage::CredentialOffer)
            .ok_or_else(|| {
                AgentError::InvalidState(format!("issuer {} has no offer", issuer.source_id))
            })
    }

    async fn mark_credential_offer_msg_sent(&self, handle: Handle) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        *guard = guard.offer_sent(None)?;
        Ok(())
    }

    async fn send_credential_offer(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        guard.require_state(State::OfferBuilt, "send the offer")?;

        let offer = guard
            .offer
            .clone()
            .map(AriesMessage::CredentialOffer)
            .ok_or_else(|| {
                AgentError::InvalidState(format!("issuer {} has no offer", guard.source_id))
            })?;

        self.connections
            .send_message(connection_handle, offer)
            .await?;

        *guard = guard.offer_sent(Some(connection_handle))?;
        Ok(())
    }

    async fn update_state(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<State, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let thread_id = guard.require_thread_id()?;

        let received = mailbox::next_on_thread(
            &self.connections,
            connection_handle,
            &thread_id,
            IssuerCredential::accepts,
        )
        .await?;

        if let Some(received) = received {
            let before = guard.clone();
            let outcome = Self::apply(&mut guard, &received.message);
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

        if guard.connection_handle.is_none() {
            guard.connection_handle = Some(connection_handle);
        }

        Ok(guard.state)
    }

    async fn update_state_with_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<State, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        Self::apply(&mut guard, &message)?;
        Ok(guard.state)
    }

    async fn send_credential(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        guard.require_state(State::RequestReceived, "send a credential")?;
        let thread_id = guard.require_thread_id()?;

        let credential = self.prepare(&mut guard).await?;
        let attachment = Attachment::from_json(CREDENTIAL_ATTACHMENT_ID, &credential)?;
        let message = AriesMessage::IssueCredential(IssueCredential::new(attachment, thread_id));

        self.connections
            .send_message(connection_handle, message)
            .await?;

        *guard = guard.credential_sent(credential);
        info!(
            "[issuer:{}] credential sent, revocation index {:?}",
            guard.source_id,
            guard.get_cred_rev_id()
        );
        Ok(())
    }

    async fn revoke_credential_local(&self, handle: Handle) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let binding = guard.require_binding()?.clone();

        let rev_reg_handle = binding.rev_reg_handle.ok_or_else(|| {
            AgentError::ActionNotSupported(format!(
                "credential definition {} does not support revocation",
                binding.cred_def_id
            ))
        })?;

        let next = guard.revoked()?;
        let index = guard.get_cred_rev_id().ok_or_else(|| {
            AgentError::InvalidState(format!(
                "issuer {} has no revocation index",
                guard.source_id
            ))
        })?;

        self.registries.revoke_local(rev_reg_handle, index).await?;
        *guard = next;

        info!("[issuer:{}] revoked index {}", guard.source_id, index);
        Ok(())
    }

    async fn is_revokable(&self, handle: Handle) -> Result<bool, AgentError> {
        let issuer = self.cache.snapshot(handle).await?;
        Ok(issuer.require_binding()?.rev_reg_id.is_some())
    }

    async fn get_rev_reg_id(&self, handle: Handle) -> Result<String, AgentError> {
        let issuer = self.cache.snapshot(handle).await?;
        issuer.get_rev_reg_id().ok_or_else(|| {
            AgentError::ActionNotSupported(format!(
                "issuer {} credential is not revocable",
                issuer.source_id
            ))
        })
    }

    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError> {
        self.cache.snapshot(handle).await?.require_thread_id()
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
        let issuer = IssuerCredential::try_from(data.into_bytes())?;
        Ok(self.cache.insert(issuer).await)
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}
