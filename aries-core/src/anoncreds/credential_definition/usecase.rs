use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json;
use rst_common::with_logging::log::info;

use rstdev_domain::entity::ToJSON;

use crate::anoncreds::schema::types::SchemaRecord;
use crate::collaborators::{LedgerBuilder, ProfileBuilder, RecordKind, WalletBuilder};
use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};

use super::credential_definition::CredentialDefinition;
use super::types::{
    CredentialDefinitionAPI, CredentialDefinitionEntityAccessor, CredentialDefinitionRecord,
    State,
};

#[derive(Clone)]
pub struct Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    profile: TProfile,
    cache: Arc<ObjectCache<CredentialDefinition>>,
}

impl<TProfile> Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    pub fn new(profile: TProfile) -> Self {
        Self {
            profile,
            cache: Arc::new(ObjectCache::new("credential-definition")),
        }
    }
}

#[async_trait]
impl<TProfile> CredentialDefinitionAPI for Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    type EntityAccessor = CredentialDefinition;

    async fn create(
        &self,
        source_id: String,
        issuer_did: String,
        schema_id: String,
        tag: String,
        support_revocation: bool,
    ) -> Result<Handle, AgentError> {
        let raw = self
            .profile
            .ledger()
            .read_record(RecordKind::Schema, schema_id.clone())
            .await?;

        let schema: SchemaRecord = serde_json::from_str(&raw)
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        let (_, verkey) = self.profile.wallet().create_and_store_my_did().await?;
        let cred_def = CredentialDefinition::new(
            source_id,
            issuer_did,
            schema_id,
            tag,
            verkey,
            schema.attr_names,
            support_revocation,
        )?;

        Ok(self.cache.insert(cred_def).await)
    }

    async fn publish(&self, handle: Handle) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        if guard.state == State::Published {
            return Err(AgentError::InvalidState(format!(
                "credential definition {} already published",
                guard.cred_def_id
            )));
        }

        let record = serde_json::to_string(&guard.to_record())
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        self.profile
            .ledger()
            .write_record(
                RecordKind::CredentialDefinition,
                guard.cred_def_id.clone(),
                record,
            )
            .await?;

        guard.state = State::Published;
        info!(
            "[credential-definition:{}] published {}",
            guard.source_id, guard.cred_def_id
        );
        Ok(())
    }

    async fn get_cred_def(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError> {
        self.cache.snapshot(handle).await
    }

    async fn get_cred_def_id(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_cred_def_id())
    }

    async fn get_state(&self, handle: Handle) -> Result<State, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_state())
    }

    async fn is_revocable(&self, handle: Handle) -> Result<bool, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_support_revocation())
    }

    async fn read_record(
        &self,
        cred_def_id: String,
    ) -> Result<CredentialDefinitionRecord, AgentError> {
        let raw = self
            .profile
            .ledger()
            .read_record(RecordKind::CredentialDefinition, cred_def_id)
            .await?;

        serde_json::from_str(&raw).map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        self.cache
            .snapshot(handle)
            .await?
            .to_json()
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    async fn deserialize(&self, data: String) -> Result<Handle, AgentError> {
        let cred_def = CredentialDefinition::try_from(data.into_bytes())?;
        Ok(self.cache.insert(cred_def).await)
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}
