use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json;
use rst_common::with_logging::log::info;

use rstdev_domain::entity::ToJSON;

use crate::collaborators::{LedgerBuilder, ProfileBuilder, RecordKind};
use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};

use super::schema::Schema;
use super::types::{SchemaAPI, SchemaEntityAccessor, SchemaRecord, State};

#[derive(Clone)]
pub struct Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    profile: TProfile,
    cache: Arc<ObjectCache<Schema>>,
}

impl<TProfile> Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    pub fn new(profile: TProfile) -> Self {
        Self {
            profile,
            cache: Arc::new(ObjectCache::new("schema")),
        }
    }

    /// read_record fetches a published schema from the ledger by id
    pub async fn read_record(&self, schema_id: String) -> Result<SchemaRecord, AgentError> {
        let raw = self
            .profile
            .ledger()
            .read_record(RecordKind::Schema, schema_id)
            .await?;

        serde_json::from_str(&raw).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

#[async_trait]
impl<TProfile> SchemaAPI for Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    type EntityAccessor = Schema;

    async fn create(
        &self,
        source_id: String,
        issuer_did: String,
        name: String,
        version: String,
        attr_names: Vec<String>,
    ) -> Result<Handle, AgentError> {
        let schema = Schema::new(source_id, issuer_did, name, version, attr_names)?;
        Ok(self.cache.insert(schema).await)
    }

    async fn publish(&self, handle: Handle) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        if guard.state == State::Published {
            return Err(AgentError::InvalidState(format!(
                "schema {} already published",
                guard.schema_id
            )));
        }

        let record = serde_json::to_string(&guard.to_record())
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        self.profile
            .ledger()
            .write_record(RecordKind::Schema, guard.schema_id.clone(), record)
            .await?;

        guard.state = State::Published;
        info!("[schema:{}] published {}", guard.source_id, guard.schema_id);
        Ok(())
    }

    async fn get_schema(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError> {
        self.cache.snapshot(handle).await
    }

    async fn get_schema_id(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_schema_id())
    }

    async fn get_attributes(&self, handle: Handle) -> Result<Vec<String>, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_attr_names())
    }

    async fn get_state(&self, handle: Handle) -> Result<State, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_state())
    }

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        self.cache
            .snapshot(handle)
            .await?
            .to_json()
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    async fn deserialize(&self, data: String) -> Result<Handle, AgentError> {
        let schema = Schema::try_from(data.into_bytes())?;
        Ok(self.cache.insert(schema).await)
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::with_tokio::tokio;

    use crate::collaborators::Profile;
    use crate::memory::{FileTailsFetcher, InMemoryLedger, InMemoryTransport, InMemoryWallet};

    fn usecase() -> Usecase<crate::memory::InMemoryProfile> {
        Usecase::new(Profile::new(
            InMemoryWallet::new(),
            InMemoryLedger::new(),
            InMemoryTransport::new(),
            FileTailsFetcher::new(),
        ))
    }

    #[tokio::test]
    async fn test_publish_schema() {
        let schemas = usecase();
        let handle = schemas
            .create(
                "degree".to_string(),
                "issuer".to_string(),
                "degree".to_string(),
                "1.0".to_string(),
                vec!["name".to_string(), "age".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(schemas.get_state(handle).await.unwrap(), State::Built);
        schemas.publish(handle).await.unwrap();
        assert_eq!(schemas.get_state(handle).await.unwrap(), State::Published);

        let schema_id = schemas.get_schema_id(handle).await.unwrap();
        let record = schemas.read_record(schema_id.clone()).await.unwrap();
        assert_eq!(record.id, schema_id);
        assert_eq!(record.attr_names, vec!["name".to_string(), "age".to_string()]);

        let again = schemas.publish(handle).await;
        assert!(matches!(again, Err(AgentError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_serialize_roundtrip() {
        let schemas = usecase();
        let handle = schemas
            .create(
                "degree".to_string(),
                "issuer".to_string(),
                "degree".to_string(),
                "1.0".to_string(),
                vec!["name".to_string()],
            )
            .await
            .unwrap();

        let serialized = schemas.serialize(handle).await.unwrap();
        schemas.release(handle).await.unwrap();

        let restored = schemas.deserialize(serialized.clone()).await.unwrap();
        assert_eq!(schemas.serialize(restored).await.unwrap(), serialized);
    }
}
