use std::path::PathBuf;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json;
use rst_common::with_logging::log::{debug, info};
use rst_common::with_tokio::tokio;

use rstdev_domain::entity::ToJSON;

use crate::collaborators::{LedgerBuilder, ProfileBuilder, RecordKind, TxnReceipt};
use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};

use super::registry::RevocationRegistry;
use super::types::{
    RevocationRegistryAPI, RevocationRegistryConfig, RevocationRegistryEntityAccessor,
    RevocationRegistryRecord, State,
};

#[derive(Clone)]
pub struct Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    profile: TProfile,
    cache: Arc<ObjectCache<RevocationRegistry>>,
}

impl<TProfile> Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    pub fn new(profile: TProfile) -> Self {
        Self {
            profile,
            cache: Arc::new(ObjectCache::new("revocation-registry")),
        }
    }

    fn to_data<T: rst_common::standard::serde::Serialize>(
        value: &T,
    ) -> Result<String, AgentError> {
        serde_json::to_string(value).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

#[async_trait]
impl<TProfile> RevocationRegistryAPI for Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    type EntityAccessor = RevocationRegistry;

    async fn create(&self, config: RevocationRegistryConfig) -> Result<Handle, AgentError> {
        let (registry, tails_file) = RevocationRegistry::new(config)?;

        let dir = PathBuf::from(&registry.tails_dir);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&registry.tails_hash), &tails_file).await?;

        debug!(
            "[revocation-registry:{}] tails written: {}",
            registry.rev_reg_id, registry.tails_hash
        );
        Ok(self.cache.insert(registry).await)
    }

    async fn publish(&self, handle: Handle, tails_location: String) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        if guard.state == State::Published {
            return Err(AgentError::InvalidState(format!(
                "revocation registry {} already published",
                guard.rev_reg_id
            )));
        }

        let ledger = self.profile.ledger();
        match guard.tails_location.clone() {
            Some(written) if written != tails_location => {
                return Err(AgentError::InvalidState(format!(
                    "revocation registry {} definition already points at {}",
                    guard.rev_reg_id, written
                )));
            }
            Some(_) => debug!(
                "[revocation-registry] {} definition already written",
                guard.rev_reg_id
            ),
            None => {
                let record = Self::to_data(&guard.to_record(tails_location.clone()))?;
                ledger
                    .write_record(
                        RecordKind::RevocationRegistryDefinition,
                        guard.rev_reg_id.clone(),
                        record,
                    )
                    .await?;

                // the definition is write-once, a failed delta below is retried alone
                guard.tails_location = Some(tails_location);
            }
        }

        let delta = Self::to_data(&guard.initial_delta())?;
        ledger
            .write_rev_reg_delta(guard.rev_reg_id.clone(), delta)
            .await?;

        guard.state = State::Published;
        info!("[revocation-registry] published {}", guard.rev_reg_id);
        Ok(())
    }

    async fn publish_revocations(
        &self,
        handle: Handle,
    ) -> Result<Option<TxnReceipt>, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        if guard.state != State::Published {
            return Err(AgentError::InvalidState(format!(
                "revocation registry {} is not published",
                guard.rev_reg_id
            )));
        }

        let delta = match guard.pending_delta() {
            Some(delta) => delta,
            None => {
                debug!("[revocation-registry] {} nothing to publish", guard.rev_reg_id);
                return Ok(None);
            }
        };

        let receipt = self
            .profile
            .ledger()
            .write_rev_reg_delta(guard.rev_reg_id.clone(), Self::to_data(&delta)?)
            .await?;

        guard.apply_delta(&delta);
        info!(
            "[revocation-registry] {} revoked {:?} at {}",
            guard.rev_reg_id, delta.revoked, receipt.timestamp
        );
        Ok(Some(receipt))
    }

    async fn allocate_index(&self, handle: Handle) -> Result<u32, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        guard.allocate()
    }

    async fn revoke_local(&self, handle: Handle, index: u32) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        if guard.revoke(index)? {
            debug!(
                "[revocation-registry] {} index {} pending revocation",
                guard.rev_reg_id, index
            );
        }

        Ok(())
    }

    async fn get_registry(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError> {
        self.cache.snapshot(handle).await
    }

    async fn get_rev_reg_id(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_rev_reg_id())
    }

    async fn get_tails_hash(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_tails_hash())
    }

    async fn get_tails_location(&self, handle: Handle) -> Result<String, AgentError> {
        let registry = self.cache.snapshot(handle).await?;
        registry.get_tails_location().ok_or_else(|| {
            AgentError::InvalidState(format!(
                "revocation registry {} is not published",
                registry.rev_reg_id
            ))
        })
    }

    async fn get_state(&self, handle: Handle) -> Result<State, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_state())
    }

    async fn read_record(
        &self,
        rev_reg_id: String,
    ) -> Result<RevocationRegistryRecord, AgentError> {
        let raw = self
            .profile
            .ledger()
            .read_record(RecordKind::RevocationRegistryDefinition, rev_reg_id)
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
        let registry = RevocationRegistry::try_from(data.into_bytes())?;
        Ok(self.cache.insert(registry).await)
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use rst_common::standard::uuid::Uuid;

    use crate::anoncreds::revocation::tails;
    use crate::anoncreds::revocation::types::RegistryState;
    use crate::collaborators::{LedgerDelta, Profile};
    use crate::memory::{
        FileTailsFetcher, InMemoryLedger, InMemoryProfile, InMemoryTransport, InMemoryWallet,
    };

    /// FlakyLedger drops the first delta write and delegates everything else
    #[derive(Clone)]
    struct FlakyLedger {
        inner: InMemoryLedger,
        failed: Arc<AtomicBool>,
    }

    impl FlakyLedger {
        fn new() -> Self {
            Self {
                inner: InMemoryLedger::new(),
                failed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl LedgerBuilder for FlakyLedger {
        async fn write_record(
            &self,
            kind: RecordKind,
            id: String,
            data: String,
        ) -> Result<TxnReceipt, AgentError> {
            self.inner.write_record(kind, id, data).await
        }

        async fn read_record(&self, kind: RecordKind, id: String) -> Result<String, AgentError> {
            self.inner.read_record(kind, id).await
        }

        async fn write_rev_reg_delta(
            &self,
            rev_reg_id: String,
            data: String,
        ) -> Result<TxnReceipt, AgentError> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(AgentError::LedgerError("ledger timeout".to_string()));
            }

            self.inner.write_rev_reg_delta(rev_reg_id, data).await
        }

        async fn read_rev_reg_deltas(
            &self,
            rev_reg_id: String,
            to: i64,
        ) -> Result<Vec<LedgerDelta>, AgentError> {
            self.inner.read_rev_reg_deltas(rev_reg_id, to).await
        }

        async fn current_time(&self) -> Result<i64, AgentError> {
            self.inner.current_time().await
        }
    }

    fn profile(ledger: InMemoryLedger) -> InMemoryProfile {
        Profile::new(
            InMemoryWallet::new(),
            ledger,
            InMemoryTransport::new(),
            FileTailsFetcher::new(),
        )
    }

    fn config(tails_dir: &PathBuf, max_creds: u32) -> RevocationRegistryConfig {
        RevocationRegistryConfig {
            issuer_did: "issuer".to_string(),
            cred_def_id: "issuer:3:CL:schema:tag1".to_string(),
            tag: "tag1".to_string(),
            tails_dir: tails_dir.to_string_lossy().to_string(),
            max_creds,
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("aries-registry-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_create_writes_tails_file() {
        let dir = scratch_dir();
        let registries = Usecase::new(profile(InMemoryLedger::new()));
        let handle = registries.create(config(&dir, 5)).await.unwrap();

        let hash = registries.get_tails_hash(handle).await.unwrap();
        let file = tokio::fs::read(dir.join(&hash)).await.unwrap();
        assert!(tails::verify_tails(&file, &hash).is_ok());
        assert_eq!(tails::capacity(&file).unwrap(), 5);

        let location = registries.get_tails_location(handle).await;
        assert!(matches!(location, Err(AgentError::InvalidState(_))));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_publish_and_revocations() {
        let dir = scratch_dir();
        let ledger = InMemoryLedger::new();
        let registries = Usecase::new(profile(ledger.clone()));
        let handle = registries.create(config(&dir, 5)).await.unwrap();

        let not_published = registries.publish_revocations(handle).await;
        assert!(matches!(not_published, Err(AgentError::InvalidState(_))));

        registries
            .publish(handle, "https://tails.example/abc".to_string())
            .await
            .unwrap();
        assert_eq!(registries.get_state(handle).await.unwrap(), State::Published);

        let rev_reg_id = registries.get_rev_reg_id(handle).await.unwrap();
        let record = registries.read_record(rev_reg_id.clone()).await.unwrap();
        assert_eq!(record.tails_location, "https://tails.example/abc".to_string());
        assert_eq!(
            record.tails_hash,
            registries.get_tails_hash(handle).await.unwrap()
        );

        assert!(registries.publish_revocations(handle).await.unwrap().is_none());

        let first = registries.allocate_index(handle).await.unwrap();
        let second = registries.allocate_index(handle).await.unwrap();
        registries.revoke_local(handle, second).await.unwrap();

        let receipt = registries.publish_revocations(handle).await.unwrap().unwrap();
        let now = ledger.current_time().await.unwrap();
        let deltas = ledger
            .read_rev_reg_deltas(rev_reg_id.clone(), now)
            .await
            .unwrap();
        assert_eq!(deltas.len(), 2);

        let state = RegistryState::latest(&deltas).unwrap().unwrap();
        assert_eq!(state.timestamp, receipt.timestamp);
        assert!(state.is_revoked(second));
        assert!(!state.is_revoked(first));

        let registry = registries.get_registry(handle).await.unwrap();
        assert_eq!(registry.get_accumulator(), state.accumulator);

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_publish_twice() {
        let dir = scratch_dir();
        let registries = Usecase::new(profile(InMemoryLedger::new()));
        let handle = registries.create(config(&dir, 1)).await.unwrap();

        registries
            .publish(handle, "https://tails.example/abc".to_string())
            .await
            .unwrap();
        let again = registries
            .publish(handle, "https://tails.example/abc".to_string())
            .await;
        assert!(matches!(again, Err(AgentError::InvalidState(_))));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_publish_retries_after_failed_delta() {
        let dir = scratch_dir();
        let ledger = FlakyLedger::new();
        let registries = Usecase::new(Profile::new(
            InMemoryWallet::new(),
            ledger.clone(),
            InMemoryTransport::new(),
            FileTailsFetcher::new(),
        ));
        let handle = registries.create(config(&dir, 2)).await.unwrap();

        let location = "https://tails.example/abc".to_string();
        let failed = registries.publish(handle, location.clone()).await;
        assert!(matches!(failed, Err(AgentError::LedgerError(_))));
        assert!(failed.unwrap_err().is_retryable());
        assert_eq!(registries.get_state(handle).await.unwrap(), State::Built);

        let moved = registries
            .publish(handle, "https://tails.example/other".to_string())
            .await;
        assert!(matches!(moved, Err(AgentError::InvalidState(_))));

        registries.publish(handle, location.clone()).await.unwrap();
        assert_eq!(registries.get_state(handle).await.unwrap(), State::Published);
        assert_eq!(
            registries.get_tails_location(handle).await.unwrap(),
            location
        );

        let rev_reg_id = registries.get_rev_reg_id(handle).await.unwrap();
        let now = ledger.current_time().await.unwrap();
        let deltas = ledger.read_rev_reg_deltas(rev_reg_id, now).await.unwrap();
        assert_eq!(deltas.len(), 1);

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_serialize_release() {
        let dir = scratch_dir();
        let registries = Usecase::new(profile(InMemoryLedger::new()));
        let handle = registries.create(config(&dir, 2)).await.unwrap();
        let _ = registries.allocate_index(handle).await.unwrap();

        let data = registries.serialize(handle).await.unwrap();
        registries.release(handle).await.unwrap();
        assert!(matches!(
            registries.get_state(handle).await,
            Err(AgentError::InvalidHandle(_))
        ));

        let restored = registries.deserialize(data).await.unwrap();
        assert_ne!(restored, handle);
        let registry = registries.get_registry(restored).await.unwrap();
        assert_eq!(registry.get_issued_count(), 1);

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
