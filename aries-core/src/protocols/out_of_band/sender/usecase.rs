use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, info};

use rstdev_domain::entity::ToJSON;

use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};
use crate::messages::out_of_band::Service;
use crate::messages::AriesMessage;
use crate::protocols::connection::types::{ConnectionAPI, Role, State as ConnectionState};

use super::sender::OutOfBandSender;
use super::types::{OutOfBandConfig, OutOfBandSenderEntityAccessor, SenderAPI, UsecaseBuilder};

#[derive(Clone)]
pub struct Usecase<TConnection>
where
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    connections: TConnection,
    cache: Arc<ObjectCache<OutOfBandSender>>,
}

impl<TConnection> Usecase<TConnection>
where
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    pub fn new(connections: TConnection) -> Self {
        Self {
            connections,
            cache: Arc::new(ObjectCache::new("out-of-band-sender")),
        }
    }
}

impl<TConnection> UsecaseBuilder<OutOfBandSender> for Usecase<TConnection>
where
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    type ConnectionImplementer = TConnection;

    fn connections(&self) -> Self::ConnectionImplementer {
        self.connections.clone()
    }
}

#[async_trait]
impl<TConnection> SenderAPI for Usecase<TConnection>
where
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    type EntityAccessor = OutOfBandSender;

    async fn create(
        &self,
        source_id: String,
        config: OutOfBandConfig,
    ) -> Result<Handle, AgentError> {
        Ok(self.cache.insert(OutOfBandSender::new(source_id, config)).await)
    }

    async fn append_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        *guard = guard.append_message(&message)?;
        debug!("[oob:{}] attached {}", guard.source_id, message.name());
        Ok(())
    }

    async fn append_service(&self, handle: Handle, service: Service) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        *guard = guard.append_service(service)?;
        Ok(())
    }

    async fn append_service_did(&self, handle: Handle, did: String) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        *guard = guard.append_service_did(did)?;
        Ok(())
    }

    async fn append_connection(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;

        let info = self.connections.info(connection_handle).await?;
        if info.role != Role::Inviter || info.state != ConnectionState::Invited {
            return Err(AgentError::InvalidState(format!(
                "connection {} cannot be advertised as {} in {}",
                connection_handle, info.role, info.state
            )));
        }

        let invite = self.connections.get_invite_details(connection_handle).await?;
        let next = guard
            .adopt_thread(invite.id)?
            .append_service(Service::new(invite.recipient_keys, invite.service_endpoint))?;

        *guard = next;
        Ok(())
    }

    async fn to_message(&self, handle: Handle) -> Result<AriesMessage, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let (next, message) = guard.finalize()?;
        *guard = next;

        info!("[oob:{}] finalized {}", guard.source_id, guard.get_thread_id());
        Ok(message)
    }

    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_thread_id())
    }

    async fn get_sender(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError> {
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
        let sender = OutOfBandSender::try_from(data.into_bytes())?;
        Ok(self.cache.insert(sender).await)
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}
