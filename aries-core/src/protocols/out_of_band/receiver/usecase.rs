use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, info};

use rstdev_domain::entity::ToJSON;

use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};
use crate::messages::AriesMessage;
use crate::protocols::connection::types::{ConnectionAPI, ConnectionEntityAccessor};

use super::receiver::OutOfBandReceiver;
use super::types::{OutOfBandReceiverEntityAccessor, ReceiverAPI, UsecaseBuilder};

#[derive(Clone)]
pub struct Usecase<TConnection>
where
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    connections: TConnection,
    cache: Arc<ObjectCache<OutOfBandReceiver>>,
}

impl<TConnection> Usecase<TConnection>
where
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    pub fn new(connections: TConnection) -> Self {
        Self {
            connections,
            cache: Arc::new(ObjectCache::new("out-of-band-receiver")),
        }
    }
}

impl<TConnection> UsecaseBuilder<OutOfBandReceiver> for Usecase<TConnection>
where
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    type ConnectionImplementer = TConnection;

    fn connections(&self) -> Self::ConnectionImplementer {
        self.connections.clone()
    }
}

#[async_trait]
impl<TConnection> ReceiverAPI for Usecase<TConnection>
where
    TConnection: ConnectionAPI + Send + Sync + 'static,
{
    type EntityAccessor = OutOfBandReceiver;

    async fn create_with_message(
        &self,
        source_id: String,
        message: AriesMessage,
    ) -> Result<Handle, AgentError> {
        let receiver = OutOfBandReceiver::new(source_id, message)?;
        Ok(self.cache.insert(receiver).await)
    }

    async fn extract_message(&self, handle: Handle) -> Result<Option<AriesMessage>, AgentError> {
        self.cache.snapshot(handle).await?.extract()
    }

    async fn connection_exists(
        &self,
        handle: Handle,
        connection_handles: Vec<Handle>,
    ) -> Result<Option<Handle>, AgentError> {
        let receiver = self.cache.snapshot(handle).await?;

        for connection_handle in connection_handles {
            let connection = self.connections.get_connection(connection_handle).await?;
            let their_verkey = connection.get_their_pw_verkey();
            let their_did = connection.get_their_pw_did();

            if receiver.is_sender(their_verkey.as_deref(), their_did.as_deref()) {
                debug!(
                    "[oob:{}] sender already reachable through connection {}",
                    receiver.source_id, connection_handle
                );
                return Ok(Some(connection_handle));
            }
        }

        Ok(None)
    }

    async fn build_connection(&self, handle: Handle) -> Result<Handle, AgentError> {
        let receiver = self.cache.snapshot(handle).await?;
        let (invitation, handshake) = receiver.handshake_invitation()?;

        let connection_handle = self
            .connections
            .create_with_handshake(receiver.source_id.clone(), invitation, handshake)
            .await?;
        self.connections.connect(connection_handle).await?;

        info!(
            "[oob:{}] {} handshake started on connection {}",
            receiver.source_id,
            handshake.uri(),
            connection_handle
        );
        Ok(connection_handle)
    }

    async fn send_handshake_reuse(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError> {
        let receiver = self.cache.snapshot(handle).await?;
        self.connections
            .send_handshake_reuse(connection_handle, receiver.get_thread_id())
            .await
    }

    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_thread_id())
    }

    async fn get_receiver(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError> {
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
        let receiver = OutOfBandReceiver::try_from(data.into_bytes())?;
        Ok(self.cache.insert(receiver).await)
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}
