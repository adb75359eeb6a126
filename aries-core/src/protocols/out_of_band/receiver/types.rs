use std::fmt::Debug;

use rst_common::standard::async_trait::async_trait;

use rstdev_domain::entity::ToJSON;

use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::out_of_band::Invitation;
use crate::messages::AriesMessage;
use crate::protocols::connection::types::ConnectionAPI;

pub trait OutOfBandReceiverEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_source_id(&self) -> String;
    fn get_thread_id(&self) -> String;
    fn get_invitation(&self) -> Invitation;
}

#[async_trait]
pub trait ReceiverAPI: Clone {
    type EntityAccessor: OutOfBandReceiverEntityAccessor;

    /// create_with_message accepts an out-of-band invitation message only
    async fn create_with_message(
        &self,
        source_id: String,
        message: AriesMessage,
    ) -> Result<Handle, AgentError>;

    /// extract_message decodes the first attached request, `None` when nothing is attached
    async fn extract_message(&self, handle: Handle) -> Result<Option<AriesMessage>, AgentError>;

    /// connection_exists returns the first of `connection_handles` whose peer is the
    /// sender of the invitation
    async fn connection_exists(
        &self,
        handle: Handle,
        connection_handles: Vec<Handle>,
    ) -> Result<Option<Handle>, AgentError>;

    /// build_connection runs the advertised handshake as invitee and returns the new
    /// connection once its request is sent
    async fn build_connection(&self, handle: Handle) -> Result<Handle, AgentError>;

    async fn send_handshake_reuse(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError>;

    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_receiver(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}

pub trait UsecaseBuilder<TEntityAccessor>: ReceiverAPI<EntityAccessor = TEntityAccessor>
where
    TEntityAccessor: OutOfBandReceiverEntityAccessor,
{
    type ConnectionImplementer: ConnectionAPI;

    fn connections(&self) -> Self::ConnectionImplementer;
}
