use std::fmt::Debug;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};

use rstdev_domain::entity::ToJSON;

use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::out_of_band::{GoalCode, HandshakeProtocol, Invitation, Service};
use crate::messages::AriesMessage;
use crate::protocols::connection::types::ConnectionAPI;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct OutOfBandConfig {
    pub label: Option<String>,
    pub goal_code: Option<GoalCode>,
    pub goal: Option<String>,
    pub handshake_protocols: Option<Vec<HandshakeProtocol>>,
}

pub trait OutOfBandSenderEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_source_id(&self) -> String;
    fn get_thread_id(&self) -> String;
    fn get_invitation(&self) -> Invitation;
    fn is_finalized(&self) -> bool;
}

#[async_trait]
pub trait SenderAPI: Clone {
    type EntityAccessor: OutOfBandSenderEntityAccessor;

    async fn create(&self, source_id: String, config: OutOfBandConfig)
        -> Result<Handle, AgentError>;

    /// append_message embeds a credential offer or a presentation request
    async fn append_message(&self, handle: Handle, message: AriesMessage)
        -> Result<(), AgentError>;

    async fn append_service(&self, handle: Handle, service: Service) -> Result<(), AgentError>;
    async fn append_service_did(&self, handle: Handle, did: String) -> Result<(), AgentError>;

    /// append_connection advertises an inviter connection waiting in `Invited`, the
    /// invitation takes over the connection's thread so the handshake correlates
    async fn append_connection(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError>;

    /// to_message finalizes the invitation, later appends are rejected
    async fn to_message(&self, handle: Handle) -> Result<AriesMessage, AgentError>;

    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_sender(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}

pub trait UsecaseBuilder<TEntityAccessor>: SenderAPI<EntityAccessor = TEntityAccessor>
where
    TEntityAccessor: OutOfBandSenderEntityAccessor,
{
    type ConnectionImplementer: ConnectionAPI;

    fn connections(&self) -> Self::ConnectionImplementer;
}
