use std::fmt::Debug;

use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};

use rstdev_domain::entity::ToJSON;

use crate::collaborators::ProfileBuilder;
use crate::config::AgentConfig;
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::connection::{Invitation, Response};
use crate::messages::did_exchange::Response as DidExchangeResponse;
use crate::messages::discovery::ProtocolDescriptor;
use crate::messages::out_of_band::HandshakeProtocol;
use crate::messages::AriesMessage;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum Role {
    Inviter,
    Invitee,
}

/// State of a pairwise connection
///
/// `Responded` means the response went out (inviter) or arrived and verified (invitee)
/// but the closing acknowledgement is still outstanding. `None` is terminal.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum State {
    Initial,
    Invited,
    Requested,
    Responded,
    Accepted,
    None,
}

/// Action is the side effect a transition asks its driver to perform
///
/// The transition table itself never touches the wallet or the transport, the usecase
/// performs the action and commits the resulting state.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// sign and send the connection response, success moves to `Responded`
    SendResponse,

    /// verify the inviter's signed response, then acknowledge it
    VerifyResponse(Response),

    /// verify the responder's signed DID document, then send the complete message
    VerifyExchangeResponse(DidExchangeResponse),

    /// acknowledge an already verified response, success moves to `Accepted`
    SendAck,

    /// send a reply without changing state
    Reply(AriesMessage),
}

/// ReceivedMessage is a decoded message taken from the connection mailbox
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub envelope_id: String,
    pub sender_verkey: Option<String>,
    pub message: AriesMessage,
}

/// PairwiseInfo summarizes both ends of an established connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PairwiseInfo {
    pub role: Role,
    pub state: State,
    pub handshake: HandshakeProtocol,
    pub my_did: String,
    pub my_verkey: String,
    pub their_did: Option<String>,
    pub their_verkey: Option<String>,
    pub their_endpoint: Option<String>,
    pub protocols: Vec<ProtocolDescriptor>,
}

pub trait ConnectionEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_source_id(&self) -> String;
    fn get_role(&self) -> Role;
    fn get_state(&self) -> State;
    fn get_handshake(&self) -> HandshakeProtocol;
    fn get_pw_did(&self) -> String;
    fn get_pw_verkey(&self) -> String;
    fn get_their_pw_did(&self) -> Option<String>;
    fn get_their_pw_verkey(&self) -> Option<String>;
    fn get_service_endpoint(&self) -> Option<String>;
    fn get_thread_id(&self) -> Option<String>;
    fn get_invitation(&self) -> Option<Invitation>;
    fn get_protocols(&self) -> Vec<ProtocolDescriptor>;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

/// ConnectionAPI is the main entrypoint of the `connection` domain
///
/// Every operation addresses its connection by [`Handle`]. Both update flavours,
/// [`ConnectionAPI::update_state`] polling the mailbox and
/// [`ConnectionAPI::update_state_with_message`] pushing a message, run the same
/// transition table and therefore end in the same state.
#[async_trait]
pub trait ConnectionAPI: Clone {
    type EntityAccessor: ConnectionEntityAccessor;

    /// create starts an inviter side connection in `Initial`
    async fn create(&self, source_id: String) -> Result<Handle, AgentError>;

    /// create_with_invite starts an invitee side connection in `Invited`
    async fn create_with_invite(
        &self,
        source_id: String,
        invitation: Invitation,
    ) -> Result<Handle, AgentError>;

    /// create_with_handshake is [`ConnectionAPI::create_with_invite`] running the given
    /// handshake protocol, the inviter follows whichever request it receives
    async fn create_with_handshake(
        &self,
        source_id: String,
        invitation: Invitation,
        handshake: HandshakeProtocol,
    ) -> Result<Handle, AgentError>;

    /// connect generates the invitation (inviter) or sends the request (invitee)
    async fn connect(&self, handle: Handle) -> Result<(), AgentError>;

    async fn update_state(&self, handle: Handle) -> Result<State, AgentError>;

    async fn update_state_with_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<State, AgentError>;

    /// handle_message answers ping, discovery query and handshake reuse messages,
    /// anything else is ignored
    async fn handle_message(&self, handle: Handle, message: AriesMessage)
        -> Result<(), AgentError>;

    async fn send_message(&self, handle: Handle, message: AriesMessage) -> Result<(), AgentError>;

    /// download_messages lists pending messages from the peer without consuming them
    async fn download_messages(&self, handle: Handle) -> Result<Vec<ReceivedMessage>, AgentError>;

    async fn acknowledge_message(
        &self,
        handle: Handle,
        envelope_id: String,
    ) -> Result<(), AgentError>;

    async fn send_ping(&self, handle: Handle, comment: Option<String>) -> Result<(), AgentError>;

    async fn send_discovery_features(
        &self,
        handle: Handle,
        query: Option<String>,
        comment: Option<String>,
    ) -> Result<(), AgentError>;

    async fn send_handshake_reuse(
        &self,
        handle: Handle,
        invitation_id: String,
    ) -> Result<(), AgentError>;

    async fn sign_data(&self, handle: Handle, data: Vec<u8>) -> Result<Vec<u8>, AgentError>;

    /// verify_signature checks a signature made by the peer, data and signature
    /// are separate buffers
    async fn verify_signature(
        &self,
        handle: Handle,
        data: Vec<u8>,
        signature: Vec<u8>,
    ) -> Result<bool, AgentError>;

    async fn get_connection(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError>;
    async fn get_state(&self, handle: Handle) -> Result<State, AgentError>;
    async fn get_invite_details(&self, handle: Handle) -> Result<Invitation, AgentError>;
    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_source_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_pw_did(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_their_pw_did(&self, handle: Handle) -> Result<Option<String>, AgentError>;
    async fn info(&self, handle: Handle) -> Result<PairwiseInfo, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;

    /// delete_connection moves the connection to `None`, the handle stays valid
    async fn delete_connection(&self, handle: Handle) -> Result<(), AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}

pub trait UsecaseBuilder<TEntityAccessor>: ConnectionAPI<EntityAccessor = TEntityAccessor>
where
    TEntityAccessor: ConnectionEntityAccessor,
{
    type ProfileImplementer: ProfileBuilder;

    fn profile(&self) -> Self::ProfileImplementer;
    fn config(&self) -> AgentConfig;
}
