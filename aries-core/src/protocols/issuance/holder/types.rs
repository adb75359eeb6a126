use std::collections::BTreeMap;
use std::fmt::Debug;

use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};

use rstdev_domain::entity::ToJSON;

use crate::anoncreds::credential::Credential;
use crate::anoncreds::credential_definition::types::CredentialDefinitionAPI;
use crate::anoncreds::revocation::types::RevocationRegistryAPI;
use crate::collaborators::ProfileBuilder;
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::issuance::CredentialOffer;
use crate::messages::AriesMessage;
use crate::protocols::connection::types::ConnectionAPI;

/// State of the holder side of one exchange, `Finished`, `Declined` and `Failed`
/// are terminal
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum State {
    OfferReceived,
    RequestSent,
    Finished,
    Declined,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// verify the issued credential and store it in the wallet, then acknowledge
    StoreCredential(Credential),
}

pub trait HolderCredentialEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_source_id(&self) -> String;
    fn get_state(&self) -> State;
    fn get_thread_id(&self) -> String;
    fn get_connection_handle(&self) -> Option<Handle>;
    fn get_offer(&self) -> CredentialOffer;
    fn get_attributes(&self) -> BTreeMap<String, String>;
    fn get_credential_id(&self) -> Option<String>;
    fn get_credential(&self) -> Option<Credential>;
    fn get_problem(&self) -> Option<String>;
}

#[async_trait]
pub trait HolderAPI: Clone {
    type EntityAccessor: HolderCredentialEntityAccessor;

    async fn create_with_offer(
        &self,
        source_id: String,
        offer: CredentialOffer,
    ) -> Result<Handle, AgentError>;

    /// get_offers lists the offers pending on a connection, they stay in the mailbox
    /// until a holder built from them sends its request or declines
    async fn get_offers(&self, connection_handle: Handle)
        -> Result<Vec<CredentialOffer>, AgentError>;

    async fn send_request(&self, handle: Handle, connection_handle: Handle)
        -> Result<(), AgentError>;

    async fn update_state(&self, handle: Handle, connection_handle: Handle)
        -> Result<State, AgentError>;

    async fn update_state_with_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<State, AgentError>;

    /// decline_offer reports the reason to the issuer as a problem report
    async fn decline_offer(
        &self,
        handle: Handle,
        connection_handle: Handle,
        comment: Option<String>,
    ) -> Result<(), AgentError>;

    async fn get_attributes(&self, handle: Handle) -> Result<BTreeMap<String, String>, AgentError>;
    async fn get_attachment(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_tails_location(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_tails_hash(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_rev_reg_id(&self, handle: Handle) -> Result<Option<String>, AgentError>;
    async fn get_credential_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_state(&self, handle: Handle) -> Result<State, AgentError>;
    async fn get_credential(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}

pub trait UsecaseBuilder<TEntityAccessor>: HolderAPI<EntityAccessor = TEntityAccessor>
where
    TEntityAccessor: HolderCredentialEntityAccessor,
{
    type ProfileImplementer: ProfileBuilder;
    type ConnectionImplementer: ConnectionAPI;
    type CredentialDefinitionImplementer: CredentialDefinitionAPI;
    type RevocationRegistryImplementer: RevocationRegistryAPI;

    fn profile(&self) -> Self::ProfileImplementer;
    fn connections(&self) -> Self::ConnectionImplementer;
    fn cred_defs(&self) -> Self::CredentialDefinitionImplementer;
    fn registries(&self) -> Self::RevocationRegistryImplementer;
}
