use std::collections::BTreeMap;
use std::fmt::Debug;

use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};

use rstdev_domain::entity::ToJSON;

use crate::anoncreds::credential_definition::types::CredentialDefinitionAPI;
use crate::anoncreds::revocation::types::RevocationRegistryAPI;
use crate::collaborators::ProfileBuilder;
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::AriesMessage;
use crate::protocols::connection::types::ConnectionAPI;

/// State of the issuer side of one exchange
///
/// `Finished`, `Revoked` and `Failed` are terminal, `Revoked` is entered only through
/// a local revocation.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum State {
    Initial,
    OfferBuilt,
    OfferSent,
    RequestReceived,
    CredentialSent,
    Finished,
    Revoked,
    Failed,
}

pub trait IssuerCredentialEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_source_id(&self) -> String;
    fn get_state(&self) -> State;
    fn get_thread_id(&self) -> Option<String>;
    fn get_connection_handle(&self) -> Option<Handle>;
    fn get_cred_def_id(&self) -> Option<String>;
    fn get_rev_reg_id(&self) -> Option<String>;
    fn get_cred_rev_id(&self) -> Option<u32>;
    fn get_attributes(&self) -> BTreeMap<String, String>;
    fn get_problem(&self) -> Option<String>;
}

#[async_trait]
pub trait IssuerAPI: Clone {
    type EntityAccessor: IssuerCredentialEntityAccessor;

    async fn create(&self, source_id: String) -> Result<Handle, AgentError>;

    /// build_credential_offer_msg binds the credential definition, the registry when the
    /// definition is revocable, and the attribute values
    ///
    /// The attribute names must equal the schema's, otherwise the call fails with
    /// [`AgentError::InvalidAttributesStructure`].
    async fn build_credential_offer_msg(
        &self,
        handle: Handle,
        cred_def_handle: Handle,
        rev_reg_handle: Option<Handle>,
        attributes: BTreeMap<String, String>,
        comment: Option<String>,
    ) -> Result<(), AgentError>;

    async fn get_offer_msg(&self, handle: Handle) -> Result<AriesMessage, AgentError>;

    /// mark_credential_offer_msg_sent is used when the offer travels outside the
    /// connection, e.g. inside an out-of-band invitation
    async fn mark_credential_offer_msg_sent(&self, handle: Handle) -> Result<(), AgentError>;

    async fn send_credential_offer(
        &self,
        handle: Handle,
        connection_handle: Handle,
    ) -> Result<(), AgentError>;

    async fn update_state(&self, handle: Handle, connection_handle: Handle)
        -> Result<State, AgentError>;

    async fn update_state_with_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<State, AgentError>;

    async fn send_credential(&self, handle: Handle, connection_handle: Handle)
        -> Result<(), AgentError>;

    /// revoke_credential_local marks the issued index revoked in the registry, the
    /// ledger learns about it on the registry's next publish
    async fn revoke_credential_local(&self, handle: Handle) -> Result<(), AgentError>;

    async fn is_revokable(&self, handle: Handle) -> Result<bool, AgentError>;
    async fn get_rev_reg_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError>;
    async fn get_state(&self, handle: Handle) -> Result<State, AgentError>;
    async fn get_credential(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError>;

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError>;
    async fn deserialize(&self, data: String) -> Result<Handle, AgentError>;
    async fn release(&self, handle: Handle) -> Result<(), AgentError>;
}

pub trait UsecaseBuilder<TEntityAccessor>: IssuerAPI<EntityAccessor = TEntityAccessor>
where
    TEntityAccessor: IssuerCredentialEntityAccessor,
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
