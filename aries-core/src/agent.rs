use rst_common::with_logging::log::info;

use crate::anoncreds::{credential_definition, revocation, schema};
use crate::collaborators::ProfileBuilder;
use crate::config::AgentConfig;
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::AriesMessage;
use crate::protocols::connection;
use crate::protocols::connection::types::{ConnectionAPI, State as ConnectionState};
use crate::protocols::issuance::holder::types::HolderAPI;
use crate::protocols::issuance::{holder, issuer};
use crate::protocols::out_of_band::receiver::types::{OutOfBandReceiverEntityAccessor, ReceiverAPI};
use crate::protocols::out_of_band::{receiver, sender};
use crate::protocols::presentation::prover::types::ProverAPI;
use crate::protocols::presentation::{prover, verifier};

pub type Connections<TProfile> = connection::Usecase<TProfile>;
pub type Schemas<TProfile> = schema::Usecase<TProfile>;
pub type CredentialDefinitions<TProfile> = credential_definition::Usecase<TProfile>;
pub type RevocationRegistries<TProfile> = revocation::Usecase<TProfile>;

pub type Issuers<TProfile> = issuer::Usecase<
    TProfile,
    Connections<TProfile>,
    CredentialDefinitions<TProfile>,
    RevocationRegistries<TProfile>,
>;

pub type Holders<TProfile> = holder::Usecase<
    TProfile,
    Connections<TProfile>,
    CredentialDefinitions<TProfile>,
    RevocationRegistries<TProfile>,
>;

pub type Verifiers<TProfile> =
    verifier::Usecase<TProfile, Connections<TProfile>, CredentialDefinitions<TProfile>>;
pub type Provers<TProfile> = prover::Usecase<TProfile, Connections<TProfile>>;

pub type OutOfBandSenders<TProfile> = sender::Usecase<Connections<TProfile>>;
pub type OutOfBandReceivers<TProfile> = receiver::Usecase<Connections<TProfile>>;

/// Dispatched is the exchange an out-of-band attachment was handed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Holder(Handle),
    Prover(Handle),
}

/// Agent wires every usecase to one profile and one configuration
///
/// Each usecase owns its own handle space. Cloning an agent shares them, so handles
/// obtained through one clone stay valid on the others.
#[derive(Clone)]
pub struct Agent<TProfile>
where
    TProfile: ProfileBuilder,
{
    profile: TProfile,
    config: AgentConfig,
    connections: Connections<TProfile>,
    schemas: Schemas<TProfile>,
    cred_defs: CredentialDefinitions<TProfile>,
    registries: RevocationRegistries<TProfile>,
    issuers: Issuers<TProfile>,
    holders: Holders<TProfile>,
    verifiers: Verifiers<TProfile>,
    provers: Provers<TProfile>,
    oob_senders: OutOfBandSenders<TProfile>,
    oob_receivers: OutOfBandReceivers<TProfile>,
}

impl<TProfile> Agent<TProfile>
where
    TProfile: ProfileBuilder,
{
    pub fn new(profile: TProfile, config: AgentConfig) -> Self {
        let connections = connection::Usecase::new(profile.clone(), config.clone());
        let schemas = schema::Usecase::new(profile.clone());
        let cred_defs = credential_definition::Usecase::new(profile.clone());
        let registries = revocation::Usecase::new(profile.clone());

        let issuers = issuer::Usecase::new(
            profile.clone(),
            connections.clone(),
            cred_defs.clone(),
            registries.clone(),
        );
        let holders = holder::Usecase::new(
            profile.clone(),
            connections.clone(),
            cred_defs.clone(),
            registries.clone(),
        );
        let verifiers = verifier::Usecase::new(profile.clone(), connections.clone(), cred_defs.clone());
        let provers = prover::Usecase::new(
            profile.clone(),
            connections.clone(),
            config.tails().clone(),
        );

        Self {
            oob_senders: sender::Usecase::new(connections.clone()),
            oob_receivers: receiver::Usecase::new(connections.clone()),
            profile,
            config,
            connections,
            schemas,
            cred_defs,
            registries,
            issuers,
            holders,
            verifiers,
            provers,
        }
    }

    pub fn profile(&self) -> &TProfile {
        &self.profile
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn connections(&self) -> &Connections<TProfile> {
        &self.connections
    }

    pub fn schemas(&self) -> &Schemas<TProfile> {
        &self.schemas
    }

    pub fn cred_defs(&self) -> &CredentialDefinitions<TProfile> {
        &self.cred_defs
    }

    pub fn registries(&self) -> &RevocationRegistries<TProfile> {
        &self.registries
    }

    pub fn issuers(&self) -> &Issuers<TProfile> {
        &self.issuers
    }

    pub fn holders(&self) -> &Holders<TProfile> {
        &self.holders
    }

    pub fn verifiers(&self) -> &Verifiers<TProfile> {
        &self.verifiers
    }

    pub fn provers(&self) -> &Provers<TProfile> {
        &self.provers
    }

    pub fn oob_senders(&self) -> &OutOfBandSenders<TProfile> {
        &self.oob_senders
    }

    pub fn oob_receivers(&self) -> &OutOfBandReceivers<TProfile> {
        &self.oob_receivers
    }

    /// dispatch_out_of_band hands the request attached to a received invitation to
    /// the matching exchange, skipping a separate round trip over `connection_handle`
    ///
    /// A credential offer opens a holder exchange, a presentation request opens a
    /// prover exchange. The caller answers it over the given connection.
    pub async fn dispatch_out_of_band(
        &self,
        oob_handle: Handle,
        connection_handle: Handle,
    ) -> Result<Dispatched, AgentError> {
        let receiver = self.oob_receivers.get_receiver(oob_handle).await?;
        let connection_state = self.connections.get_state(connection_handle).await?;
        if connection_state == ConnectionState::None {
            return Err(AgentError::InvalidState(format!(
                "connection {} is closed",
                connection_handle
            )));
        }

        let message = self
            .oob_receivers
            .extract_message(oob_handle)
            .await?
            .ok_or_else(|| {
                AgentError::ValidationError(format!(
                    "out-of-band {} carries no request",
                    receiver.get_thread_id()
                ))
            })?;

        let dispatched = match message {
            AriesMessage::CredentialOffer(offer) => Dispatched::Holder(
                self.holders
                    .create_with_offer(receiver.get_source_id(), offer)
                    .await?,
            ),
            AriesMessage::PresentationRequest(request) => Dispatched::Prover(
                self.provers
                    .create_with_request(receiver.get_source_id(), request)
                    .await?,
            ),
            other => {
                return Err(AgentError::ActionNotSupported(format!(
                    "{} cannot be dispatched from an out-of-band invitation",
                    other.name()
                )))
            }
        };

        info!(
            "[agent] out-of-band {} dispatched to {:?} over connection {}",
            receiver.get_thread_id(),
            dispatched,
            connection_handle
        );
        Ok(dispatched)
    }
}
