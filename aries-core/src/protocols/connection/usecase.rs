use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json;
use rst_common::with_logging::log::{debug, info, warn};

use rstdev_domain::entity::ToJSON;

use crate::collaborators::{
    Envelope, ProfileBuilder, TransportBuilder, UnpackedMessage, WalletBuilder,
};
use crate::config::AgentConfig;
use crate::errors::AgentError;
use crate::handle::{Handle, ObjectCache};
use crate::messages::connection::{
    ConnectionData, DidDoc, Invitation, Response, SignatureDecorator,
};
use crate::messages::did_exchange::{self, did_doc_attachment};
use crate::messages::discovery::Query;
use crate::messages::notification::Ack;
use crate::messages::out_of_band::{HandshakeProtocol, HandshakeReuse};
use crate::messages::trust_ping::Ping;
use crate::messages::AriesMessage;

use super::connection::Connection;
use super::types::{
    Action, ConnectionAPI, ConnectionEntityAccessor, PairwiseInfo, ReceivedMessage, Role, State,
    UsecaseBuilder,
};

/// `Usecase` drives [`Connection`] objects stored in a handle cache
///
/// A transition checks its connection out of the cache for its whole duration. While
/// checked out the connection is only reachable through the guard, so every send in
/// this file goes through [`Usecase::send_with`] using the entity directly.
#[derive(Clone)]
pub struct Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    profile: TProfile,
    config: AgentConfig,
    cache: Arc<ObjectCache<Connection>>,
}

impl<TProfile> Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    pub fn new(profile: TProfile, config: AgentConfig) -> Self {
        Self {
            profile,
            config,
            cache: Arc::new(ObjectCache::new("connection")),
        }
    }

    pub async fn handles(&self) -> Vec<Handle> {
        self.cache.handles().await
    }

    fn protocols(&self) -> Vec<String> {
        self.config.discovery().get_protocols()
    }

    async fn send_with(
        &self,
        connection: &Connection,
        message: &AriesMessage,
    ) -> Result<(), AgentError> {
        let (their_verkey, endpoint) = connection.remote()?;
        let payload = serde_json::to_vec(message)
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        let packed = self
            .profile
            .wallet()
            .pack_message(
                Some(connection.pairwise_verkey.clone()),
                vec![their_verkey.clone()],
                payload,
            )
            .await?;

        debug!(
            "[connection:{}] send {} on thread {}",
            connection.source_id,
            message.name(),
            message.thread_id()
        );

        self.profile
            .transport()
            .send(endpoint, Envelope::new(their_verkey, packed))
            .await
    }

    async fn fetch_with(&self, connection: &Connection) -> Result<Vec<ReceivedMessage>, AgentError> {
        let envelopes = self
            .profile
            .transport()
            .receive(connection.pairwise_verkey.clone())
            .await?;

        let wallet = self.profile.wallet();
        let mut messages = Vec::new();
        for envelope in envelopes {
            let unpacked: UnpackedMessage = match wallet.unpack_message(envelope.payload).await {
                Ok(unpacked) => unpacked,
                Err(err) => {
                    warn!(
                        "[connection:{}] drop envelope {}: {}",
                        connection.source_id, envelope.id, err
                    );
                    continue;
                }
            };

            match AriesMessage::try_from(unpacked.message) {
                Ok(message) => messages.push(ReceivedMessage {
                    envelope_id: envelope.id,
                    sender_verkey: unpacked.sender_verkey,
                    message,
                }),
                Err(err) => warn!(
                    "[connection:{}] undecodable envelope {}: {}",
                    connection.source_id, envelope.id, err
                ),
            }
        }

        Ok(messages)
    }

    async fn acknowledge_with(
        &self,
        connection: &Connection,
        envelope_id: String,
    ) -> Result<(), AgentError> {
        self.profile
            .transport()
            .acknowledge(connection.pairwise_verkey.clone(), envelope_id)
            .await
    }

    async fn build_response(&self, connection: &Connection) -> Result<AriesMessage, AgentError> {
        let data = ConnectionData::new(
            connection.pairwise_did.clone(),
            connection.pairwise_verkey.clone(),
            self.config.agent().get_service_endpoint(),
        );

        if connection.handshake == HandshakeProtocol::DidExchangeV1 {
            return self.build_exchange_response(connection, data).await;
        }

        let sig_data = serde_json::to_vec(&data)
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        let signature = self
            .profile
            .wallet()
            .sign(connection.pairwise_verkey.clone(), sig_data.clone())
            .await?;

        let decorator = SignatureDecorator {
            signature: STANDARD.encode(signature),
            sig_data: STANDARD.encode(sig_data),
            signer: connection.pairwise_verkey.clone(),
        };

        Ok(AriesMessage::ConnectionResponse(Response::new(
            decorator,
            connection.require_thread_id()?,
        )))
    }

    /// build_exchange_response attaches the responder's DID document signed with the
    /// invitation key
    async fn build_exchange_response(
        &self,
        connection: &Connection,
        data: ConnectionData,
    ) -> Result<AriesMessage, AgentError> {
        let attach = did_doc_attachment(&data.did_doc)?;
        let signature = self
            .profile
            .wallet()
            .sign(connection.pairwise_verkey.clone(), attach.payload()?)
            .await?;

        let invitation_id = connection
            .invitation_id()
            .ok_or_else(|| AgentError::InvalidState("invitation was missing".to_string()))?;

        Ok(AriesMessage::DidExchangeResponse(did_exchange::Response::new(
            data.did,
            attach.signed(connection.pairwise_verkey.clone(), &signature),
            connection.require_thread_id()?,
            invitation_id,
        )))
    }

    fn invitation_key(connection: &Connection) -> Result<String, AgentError> {
        connection
            .invitation
            .as_ref()
            .and_then(|invitation| invitation.recipient_keys.first().cloned())
            .ok_or_else(|| AgentError::InvalidState("invitation was missing".to_string()))
    }

    /// verify_exchange_response checks the DID document was signed by the invitation
    /// key and returns the responder's pairwise data
    async fn verify_exchange_response(
        &self,
        connection: &Connection,
        response: &did_exchange::Response,
    ) -> Result<ConnectionData, AgentError> {
        let invitation_key = Self::invitation_key(connection)?;
        let (signer, signature) = response.did_doc_attach.signature()?.ok_or_else(|| {
            AgentError::VerificationFailed("did exchange response is not signed".to_string())
        })?;

        if signer != invitation_key {
            return Err(AgentError::VerificationFailed(
                "response signer does not match the invitation key".to_string(),
            ));
        }

        let verified = self
            .profile
            .wallet()
            .verify(signer, response.did_doc_attach.payload()?, signature)
            .await?;

        if !verified {
            return Err(AgentError::VerificationFailed(
                "did document signature is invalid".to_string(),
            ));
        }

        let doc: DidDoc = response.did_doc_attach.decode()?;
        Ok(ConnectionData::new(
            response.did.clone(),
            doc.verkey,
            doc.service_endpoint,
        ))
    }

    /// verify_response checks the response was signed by the key the invitation
    /// advertised and returns the inviter's pairwise data
    async fn verify_response(
        &self,
        connection: &Connection,
        response: &Response,
    ) -> Result<ConnectionData, AgentError> {
        let invitation_key = Self::invitation_key(connection)?;

        let decorator = &response.connection_sig;
        if decorator.signer != invitation_key {
            return Err(AgentError::VerificationFailed(
                "response signer does not match the invitation key".to_string(),
            ));
        }

        let sig_data = STANDARD
            .decode(&decorator.sig_data)
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        let signature = STANDARD
            .decode(&decorator.signature)
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        let verified = self
            .profile
            .wallet()
            .verify(decorator.signer.clone(), sig_data.clone(), signature)
            .await?;

        if !verified {
            return Err(AgentError::VerificationFailed(
                "connection response signature is invalid".to_string(),
            ));
        }

        serde_json::from_slice(&sig_data)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    /// step runs the transition table on a checked out connection and performs the
    /// requested action, committing every state reached along the way
    async fn step(
        &self,
        connection: &mut Connection,
        message: Option<&AriesMessage>,
    ) -> Result<(), AgentError> {
        let transition = connection.transition(message, &self.protocols())?;
        let mut next = transition.next;

        match transition.action {
            None => {
                *connection = next;
            }
            Some(Action::Reply(reply)) => {
                *connection = next;
                self.send_with(connection, &reply).await?;
            }
            Some(Action::SendResponse) => {
                *connection = next.clone();
                let response = self.build_response(&next).await?;
                self.send_with(&next, &response).await?;

                next.state = State::Responded;
                *connection = next;
            }
            Some(Action::VerifyResponse(response)) => {
                let data = self.verify_response(&next, &response).await?;
                *connection = next.accept_response(data);
                self.send_ack(connection).await?;
            }
            Some(Action::VerifyExchangeResponse(response)) => {
                let data = self.verify_exchange_response(&next, &response).await?;
                *connection = next.accept_response(data);
                self.send_ack(connection).await?;
            }
            Some(Action::SendAck) => {
                *connection = next;
                self.send_ack(connection).await?;
            }
        }

        if connection.state == State::Accepted || connection.state == State::None {
            info!(
                "[connection:{}] reached {}",
                connection.source_id, connection.state
            );
        }

        Ok(())
    }

    async fn send_ack(&self, connection: &mut Connection) -> Result<(), AgentError> {
        let thread_id = connection.require_thread_id()?;
        let ack = match (connection.handshake, connection.invitation_id()) {
            (HandshakeProtocol::DidExchangeV1, Some(invitation_id)) => {
                AriesMessage::DidExchangeComplete(did_exchange::Complete::new(
                    thread_id,
                    invitation_id,
                ))
            }
            _ => AriesMessage::Ack(Ack::new(thread_id)),
        };
        self.send_with(connection, &ack).await?;

        let accepted = {
            let mut next = connection.clone();
            next.state = State::Accepted;
            next
        };

        *connection = accepted;
        Ok(())
    }
}

#[async_trait]
impl<TProfile> UsecaseBuilder<Connection> for Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    type ProfileImplementer = TProfile;

    fn profile(&self) -> Self::ProfileImplementer {
        self.profile.clone()
    }

    fn config(&self) -> AgentConfig {
        self.config.clone()
    }
}

#[async_trait]
impl<TProfile> ConnectionAPI for Usecase<TProfile>
where
    TProfile: ProfileBuilder,
{
    type EntityAccessor = Connection;

    async fn create(&self, source_id: String) -> Result<Handle, AgentError> {
        let (did, verkey) = self.profile.wallet().create_and_store_my_did().await?;
        let connection = Connection::new_inviter(source_id, did, verkey);
        Ok(self.cache.insert(connection).await)
    }

    async fn create_with_invite(
        &self,
        source_id: String,
        invitation: Invitation,
    ) -> Result<Handle, AgentError> {
        self.create_with_handshake(source_id, invitation, HandshakeProtocol::ConnectionV1)
            .await
    }

    async fn create_with_handshake(
        &self,
        source_id: String,
        invitation: Invitation,
        handshake: HandshakeProtocol,
    ) -> Result<Handle, AgentError> {
        let (did, verkey) = self.profile.wallet().create_and_store_my_did().await?;
        let connection =
            Connection::new_invitee(source_id, did, verkey, invitation)?.with_handshake(handshake);
        Ok(self.cache.insert(connection).await)
    }

    async fn connect(&self, handle: Handle) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let label = self.config.agent().get_label();
        let endpoint = self.config.agent().get_service_endpoint();

        match guard.role {
            Role::Inviter => {
                *guard = guard.invite(label, endpoint)?;
                debug!("[connection:{}] invitation generated", guard.source_id);
            }
            Role::Invitee => {
                let (next, request) = guard.request(label, endpoint)?;
                self.send_with(&guard, &request).await?;
                *guard = next;
            }
        }

        Ok(())
    }

    async fn update_state(&self, handle: Handle) -> Result<State, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        let messages = self.fetch_with(&guard).await?;
        let relevant = messages
            .into_iter()
            .find(|received| guard.is_relevant(received));

        match relevant {
            Some(received) => {
                // a message whose effect was committed is consumed even when the
                // follow-up send failed, the send is retried as pending work
                let before = guard.clone();
                let outcome = self.step(&mut guard, Some(&received.message)).await;
                let consumed = match &outcome {
                    Ok(_) => true,
                    Err(err) => !err.is_retryable() || *guard != before,
                };

                if consumed {
                    if let Err(err) = &outcome {
                        warn!(
                            "[connection:{}] dropped {}: {}",
                            guard.source_id,
                            received.message.name(),
                            err
                        );
                    }

                    self.acknowledge_with(&guard, received.envelope_id).await?;
                }

                outcome?;
            }
            None => self.step(&mut guard, None).await?,
        }

        Ok(guard.state)
    }

    async fn update_state_with_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<State, AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        self.step(&mut guard, Some(&message)).await?;
        Ok(guard.state)
    }

    async fn handle_message(
        &self,
        handle: Handle,
        message: AriesMessage,
    ) -> Result<(), AgentError> {
        let connection = self.cache.snapshot(handle).await?;
        let reply = match Connection::reply_for(&message, &self.protocols()) {
            Some(reply) => reply,
            None => {
                debug!(
                    "[connection:{}] no automatic reply for {}",
                    connection.source_id,
                    message.name()
                );
                return Ok(());
            }
        };

        if !connection.is_usable() {
            return Err(AgentError::InvalidState(format!(
                "cannot answer {} in {}",
                message.name(),
                connection.state
            )));
        }

        self.send_with(&connection, &reply).await
    }

    async fn send_message(&self, handle: Handle, message: AriesMessage) -> Result<(), AgentError> {
        let connection = self.cache.snapshot(handle).await?;
        if !connection.is_usable() {
            return Err(AgentError::InvalidState(format!(
                "connection {} is not accepted",
                connection.source_id
            )));
        }

        self.send_with(&connection, &message).await
    }

    async fn download_messages(&self, handle: Handle) -> Result<Vec<ReceivedMessage>, AgentError> {
        let connection = self.cache.snapshot(handle).await?;
        let messages = self.fetch_with(&connection).await?;

        Ok(messages
            .into_iter()
            .filter(|received| match connection.their_verkey.as_ref() {
                Some(their) => received.sender_verkey.as_ref() == Some(their),
                None => true,
            })
            .collect())
    }

    async fn acknowledge_message(
        &self,
        handle: Handle,
        envelope_id: String,
    ) -> Result<(), AgentError> {
        let connection = self.cache.snapshot(handle).await?;
        self.acknowledge_with(&connection, envelope_id).await
    }

    async fn send_ping(&self, handle: Handle, comment: Option<String>) -> Result<(), AgentError> {
        let ping = AriesMessage::Ping(Ping::new(true, comment));
        self.send_message(handle, ping).await
    }

    async fn send_discovery_features(
        &self,
        handle: Handle,
        query: Option<String>,
        comment: Option<String>,
    ) -> Result<(), AgentError> {
        let query = AriesMessage::Query(Query::new(query, comment));
        self.send_message(handle, query).await
    }

    async fn send_handshake_reuse(
        &self,
        handle: Handle,
        invitation_id: String,
    ) -> Result<(), AgentError> {
        let reuse = AriesMessage::HandshakeReuse(HandshakeReuse::new(invitation_id));
        self.send_message(handle, reuse).await
    }

    async fn sign_data(&self, handle: Handle, data: Vec<u8>) -> Result<Vec<u8>, AgentError> {
        let connection = self.cache.snapshot(handle).await?;
        self.profile
            .wallet()
            .sign(connection.pairwise_verkey, data)
            .await
    }

    async fn verify_signature(
        &self,
        handle: Handle,
        data: Vec<u8>,
        signature: Vec<u8>,
    ) -> Result<bool, AgentError> {
        let connection = self.cache.snapshot(handle).await?;
        let their_verkey = connection.their_verkey.ok_or_else(|| {
            AgentError::InvalidState("peer verkey is not known yet".to_string())
        })?;

        self.profile
            .wallet()
            .verify(their_verkey, data, signature)
            .await
    }

    async fn get_connection(&self, handle: Handle) -> Result<Self::EntityAccessor, AgentError> {
        self.cache.snapshot(handle).await
    }

    async fn get_state(&self, handle: Handle) -> Result<State, AgentError> {
        Ok(self.cache.snapshot(handle).await?.state)
    }

    async fn get_invite_details(&self, handle: Handle) -> Result<Invitation, AgentError> {
        self.cache
            .snapshot(handle)
            .await?
            .get_invitation()
            .ok_or_else(|| AgentError::InvalidState("invitation not generated yet".to_string()))
    }

    async fn get_thread_id(&self, handle: Handle) -> Result<String, AgentError> {
        self.cache.snapshot(handle).await?.require_thread_id()
    }

    async fn get_source_id(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_source_id())
    }

    async fn get_pw_did(&self, handle: Handle) -> Result<String, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_pw_did())
    }

    async fn get_their_pw_did(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        Ok(self.cache.snapshot(handle).await?.get_their_pw_did())
    }

    async fn info(&self, handle: Handle) -> Result<PairwiseInfo, AgentError> {
        let connection = self.cache.snapshot(handle).await?;
        Ok(PairwiseInfo {
            role: connection.get_role(),
            state: connection.get_state(),
            handshake: connection.get_handshake(),
            my_did: connection.get_pw_did(),
            my_verkey: connection.get_pw_verkey(),
            their_did: connection.get_their_pw_did(),
            their_verkey: connection.get_their_pw_verkey(),
            their_endpoint: connection.get_service_endpoint(),
            protocols: connection.get_protocols(),
        })
    }

    async fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        let connection = self.cache.snapshot(handle).await?;
        connection
            .to_json()
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    async fn deserialize(&self, data: String) -> Result<Handle, AgentError> {
        let connection = Connection::try_from(data.into_bytes())?;
        Ok(self.cache.insert(connection).await)
    }

    async fn delete_connection(&self, handle: Handle) -> Result<(), AgentError> {
        let mut guard = self.cache.checkout(handle).await?;
        *guard = guard.terminate();
        info!("[connection:{}] deleted", guard.source_id);
        Ok(())
    }

    async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        self.cache.release(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    use rst_common::with_tokio::tokio;

    use crate::collaborators::Profile;
    use crate::config::{Agent, Discovery, Tails};
    use crate::memory::{
        FileTailsFetcher, InMemoryLedger, InMemoryProfile, InMemoryTransport, InMemoryWallet,
    };
    use crate::messages::notification::ProblemReport;

    mock!(
        FakeTransport{}

        impl Clone for FakeTransport {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl TransportBuilder for FakeTransport {
            async fn send(&self, endpoint: String, envelope: Envelope) -> Result<(), AgentError>;
            async fn receive(&self, recipient_verkey: String) -> Result<Vec<Envelope>, AgentError>;
            async fn acknowledge(
                &self,
                recipient_verkey: String,
                envelope_id: String,
            ) -> Result<(), AgentError>;
        }
    );

    fn config(label: &str) -> AgentConfig {
        AgentConfig::new(
            Agent::new(label.to_string(), format!("http://{}", label)),
            Tails::new(std::env::temp_dir().display().to_string()),
            Discovery::default(),
        )
    }

    fn pair() -> (
        Usecase<InMemoryProfile>,
        Usecase<InMemoryProfile>,
        InMemoryTransport,
    ) {
        let ledger = InMemoryLedger::new();
        let transport = InMemoryTransport::new();

        let faber = Profile::new(
            InMemoryWallet::new(),
            ledger.clone(),
            transport.clone(),
            FileTailsFetcher::new(),
        );
        let alice = Profile::new(
            InMemoryWallet::new(),
            ledger,
            transport.clone(),
            FileTailsFetcher::new(),
        );

        (
            Usecase::new(faber, config("faber")),
            Usecase::new(alice, config("alice")),
            transport,
        )
    }

    async fn establish(
        faber: &Usecase<InMemoryProfile>,
        alice: &Usecase<InMemoryProfile>,
    ) -> (Handle, Handle) {
        let inviter = faber.create("alice".to_string()).await.unwrap();
        faber.connect(inviter).await.unwrap();

        let invitation = faber.get_invite_details(inviter).await.unwrap();
        let invitee = alice
            .create_with_invite("faber".to_string(), invitation)
            .await
            .unwrap();
        alice.connect(invitee).await.unwrap();

        assert_eq!(faber.update_state(inviter).await.unwrap(), State::Responded);
        assert_eq!(alice.update_state(invitee).await.unwrap(), State::Accepted);
        assert_eq!(faber.update_state(inviter).await.unwrap(), State::Accepted);

        (inviter, invitee)
    }

    #[tokio::test]
    async fn test_full_handshake() {
        let (faber, alice, transport) = pair();
        let (inviter, invitee) = establish(&faber, &alice).await;

        let faber_info = faber.info(inviter).await.unwrap();
        let alice_info = alice.info(invitee).await.unwrap();

        assert_eq!(faber_info.their_did, Some(alice_info.my_did.clone()));
        assert_eq!(alice_info.their_did, Some(faber_info.my_did.clone()));
        assert_eq!(
            faber.get_thread_id(inviter).await.unwrap(),
            alice.get_thread_id(invitee).await.unwrap()
        );
        assert_eq!(transport.pending(&faber_info.my_verkey).await, 0);
        assert_eq!(transport.pending(&alice_info.my_verkey).await, 0);
    }

    #[tokio::test]
    async fn test_poll_without_message_is_noop() {
        let (faber, _, _) = pair();
        let inviter = faber.create("alice".to_string()).await.unwrap();
        faber.connect(inviter).await.unwrap();

        assert_eq!(faber.update_state(inviter).await.unwrap(), State::Invited);
        assert_eq!(faber.update_state(inviter).await.unwrap(), State::Invited);
    }

    #[tokio::test]
    async fn test_update_with_message_matches_polling() {
        let (faber, alice, _) = pair();
        let inviter = faber.create("alice".to_string()).await.unwrap();
        faber.connect(inviter).await.unwrap();

        let invitation = faber.get_invite_details(inviter).await.unwrap();
        let invitee = alice
            .create_with_invite("faber".to_string(), invitation)
            .await
            .unwrap();
        alice.connect(invitee).await.unwrap();

        let request = faber.download_messages(inviter).await.unwrap();
        assert_eq!(request.len(), 1);

        let state = faber
            .update_state_with_message(inviter, request[0].message.clone())
            .await
            .unwrap();
        assert_eq!(state, State::Responded);

        let response = alice.download_messages(invitee).await.unwrap();
        let state = alice
            .update_state_with_message(invitee, response[0].message.clone())
            .await
            .unwrap();
        assert_eq!(state, State::Accepted);
    }

    #[tokio::test]
    async fn test_invalid_transition_is_violation() {
        let (faber, alice, _) = pair();
        let (inviter, _) = establish(&faber, &alice).await;

        let thid = faber.get_thread_id(inviter).await.unwrap();
        let bogus = faber
            .build_response(&faber.get_connection(inviter).await.unwrap())
            .await
            .unwrap();

        let result = faber.update_state_with_message(inviter, bogus).await;
        assert!(matches!(result, Err(AgentError::ProtocolViolation(_))));
        assert_eq!(faber.get_state(inviter).await.unwrap(), State::Accepted);
        assert_eq!(faber.get_thread_id(inviter).await.unwrap(), thid);
    }

    #[tokio::test]
    async fn test_response_retry_after_send_failure() {
        let (faber, alice, transport) = pair();
        let inviter = faber.create("alice".to_string()).await.unwrap();
        faber.connect(inviter).await.unwrap();

        let invitation = faber.get_invite_details(inviter).await.unwrap();
        let invitee = alice
            .create_with_invite("faber".to_string(), invitation)
            .await
            .unwrap();
        alice.connect(invitee).await.unwrap();

        transport.set_offline(true);
        let failed = faber.update_state(inviter).await;
        assert!(matches!(failed, Err(AgentError::TransportError(_))));
        assert_eq!(faber.get_state(inviter).await.unwrap(), State::Requested);

        transport.set_offline(false);
        assert_eq!(faber.update_state(inviter).await.unwrap(), State::Responded);
        assert_eq!(alice.update_state(invitee).await.unwrap(), State::Accepted);
    }

    #[tokio::test]
    async fn test_tampered_response_rejected() {
        let (faber, alice, _) = pair();
        let inviter = faber.create("alice".to_string()).await.unwrap();
        faber.connect(inviter).await.unwrap();

        let invitation = faber.get_invite_details(inviter).await.unwrap();
        let invitee = alice
            .create_with_invite("faber".to_string(), invitation)
            .await
            .unwrap();
        alice.connect(invitee).await.unwrap();
        faber.update_state(inviter).await.unwrap();

        let mut received = alice.download_messages(invitee).await.unwrap();
        let tampered = match received.remove(0).message {
            AriesMessage::ConnectionResponse(mut response) => {
                let data = ConnectionData::new(
                    "mallory".to_string(),
                    "mallory-key".to_string(),
                    "http://mallory".to_string(),
                );
                response.connection_sig.sig_data =
                    STANDARD.encode(serde_json::to_vec(&data).unwrap());
                AriesMessage::ConnectionResponse(response)
            }
            other => panic!("unexpected message: {:?}", other),
        };

        let result = alice.update_state_with_message(invitee, tampered).await;
        assert!(matches!(result, Err(AgentError::VerificationFailed(_))));
        assert_eq!(alice.get_state(invitee).await.unwrap(), State::Requested);
    }

    async fn exchange_requested(
        faber: &Usecase<InMemoryProfile>,
        alice: &Usecase<InMemoryProfile>,
    ) -> (Handle, Handle) {
        let inviter = faber.create("alice".to_string()).await.unwrap();
        faber.connect(inviter).await.unwrap();

        let invitation = faber.get_invite_details(inviter).await.unwrap();
        let invitee = alice
            .create_with_handshake(
                "faber".to_string(),
                invitation,
                HandshakeProtocol::DidExchangeV1,
            )
            .await
            .unwrap();
        alice.connect(invitee).await.unwrap();

        (inviter, invitee)
    }

    #[tokio::test]
    async fn test_did_exchange_handshake() {
        let (faber, alice, transport) = pair();
        let (inviter, invitee) = exchange_requested(&faber, &alice).await;
        let invitation_id = faber.get_thread_id(inviter).await.unwrap();

        assert_eq!(faber.update_state(inviter).await.unwrap(), State::Responded);
        assert_eq!(alice.update_state(invitee).await.unwrap(), State::Accepted);
        assert_eq!(faber.update_state(inviter).await.unwrap(), State::Accepted);

        let faber_info = faber.info(inviter).await.unwrap();
        let alice_info = alice.info(invitee).await.unwrap();
        assert_eq!(faber_info.handshake, HandshakeProtocol::DidExchangeV1);
        assert_eq!(alice_info.handshake, HandshakeProtocol::DidExchangeV1);
        assert_eq!(faber_info.their_did, Some(alice_info.my_did.clone()));
        assert_eq!(alice_info.their_did, Some(faber_info.my_did.clone()));
        assert_eq!(alice_info.their_verkey, Some(faber_info.my_verkey.clone()));

        let thread_id = alice.get_thread_id(invitee).await.unwrap();
        assert_ne!(thread_id, invitation_id);
        assert_eq!(faber.get_thread_id(inviter).await.unwrap(), thread_id);
        assert_eq!(transport.pending(&faber_info.my_verkey).await, 0);
        assert_eq!(transport.pending(&alice_info.my_verkey).await, 0);

        faber.send_ping(inviter, None).await.unwrap();
        assert_eq!(alice.update_state(invitee).await.unwrap(), State::Accepted);
    }

    #[tokio::test]
    async fn test_did_exchange_rejects_unsigned_document() {
        let (faber, alice, _) = pair();
        let (inviter, invitee) = exchange_requested(&faber, &alice).await;
        faber.update_state(inviter).await.unwrap();

        let mut received = alice.download_messages(invitee).await.unwrap();
        let response = match received.remove(0).message {
            AriesMessage::DidExchangeResponse(response) => response,
            other => panic!("unexpected message: {:?}", other),
        };

        let mut unsigned = response.clone();
        unsigned.did_doc_attach.data.jws = None;
        let result = alice
            .update_state_with_message(invitee, AriesMessage::DidExchangeResponse(unsigned))
            .await;
        assert!(matches!(result, Err(AgentError::VerificationFailed(_))));

        let mut swapped = response.clone();
        let mallory = ConnectionData::new(
            "mallory".to_string(),
            "mallory-key".to_string(),
            "http://mallory".to_string(),
        );
        let jws = swapped.did_doc_attach.data.jws.clone();
        swapped.did_doc_attach = did_doc_attachment(&mallory.did_doc).unwrap();
        swapped.did_doc_attach.data.jws = jws;
        let result = alice
            .update_state_with_message(invitee, AriesMessage::DidExchangeResponse(swapped))
            .await;
        assert!(matches!(result, Err(AgentError::VerificationFailed(_))));
        assert_eq!(alice.get_state(invitee).await.unwrap(), State::Requested);

        let state = alice
            .update_state_with_message(invitee, AriesMessage::DidExchangeResponse(response))
            .await
            .unwrap();
        assert_eq!(state, State::Accepted);
    }

    #[tokio::test]
    async fn test_ping_and_discovery() {
        let (faber, alice, _) = pair();
        let (inviter, invitee) = establish(&faber, &alice).await;

        alice
            .send_discovery_features(invitee, Some("https://didcomm.org/*".to_string()), None)
            .await
            .unwrap();
        assert_eq!(faber.update_state(inviter).await.unwrap(), State::Accepted);
        assert_eq!(alice.update_state(invitee).await.unwrap(), State::Accepted);

        let info = alice.info(invitee).await.unwrap();
        assert!(!info.protocols.is_empty());

        alice.send_ping(invitee, None).await.unwrap();
        let pings = faber.download_messages(inviter).await.unwrap();
        assert!(matches!(pings[0].message, AriesMessage::Ping(_)));

        faber
            .handle_message(inviter, pings[0].message.clone())
            .await
            .unwrap();
        let responses = alice.download_messages(invitee).await.unwrap();
        assert!(responses
            .iter()
            .any(|received| matches!(received.message, AriesMessage::PingResponse(_))));
    }

    #[tokio::test]
    async fn test_handle_message_ignores_others() {
        let (faber, alice, _) = pair();
        let (inviter, invitee) = establish(&faber, &alice).await;

        let report = AriesMessage::ProblemReport(ProblemReport::new(
            "thread".to_string(),
            "unknown",
            None,
        ));
        assert!(faber.handle_message(inviter, report).await.is_ok());
        assert_eq!(faber.get_state(inviter).await.unwrap(), State::Accepted);
        assert!(alice.download_messages(invitee).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_and_verify_signature() {
        let (faber, alice, _) = pair();
        let (inviter, invitee) = establish(&faber, &alice).await;

        let data = b"signed payload".to_vec();
        let signature = faber.sign_data(inviter, data.clone()).await.unwrap();

        let verified = alice
            .verify_signature(invitee, data.clone(), signature.clone())
            .await
            .unwrap();
        assert!(verified);

        let wrong = alice
            .verify_signature(invitee, b"other payload".to_vec(), signature)
            .await
            .unwrap();
        assert!(!wrong);
    }

    #[tokio::test]
    async fn test_serialize_release() {
        let (faber, alice, _) = pair();
        let (inviter, _) = establish(&faber, &alice).await;

        let serialized = faber.serialize(inviter).await.unwrap();
        faber.release(inviter).await.unwrap();

        let released = faber.get_state(inviter).await;
        assert!(matches!(released, Err(AgentError::InvalidHandle(_))));

        let restored = faber.deserialize(serialized.clone()).await.unwrap();
        assert_ne!(restored, inviter);
        assert_eq!(faber.get_state(restored).await.unwrap(), State::Accepted);
        assert_eq!(faber.serialize(restored).await.unwrap(), serialized);
    }

    #[tokio::test]
    async fn test_delete_connection() {
        let (faber, alice, _) = pair();
        let (inviter, _) = establish(&faber, &alice).await;

        faber.delete_connection(inviter).await.unwrap();
        assert_eq!(faber.get_state(inviter).await.unwrap(), State::None);

        let ping = faber.send_ping(inviter, None).await;
        assert!(matches!(ping, Err(AgentError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_request_send_failure_keeps_invited() {
        let invitation = Invitation::new(
            "faber".to_string(),
            vec![bs58::encode([7u8; 32]).into_string()],
            "http://faber".to_string(),
        );

        let mut transport = MockFakeTransport::new();
        transport.expect_clone().returning(|| {
            let mut cloned = MockFakeTransport::new();
            cloned
                .expect_send()
                .returning(|_, _| Err(AgentError::TransportError("offline".to_string())));
            cloned
        });

        let profile = Profile::new(
            InMemoryWallet::new(),
            InMemoryLedger::new(),
            transport,
            FileTailsFetcher::new(),
        );
        let alice = Usecase::new(profile, config("alice"));

        let invitee = alice
            .create_with_invite("faber".to_string(), invitation)
            .await
            .unwrap();

        let connected = alice.connect(invitee).await;
        assert!(matches!(connected, Err(AgentError::TransportError(_))));
        assert_eq!(alice.get_state(invitee).await.unwrap(), State::Invited);
    }

    #[tokio::test]
    async fn test_concurrent_transition_is_busy() {
        let (faber, _, _) = pair();
        let inviter = faber.create("alice".to_string()).await.unwrap();

        let guard = faber.cache.checkout(inviter).await.unwrap();
        let busy = faber.connect(inviter).await;
        assert!(matches!(busy, Err(AgentError::ObjectBusy(_))));
        drop(guard);

        assert!(faber.connect(inviter).await.is_ok());
    }
}
