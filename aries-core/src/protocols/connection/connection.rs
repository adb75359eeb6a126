use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::errors::AgentError;
use crate::messages::connection::{ConnectionData, DidDoc, Invitation, Request};
use crate::messages::did_exchange::{self, did_doc_attachment};
use crate::messages::discovery::{Disclose, ProtocolDescriptor, Query};
use crate::messages::out_of_band::{HandshakeProtocol, HandshakeReuseAccepted};
use crate::messages::trust_ping::PingResponse;
use crate::messages::{AriesMessage, Family};

use super::types::{Action, ConnectionEntityAccessor, ReceivedMessage, Role, State};

/// Transition is the outcome of one step of the connection table
#[derive(Debug, Clone)]
pub struct Transition {
    pub next: Connection,
    pub action: Option<Action>,
}

impl Transition {
    fn stay(connection: &Connection) -> Self {
        Self {
            next: connection.clone(),
            action: None,
        }
    }

    fn to(next: Connection, action: Option<Action>) -> Self {
        Self { next, action }
    }
}

/// Connection is one side of a pairwise channel
///
/// The pairwise key is generated by the wallet when the object is created. For an
/// inviter it is also the invitation key, so the invitee reaches the inviter through it
/// before the response discloses anything else. `thread_id` is the invitation id and
/// correlates every message of the handshake. A DID Exchange handshake moves the
/// thread to the request id, the invitation stays its parent thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(crate = "self::serde")]
pub struct Connection {
    pub(crate) source_id: String,
    pub(crate) role: Role,
    pub(crate) state: State,
    pub(crate) pairwise_did: String,
    pub(crate) pairwise_verkey: String,
    pub(crate) their_did: Option<String>,
    pub(crate) their_verkey: Option<String>,
    pub(crate) service_endpoint: Option<String>,
    pub(crate) invitation: Option<Invitation>,
    pub(crate) thread_id: Option<String>,

    #[serde(default)]
    pub(crate) handshake: HandshakeProtocol,

    #[serde(default)]
    pub(crate) protocols: Vec<ProtocolDescriptor>,

    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new_inviter(source_id: String, pairwise_did: String, pairwise_verkey: String) -> Self {
        let now = Utc::now();
        Self {
            source_id,
            role: Role::Inviter,
            state: State::Initial,
            pairwise_did,
            pairwise_verkey,
            their_did: None,
            their_verkey: None,
            service_endpoint: None,
            invitation: None,
            thread_id: None,
            handshake: HandshakeProtocol::default(),
            protocols: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_invitee(
        source_id: String,
        pairwise_did: String,
        pairwise_verkey: String,
        invitation: Invitation,
    ) -> Result<Self, AgentError> {
        let their_verkey = invitation.recipient_keys.first().cloned().ok_or_else(|| {
            AgentError::ValidationError("invitation recipient keys were missing".to_string())
        })?;

        if invitation.service_endpoint.is_empty() {
            return Err(AgentError::ValidationError(
                "invitation service endpoint was missing".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            source_id,
            role: Role::Invitee,
            state: State::Invited,
            pairwise_did,
            pairwise_verkey,
            their_did: None,
            their_verkey: Some(their_verkey),
            service_endpoint: Some(invitation.service_endpoint.clone()),
            thread_id: Some(invitation.id.clone()),
            invitation: Some(invitation),
            handshake: HandshakeProtocol::default(),
            protocols: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// with_handshake selects the handshake an invitee runs when it connects
    pub fn with_handshake(mut self, handshake: HandshakeProtocol) -> Self {
        self.handshake = handshake;
        self
    }

    pub fn invitation_id(&self) -> Option<String> {
        self.invitation.as_ref().map(|invitation| invitation.id.clone())
    }

    fn with_state(&self, state: State) -> Self {
        let mut next = self.clone();
        next.state = state;
        next.updated_at = Utc::now();
        next
    }

    /// invite builds the invitation of an inviter in `Initial`
    pub fn invite(&self, label: String, endpoint: String) -> Result<Self, AgentError> {
        if self.role != Role::Inviter || self.state != State::Initial {
            return Err(AgentError::InvalidState(format!(
                "cannot generate invitation as {} in {}",
                self.role, self.state
            )));
        }

        let invitation = Invitation::new(label, vec![self.pairwise_verkey.clone()], endpoint);
        let mut next = self.with_state(State::Invited);
        next.thread_id = Some(invitation.id.clone());
        next.invitation = Some(invitation);
        Ok(next)
    }

    /// request builds the handshake request of an invitee in `Invited`, the
    /// returned connection is the state to commit once the request is delivered
    pub fn request(
        &self,
        label: String,
        endpoint: String,
    ) -> Result<(Self, AriesMessage), AgentError> {
        if self.role != Role::Invitee || self.state != State::Invited {
            return Err(AgentError::InvalidState(format!(
                "cannot send request as {} in {}",
                self.role, self.state
            )));
        }

        let thread_id = self.require_thread_id()?;
        let data = ConnectionData::new(
            self.pairwise_did.clone(),
            self.pairwise_verkey.clone(),
            endpoint,
        );

        match self.handshake {
            HandshakeProtocol::ConnectionV1 => {
                let request = Request::new(label, data, thread_id);
                Ok((
                    self.with_state(State::Requested),
                    AriesMessage::ConnectionRequest(request),
                ))
            }
            HandshakeProtocol::DidExchangeV1 => {
                let attach = did_doc_attachment(&data.did_doc)?;
                let request = did_exchange::Request::new(label, data.did, attach, thread_id);

                let mut next = self.with_state(State::Requested);
                next.thread_id = Some(request.id.clone());
                Ok((next, AriesMessage::DidExchangeRequest(request)))
            }
        }
    }

    /// accept_response records the inviter's disclosed pairwise data once the
    /// response signature has been verified
    pub fn accept_response(&self, data: ConnectionData) -> Self {
        let mut next = self.with_state(State::Responded);
        next.their_did = Some(data.did);
        next.their_verkey = Some(data.did_doc.verkey);
        next.service_endpoint = Some(data.did_doc.service_endpoint);
        next
    }

    pub fn terminate(&self) -> Self {
        self.with_state(State::None)
    }

    pub fn require_thread_id(&self) -> Result<String, AgentError> {
        self.thread_id.clone().ok_or_else(|| {
            AgentError::InvalidState("connection has no invitation yet".to_string())
        })
    }

    /// remote returns the peer verkey and endpoint a message must be sent to
    pub fn remote(&self) -> Result<(String, String), AgentError> {
        match (self.their_verkey.as_ref(), self.service_endpoint.as_ref()) {
            (Some(verkey), Some(endpoint)) => Ok((verkey.to_owned(), endpoint.to_owned())),
            _ => Err(AgentError::InvalidState(format!(
                "connection {} has no remote endpoint",
                self.source_id
            ))),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.state == State::Accepted
    }

    /// is_relevant selects mailbox messages this connection's table should consume
    ///
    /// Handshake, acknowledgement and problem report messages must carry the
    /// connection thread. Ping, discovery and reuse messages open their own threads and
    /// are accepted from the known peer only.
    pub fn is_relevant(&self, received: &ReceivedMessage) -> bool {
        if let (Some(their), Some(sender)) =
            (self.their_verkey.as_ref(), received.sender_verkey.as_ref())
        {
            if their != sender {
                return false;
            }
        }

        if Self::is_threaded(&received.message) {
            return self.on_thread(&received.message);
        }

        match received.message.family() {
            Family::TrustPing | Family::DiscoverFeatures => self.their_verkey.is_some(),
            Family::OutOfBand => {
                matches!(
                    received.message,
                    AriesMessage::HandshakeReuse(_) | AriesMessage::HandshakeReuseAccepted(_)
                ) && self.their_verkey.is_some()
            }
            _ => false,
        }
    }

    /// transition is the connection table shared by polling and pushed updates
    ///
    /// A `None` message advances pending work only: a response the inviter failed to
    /// send and an acknowledgement the invitee failed to send. Any undefined pair yields
    /// [`AgentError::ProtocolViolation`] and leaves the connection untouched.
    pub fn transition(
        &self,
        message: Option<&AriesMessage>,
        protocols: &[String],
    ) -> Result<Transition, AgentError> {
        let message = match message {
            Some(message) => message,
            None => return Ok(self.pending_work()),
        };

        if Self::is_threaded(message) && !self.on_thread(message) {
            return Err(AgentError::ProtocolViolation(format!(
                "{} received {} from thread {}",
                self.source_id,
                message.name(),
                message.thread_id()
            )));
        }

        if let AriesMessage::ProblemReport(_) = message {
            if self.state == State::None {
                return Ok(Transition::stay(self));
            }

            return Ok(Transition::to(self.terminate(), None));
        }

        let exchange = self.handshake == HandshakeProtocol::DidExchangeV1;
        match (self.role, self.state, message) {
            (Role::Inviter, State::Invited, AriesMessage::ConnectionRequest(request)) => {
                let mut next = self.with_state(State::Requested);
                next.their_did = Some(request.connection.did.clone());
                next.their_verkey = Some(request.connection.did_doc.verkey.clone());
                next.service_endpoint = Some(request.connection.did_doc.service_endpoint.clone());
                Ok(Transition::to(next, Some(Action::SendResponse)))
            }
            (Role::Inviter, State::Invited, AriesMessage::DidExchangeRequest(request)) => {
                let doc: DidDoc = request.did_doc_attach.decode()?;
                let mut next = self
                    .with_state(State::Requested)
                    .with_handshake(HandshakeProtocol::DidExchangeV1);
                next.their_did = Some(request.did.clone());
                next.their_verkey = Some(doc.verkey);
                next.service_endpoint = Some(doc.service_endpoint);
                next.thread_id = Some(request.id.clone());
                Ok(Transition::to(next, Some(Action::SendResponse)))
            }
            (Role::Inviter, State::Responded, AriesMessage::Ack(_)) if !exchange => {
                Ok(Transition::to(self.with_state(State::Accepted), None))
            }
            (Role::Inviter, State::Responded, AriesMessage::DidExchangeComplete(_)) if exchange => {
                Ok(Transition::to(self.with_state(State::Accepted), None))
            }
            (Role::Inviter, State::Responded, message) if Self::is_self_loop(message) => {
                self.with_state(State::Accepted).accepted(message, protocols)
            }
            (Role::Invitee, State::Requested, AriesMessage::ConnectionResponse(response))
                if !exchange =>
            {
                Ok(Transition::to(
                    self.clone(),
                    Some(Action::VerifyResponse(response.clone())),
                ))
            }
            (Role::Invitee, State::Requested, AriesMessage::DidExchangeResponse(response))
                if exchange =>
            {
                Ok(Transition::to(
                    self.clone(),
                    Some(Action::VerifyExchangeResponse(response.clone())),
                ))
            }
            (_, State::Accepted, AriesMessage::Ack(_)) => Ok(Transition::stay(self)),
            (_, State::Accepted, message) if Self::is_self_loop(message) => {
                self.accepted(message, protocols)
            }
            (role, state, message) => Err(AgentError::ProtocolViolation(format!(
                "{} cannot handle {} as {} in {}",
                self.source_id,
                message.name(),
                role,
                state
            ))),
        }
    }

    fn pending_work(&self) -> Transition {
        match (self.role, self.state) {
            (Role::Inviter, State::Requested) => {
                Transition::to(self.clone(), Some(Action::SendResponse))
            }
            (Role::Invitee, State::Responded) => {
                Transition::to(self.clone(), Some(Action::SendAck))
            }
            _ => Transition::stay(self),
        }
    }

    /// is_threaded names the messages that must carry the handshake thread
    fn is_threaded(message: &AriesMessage) -> bool {
        matches!(
            message.family(),
            Family::Connection
                | Family::DidExchange
                | Family::Notification
                | Family::ReportProblem
        )
    }

    /// on_thread matches a threaded message against this connection, a DID Exchange
    /// request opens its own thread and answers the invitation through its parent
    fn on_thread(&self, message: &AriesMessage) -> bool {
        if let AriesMessage::DidExchangeRequest(request) = message {
            return self.invitation_id().is_some()
                && request.invitation_id() == self.invitation_id().as_deref();
        }

        self.thread_id.as_deref() == Some(message.thread_id().as_str())
    }

    fn is_self_loop(message: &AriesMessage) -> bool {
        matches!(
            message,
            AriesMessage::Ping(_)
                | AriesMessage::PingResponse(_)
                | AriesMessage::Query(_)
                | AriesMessage::Disclose(_)
                | AriesMessage::HandshakeReuse(_)
                | AriesMessage::HandshakeReuseAccepted(_)
        )
    }

    fn accepted(
        &self,
        message: &AriesMessage,
        protocols: &[String],
    ) -> Result<Transition, AgentError> {
        if let AriesMessage::Disclose(disclose) = message {
            let mut next = self.clone();
            next.protocols = disclose.protocols.clone();
            next.updated_at = Utc::now();
            return Ok(Transition::to(next, None));
        }

        let action = Self::reply_for(message, protocols).map(Action::Reply);
        Ok(Transition::to(self.clone(), action))
    }

    /// reply_for is the fixed auto-response allowlist: a ping asking for a response,
    /// a discovery query and an out-of-band handshake reuse
    pub fn reply_for(message: &AriesMessage, protocols: &[String]) -> Option<AriesMessage> {
        match message {
            AriesMessage::Ping(ping) if ping.response_requested => {
                Some(AriesMessage::PingResponse(PingResponse::new(ping.id.clone())))
            }
            AriesMessage::Query(query) => Some(AriesMessage::Disclose(Self::disclose(
                query, protocols,
            ))),
            AriesMessage::HandshakeReuse(reuse) => Some(AriesMessage::HandshakeReuseAccepted(
                HandshakeReuseAccepted::new(reuse),
            )),
            _ => None,
        }
    }

    fn disclose(query: &Query, protocols: &[String]) -> Disclose {
        let matched = protocols
            .iter()
            .filter(|protocol| query.matches(protocol))
            .map(|protocol| ProtocolDescriptor {
                pid: protocol.to_owned(),
                roles: None,
            })
            .collect();

        Disclose::new(matched, query.id.clone())
    }
}

impl ConnectionEntityAccessor for Connection {
    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_role(&self) -> Role {
        self.role
    }

    fn get_state(&self) -> State {
        self.state
    }

    fn get_handshake(&self) -> HandshakeProtocol {
        self.handshake
    }

    fn get_pw_did(&self) -> String {
        self.pairwise_did.to_owned()
    }

    fn get_pw_verkey(&self) -> String {
        self.pairwise_verkey.to_owned()
    }

    fn get_their_pw_did(&self) -> Option<String> {
        self.their_did.clone()
    }

    fn get_their_pw_verkey(&self) -> Option<String> {
        self.their_verkey.clone()
    }

    fn get_service_endpoint(&self) -> Option<String> {
        self.service_endpoint.clone()
    }

    fn get_thread_id(&self) -> Option<String> {
        self.thread_id.clone()
    }

    fn get_invitation(&self) -> Option<Invitation> {
        self.invitation.clone()
    }

    fn get_protocols(&self) -> Vec<ProtocolDescriptor> {
        self.protocols.clone()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl ToJSON for Connection {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for Connection {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for Connection {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::messages::connection::{Response, SignatureDecorator};
    use crate::messages::notification::{Ack, ProblemReport};
    use crate::messages::trust_ping::Ping;

    fn protocols() -> Vec<String> {
        vec![
            "https://didcomm.org/trust_ping/1.0".to_string(),
            "https://didcomm.org/issue-credential/1.0".to_string(),
        ]
    }

    fn invited_inviter() -> Connection {
        Connection::new_inviter(
            "faber".to_string(),
            "faber-did".to_string(),
            "faber-key".to_string(),
        )
        .invite("faber".to_string(), "http://faber".to_string())
        .unwrap()
    }

    fn invitee_of(inviter: &Connection) -> Connection {
        Connection::new_invitee(
            "alice".to_string(),
            "alice-did".to_string(),
            "alice-key".to_string(),
            inviter.get_invitation().unwrap(),
        )
        .unwrap()
    }

    fn accepted() -> Connection {
        let mut conn = invitee_of(&invited_inviter());
        conn.state = State::Accepted;
        conn
    }

    fn dummy_response(thid: String) -> AriesMessage {
        AriesMessage::ConnectionResponse(Response::new(
            SignatureDecorator {
                signature: "".to_string(),
                sig_data: "".to_string(),
                signer: "faber-key".to_string(),
            },
            thid,
        ))
    }

    #[test]
    fn test_invite_sets_thread() {
        let inviter = invited_inviter();
        let invitation = inviter.get_invitation().unwrap();

        assert_eq!(inviter.get_state(), State::Invited);
        assert_eq!(inviter.get_thread_id(), Some(invitation.id.clone()));
        assert_eq!(invitation.recipient_keys, vec!["faber-key".to_string()]);

        let again = inviter.invite("faber".to_string(), "http://faber".to_string());
        assert!(matches!(again, Err(AgentError::InvalidState(_))));
    }

    #[test]
    fn test_invitee_requires_recipient_key() {
        let mut invitation = invited_inviter().get_invitation().unwrap();
        invitation.recipient_keys = vec![];

        let invitee = Connection::new_invitee(
            "alice".to_string(),
            "alice-did".to_string(),
            "alice-key".to_string(),
            invitation,
        );
        assert!(matches!(invitee, Err(AgentError::ValidationError(_))));
    }

    #[test]
    fn test_inviter_receives_request() {
        let inviter = invited_inviter();
        let invitee = invitee_of(&inviter);
        let (requested, request) = invitee
            .request("alice".to_string(), "http://alice".to_string())
            .unwrap();
        assert_eq!(requested.get_state(), State::Requested);

        let transition = inviter
            .transition(Some(&request), &protocols())
            .unwrap();

        assert_eq!(transition.next.get_state(), State::Requested);
        assert_eq!(transition.next.get_their_pw_did(), Some("alice-did".to_string()));
        assert_eq!(transition.next.get_their_pw_verkey(), Some("alice-key".to_string()));
        assert_eq!(transition.action, Some(Action::SendResponse));
    }

    #[test]
    fn test_pending_work() {
        let mut inviter = invited_inviter();
        inviter.state = State::Requested;
        let retry = inviter.transition(None, &protocols()).unwrap();
        assert_eq!(retry.action, Some(Action::SendResponse));

        let mut invitee = invitee_of(&invited_inviter());
        invitee.state = State::Responded;
        let ack = invitee.transition(None, &protocols()).unwrap();
        assert_eq!(ack.action, Some(Action::SendAck));

        let idle = accepted().transition(None, &protocols()).unwrap();
        assert_eq!(idle.action, None);
        assert_eq!(idle.next.get_state(), State::Accepted);
    }

    #[test]
    fn test_inviter_accepts_on_ack() {
        let mut inviter = invited_inviter();
        inviter.state = State::Responded;

        let ack = AriesMessage::Ack(Ack::new(inviter.get_thread_id().unwrap()));
        let transition = inviter.transition(Some(&ack), &protocols()).unwrap();
        assert_eq!(transition.next.get_state(), State::Accepted);
    }

    #[test]
    fn test_inviter_accepts_on_ping() {
        let mut inviter = invited_inviter();
        inviter.state = State::Responded;

        let ping = AriesMessage::Ping(Ping::new(true, None));
        let transition = inviter.transition(Some(&ping), &protocols()).unwrap();
        assert_eq!(transition.next.get_state(), State::Accepted);
        assert!(matches!(
            transition.action,
            Some(Action::Reply(AriesMessage::PingResponse(_)))
        ));
    }

    #[test]
    fn test_invitee_verifies_response() {
        let mut invitee = invitee_of(&invited_inviter());
        invitee.state = State::Requested;

        let response = dummy_response(invitee.get_thread_id().unwrap());
        let transition = invitee.transition(Some(&response), &protocols()).unwrap();
        assert_eq!(transition.next.get_state(), State::Requested);
        assert!(matches!(transition.action, Some(Action::VerifyResponse(_))));
    }

    #[test]
    fn test_protocol_violation_keeps_state() {
        let inviter = invited_inviter();
        let response = dummy_response(inviter.get_thread_id().unwrap());

        let transition = inviter.transition(Some(&response), &protocols());
        assert!(matches!(transition, Err(AgentError::ProtocolViolation(_))));
        assert_eq!(inviter.get_state(), State::Invited);
    }

    #[test]
    fn test_problem_report_terminates() {
        let conn = accepted();
        let report = AriesMessage::ProblemReport(ProblemReport::new(
            conn.get_thread_id().unwrap(),
            "request_not_accepted",
            None,
        ));

        let transition = conn.transition(Some(&report), &protocols()).unwrap();
        assert_eq!(transition.next.get_state(), State::None);

        let after = transition
            .next
            .transition(Some(&AriesMessage::Ping(Ping::new(true, None))), &protocols());
        assert!(matches!(after, Err(AgentError::ProtocolViolation(_))));
    }

    #[test]
    fn test_accepted_self_loops() {
        let conn = accepted();

        let query = AriesMessage::Query(Query::new(
            Some("https://didcomm.org/issue-credential/*".to_string()),
            None,
        ));
        let transition = conn.transition(Some(&query), &protocols()).unwrap();
        assert_eq!(transition.next.get_state(), State::Accepted);

        match transition.action {
            Some(Action::Reply(AriesMessage::Disclose(disclose))) => {
                assert_eq!(disclose.protocols.len(), 1);
                assert_eq!(
                    disclose.protocols[0].pid,
                    "https://didcomm.org/issue-credential/1.0".to_string()
                );
            }
            other => panic!("unexpected action: {:?}", other),
        }

        let disclose = AriesMessage::Disclose(Disclose::new(
            vec![ProtocolDescriptor {
                pid: "https://didcomm.org/present-proof/1.0".to_string(),
                roles: None,
            }],
            "query-id".to_string(),
        ));
        let transition = conn.transition(Some(&disclose), &protocols()).unwrap();
        assert_eq!(transition.next.get_protocols().len(), 1);
        assert_eq!(transition.action, None);

        let silent_ping = AriesMessage::Ping(Ping::new(false, None));
        let transition = conn.transition(Some(&silent_ping), &protocols()).unwrap();
        assert_eq!(transition.action, None);
    }

    #[test]
    fn test_is_relevant_filters_thread_and_sender() {
        let conn = accepted();
        let ours = ReceivedMessage {
            envelope_id: "1".to_string(),
            sender_verkey: Some("faber-key".to_string()),
            message: AriesMessage::Ack(Ack::new(conn.get_thread_id().unwrap())),
        };
        assert!(conn.is_relevant(&ours));

        let other_thread = ReceivedMessage {
            envelope_id: "2".to_string(),
            sender_verkey: Some("faber-key".to_string()),
            message: AriesMessage::Ack(Ack::new("other".to_string())),
        };
        assert!(!conn.is_relevant(&other_thread));

        let stranger = ReceivedMessage {
            envelope_id: "3".to_string(),
            sender_verkey: Some("mallory-key".to_string()),
            message: AriesMessage::Ping(Ping::new(true, None)),
        };
        assert!(!conn.is_relevant(&stranger));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let conn = accepted();
        let json = conn.to_json().unwrap();
        let bytes: Vec<u8> = json.into_bytes();
        let restored = Connection::try_from(bytes).unwrap();
        assert_eq!(restored, conn);
        assert_eq!(restored.get_thread_id(), conn.get_thread_id());
    }

    fn exchange_invitee_of(inviter: &Connection) -> Connection {
        invitee_of(inviter).with_handshake(HandshakeProtocol::DidExchangeV1)
    }

    #[test]
    fn test_did_exchange_request_opens_thread() {
        let inviter = invited_inviter();
        let invitation_id = inviter.get_thread_id().unwrap();
        let invitee = exchange_invitee_of(&inviter);

        let (requested, request) = invitee
            .request("alice".to_string(), "http://alice".to_string())
            .unwrap();
        let request_id = match &request {
            AriesMessage::DidExchangeRequest(request) => {
                assert_eq!(request.invitation_id(), Some(invitation_id.as_str()));
                request.id.clone()
            }
            other => panic!("unexpected request: {:?}", other),
        };
        assert_eq!(requested.get_state(), State::Requested);
        assert_eq!(requested.get_thread_id(), Some(request_id.clone()));

        let transition = inviter.transition(Some(&request), &protocols()).unwrap();
        assert_eq!(transition.next.get_state(), State::Requested);
        assert_eq!(transition.next.get_handshake(), HandshakeProtocol::DidExchangeV1);
        assert_eq!(transition.next.get_thread_id(), Some(request_id));
        assert_eq!(transition.next.get_their_pw_did(), Some("alice-did".to_string()));
        assert_eq!(transition.next.get_their_pw_verkey(), Some("alice-key".to_string()));
        assert_eq!(transition.action, Some(Action::SendResponse));
    }

    #[test]
    fn test_did_exchange_request_for_other_invitation() {
        let inviter = invited_inviter();
        let stranger = exchange_invitee_of(&invited_inviter());
        let (_, request) = stranger
            .request("alice".to_string(), "http://alice".to_string())
            .unwrap();

        let received = ReceivedMessage {
            envelope_id: "1".to_string(),
            sender_verkey: Some("alice-key".to_string()),
            message: request.clone(),
        };
        assert!(!inviter.is_relevant(&received));

        let outcome = inviter.transition(Some(&request), &protocols());
        assert!(matches!(outcome, Err(AgentError::ProtocolViolation(_))));
        assert_eq!(inviter.get_state(), State::Invited);
    }

    #[test]
    fn test_did_exchange_completes() {
        let inviter = invited_inviter();
        let (requested, request) = exchange_invitee_of(&inviter)
            .request("alice".to_string(), "http://alice".to_string())
            .unwrap();

        let mut responded = inviter
            .transition(Some(&request), &protocols())
            .unwrap()
            .next;
        responded.state = State::Responded;

        let thread_id = requested.get_thread_id().unwrap();
        let invitation_id = inviter.get_thread_id().unwrap();

        let ack = AriesMessage::Ack(Ack::new(thread_id.clone()));
        let outcome = responded.transition(Some(&ack), &protocols());
        assert!(matches!(outcome, Err(AgentError::ProtocolViolation(_))));

        let complete = AriesMessage::DidExchangeComplete(did_exchange::Complete::new(
            thread_id.clone(),
            invitation_id.clone(),
        ));
        let transition = responded.transition(Some(&complete), &protocols()).unwrap();
        assert_eq!(transition.next.get_state(), State::Accepted);

        let attach = did_doc_attachment(
            &ConnectionData::new(
                "faber-did".to_string(),
                "faber-key".to_string(),
                "http://faber".to_string(),
            )
            .did_doc,
        )
        .unwrap();
        let response = AriesMessage::DidExchangeResponse(did_exchange::Response::new(
            "faber-did".to_string(),
            attach,
            thread_id,
            invitation_id,
        ));
        let transition = requested.transition(Some(&response), &protocols()).unwrap();
        assert_eq!(transition.next.get_state(), State::Requested);
        assert!(matches!(
            transition.action,
            Some(Action::VerifyExchangeResponse(_))
        ));

        let legacy = dummy_response(requested.get_thread_id().unwrap());
        let outcome = requested.transition(Some(&legacy), &protocols());
        assert!(matches!(outcome, Err(AgentError::ProtocolViolation(_))));
    }

    #[test]
    fn test_foreign_thread_keeps_state() {
        let conn = accepted();
        let report = AriesMessage::ProblemReport(ProblemReport::new(
            "some-other-exchange".to_string(),
            "request_not_accepted",
            None,
        ));
        let outcome = conn.transition(Some(&report), &protocols());
        assert!(matches!(outcome, Err(AgentError::ProtocolViolation(_))));
        assert_eq!(conn.get_state(), State::Accepted);

        let mut inviter = invited_inviter();
        inviter.state = State::Responded;
        let ack = AriesMessage::Ack(Ack::new("some-other-exchange".to_string()));
        let outcome = inviter.transition(Some(&ack), &protocols());
        assert!(matches!(outcome, Err(AgentError::ProtocolViolation(_))));
        assert_eq!(inviter.get_state(), State::Responded);

        let ping = AriesMessage::Ping(Ping::new(true, None));
        let transition = conn.transition(Some(&ping), &protocols()).unwrap();
        assert_eq!(transition.next.get_state(), State::Accepted);
    }
}
