use derive_more::Display;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::errors::AgentError;

use super::connection::{Invitation, Request, Response};
use super::did_exchange::{
    Complete as DidExchangeComplete, Request as DidExchangeRequest,
    Response as DidExchangeResponse,
};
use super::discovery::{Disclose, Query};
use super::issuance::{CredentialOffer, CredentialRequest, IssueCredential};
use super::notification::{Ack, ProblemReport};
use super::out_of_band::{
    HandshakeReuse, HandshakeReuseAccepted, Invitation as OutOfBandInvitation,
};
use super::presentation::{Presentation, PresentationProposal, PresentationRequest};
use super::trust_ping::{Ping, PingResponse};
use super::Thread;

/// Family groups message types by the protocol that owns them
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Connection,
    DidExchange,
    TrustPing,
    DiscoverFeatures,
    Notification,
    ReportProblem,
    IssueCredential,
    PresentProof,
    OutOfBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", tag = "@type")]
pub enum AriesMessage {
    #[serde(rename = "https://didcomm.org/connections/1.0/invitation")]
    ConnectionInvitation(Invitation),

    #[serde(rename = "https://didcomm.org/connections/1.0/request")]
    ConnectionRequest(Request),

    #[serde(rename = "https://didcomm.org/connections/1.0/response")]
    ConnectionResponse(Response),

    #[serde(rename = "https://didcomm.org/didexchange/1.0/request")]
    DidExchangeRequest(DidExchangeRequest),

    #[serde(rename = "https://didcomm.org/didexchange/1.0/response")]
    DidExchangeResponse(DidExchangeResponse),

    #[serde(rename = "https://didcomm.org/didexchange/1.0/complete")]
    DidExchangeComplete(DidExchangeComplete),

    #[serde(rename = "https://didcomm.org/notification/1.0/ack")]
    Ack(Ack),

    #[serde(rename = "https://didcomm.org/report-problem/1.0/problem-report")]
    ProblemReport(ProblemReport),

    #[serde(rename = "https://didcomm.org/trust_ping/1.0/ping")]
    Ping(Ping),

    #[serde(rename = "https://didcomm.org/trust_ping/1.0/ping_response")]
    PingResponse(PingResponse),

    #[serde(rename = "https://didcomm.org/discover-features/1.0/query")]
    Query(Query),

    #[serde(rename = "https://didcomm.org/discover-features/1.0/disclose")]
    Disclose(Disclose),

    #[serde(rename = "https://didcomm.org/issue-credential/1.0/offer-credential")]
    CredentialOffer(CredentialOffer),

    #[serde(rename = "https://didcomm.org/issue-credential/1.0/request-credential")]
    CredentialRequest(CredentialRequest),

    #[serde(rename = "https://didcomm.org/issue-credential/1.0/issue-credential")]
    IssueCredential(IssueCredential),

    #[serde(rename = "https://didcomm.org/issue-credential/1.0/ack")]
    CredentialAck(Ack),

    #[serde(rename = "https://didcomm.org/present-proof/1.0/request-presentation")]
    PresentationRequest(PresentationRequest),

    #[serde(rename = "https://didcomm.org/present-proof/1.0/presentation")]
    Presentation(Presentation),

    #[serde(rename = "https://didcomm.org/present-proof/1.0/propose-presentation")]
    PresentationProposal(PresentationProposal),

    #[serde(rename = "https://didcomm.org/present-proof/1.0/ack")]
    PresentationAck(Ack),

    #[serde(rename = "https://didcomm.org/out-of-band/1.1/invitation")]
    OutOfBandInvitation(OutOfBandInvitation),

    #[serde(rename = "https://didcomm.org/out-of-band/1.1/handshake-reuse")]
    HandshakeReuse(HandshakeReuse),

    #[serde(rename = "https://didcomm.org/out-of-band/1.1/handshake-reuse-accepted")]
    HandshakeReuseAccepted(HandshakeReuseAccepted),
}

impl AriesMessage {
    pub fn id(&self) -> String {
        match self {
            AriesMessage::ConnectionInvitation(msg) => msg.id.to_owned(),
            AriesMessage::ConnectionRequest(msg) => msg.id.to_owned(),
            AriesMessage::ConnectionResponse(msg) => msg.id.to_owned(),
            AriesMessage::DidExchangeRequest(msg) => msg.id.to_owned(),
            AriesMessage::DidExchangeResponse(msg) => msg.id.to_owned(),
            AriesMessage::DidExchangeComplete(msg) => msg.id.to_owned(),
            AriesMessage::Ack(msg) => msg.id.to_owned(),
            AriesMessage::ProblemReport(msg) => msg.id.to_owned(),
            AriesMessage::Ping(msg) => msg.id.to_owned(),
            AriesMessage::PingResponse(msg) => msg.id.to_owned(),
            AriesMessage::Query(msg) => msg.id.to_owned(),
            AriesMessage::Disclose(msg) => msg.id.to_owned(),
            AriesMessage::CredentialOffer(msg) => msg.id.to_owned(),
            AriesMessage::CredentialRequest(msg) => msg.id.to_owned(),
            AriesMessage::IssueCredential(msg) => msg.id.to_owned(),
            AriesMessage::CredentialAck(msg) => msg.id.to_owned(),
            AriesMessage::PresentationRequest(msg) => msg.id.to_owned(),
            AriesMessage::Presentation(msg) => msg.id.to_owned(),
            AriesMessage::PresentationProposal(msg) => msg.id.to_owned(),
            AriesMessage::PresentationAck(msg) => msg.id.to_owned(),
            AriesMessage::OutOfBandInvitation(msg) => msg.id.to_owned(),
            AriesMessage::HandshakeReuse(msg) => msg.id.to_owned(),
            AriesMessage::HandshakeReuseAccepted(msg) => msg.id.to_owned(),
        }
    }

    pub fn thread(&self) -> Option<&Thread> {
        match self {
            AriesMessage::ConnectionRequest(msg) => Some(&msg.thread),
            AriesMessage::ConnectionResponse(msg) => Some(&msg.thread),
            AriesMessage::DidExchangeRequest(msg) => Some(&msg.thread),
            AriesMessage::DidExchangeResponse(msg) => Some(&msg.thread),
            AriesMessage::DidExchangeComplete(msg) => Some(&msg.thread),
            AriesMessage::Ack(msg) => Some(&msg.thread),
            AriesMessage::ProblemReport(msg) => Some(&msg.thread),
            AriesMessage::PingResponse(msg) => Some(&msg.thread),
            AriesMessage::Disclose(msg) => Some(&msg.thread),
            AriesMessage::CredentialRequest(msg) => Some(&msg.thread),
            AriesMessage::IssueCredential(msg) => Some(&msg.thread),
            AriesMessage::CredentialAck(msg) => Some(&msg.thread),
            AriesMessage::Presentation(msg) => Some(&msg.thread),
            AriesMessage::PresentationProposal(msg) => Some(&msg.thread),
            AriesMessage::PresentationAck(msg) => Some(&msg.thread),
            AriesMessage::HandshakeReuse(msg) => Some(&msg.thread),
            AriesMessage::HandshakeReuseAccepted(msg) => Some(&msg.thread),
            _ => None,
        }
    }

    /// thread_id is the `~thread.thid` when present, a message without it opens
    /// a new thread named after its own id
    pub fn thread_id(&self) -> String {
        self.thread()
            .and_then(|thread| thread.thid.clone())
            .unwrap_or_else(|| self.id())
    }

    pub fn family(&self) -> Family {
        match self {
            AriesMessage::ConnectionInvitation(_)
            | AriesMessage::ConnectionRequest(_)
            | AriesMessage::ConnectionResponse(_) => Family::Connection,
            AriesMessage::DidExchangeRequest(_)
            | AriesMessage::DidExchangeResponse(_)
            | AriesMessage::DidExchangeComplete(_) => Family::DidExchange,
            AriesMessage::Ack(_) => Family::Notification,
            AriesMessage::ProblemReport(_) => Family::ReportProblem,
            AriesMessage::Ping(_) | AriesMessage::PingResponse(_) => Family::TrustPing,
            AriesMessage::Query(_) | AriesMessage::Disclose(_) => Family::DiscoverFeatures,
            AriesMessage::CredentialOffer(_)
            | AriesMessage::CredentialRequest(_)
            | AriesMessage::IssueCredential(_)
            | AriesMessage::CredentialAck(_) => Family::IssueCredential,
            AriesMessage::PresentationRequest(_)
            | AriesMessage::Presentation(_)
            | AriesMessage::PresentationProposal(_)
            | AriesMessage::PresentationAck(_) => Family::PresentProof,
            AriesMessage::OutOfBandInvitation(_)
            | AriesMessage::HandshakeReuse(_)
            | AriesMessage::HandshakeReuseAccepted(_) => Family::OutOfBand,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AriesMessage::ConnectionInvitation(_) => "connection-invitation",
            AriesMessage::ConnectionRequest(_) => "connection-request",
            AriesMessage::ConnectionResponse(_) => "connection-response",
            AriesMessage::DidExchangeRequest(_) => "did-exchange-request",
            AriesMessage::DidExchangeResponse(_) => "did-exchange-response",
            AriesMessage::DidExchangeComplete(_) => "did-exchange-complete",
            AriesMessage::Ack(_) => "ack",
            AriesMessage::ProblemReport(_) => "problem-report",
            AriesMessage::Ping(_) => "ping",
            AriesMessage::PingResponse(_) => "ping-response",
            AriesMessage::Query(_) => "query",
            AriesMessage::Disclose(_) => "disclose",
            AriesMessage::CredentialOffer(_) => "credential-offer",
            AriesMessage::CredentialRequest(_) => "credential-request",
            AriesMessage::IssueCredential(_) => "issue-credential",
            AriesMessage::CredentialAck(_) => "credential-ack",
            AriesMessage::PresentationRequest(_) => "presentation-request",
            AriesMessage::Presentation(_) => "presentation",
            AriesMessage::PresentationProposal(_) => "presentation-proposal",
            AriesMessage::PresentationAck(_) => "presentation-ack",
            AriesMessage::OutOfBandInvitation(_) => "out-of-band-invitation",
            AriesMessage::HandshakeReuse(_) => "handshake-reuse",
            AriesMessage::HandshakeReuseAccepted(_) => "handshake-reuse-accepted",
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, AgentError> {
        serde_json::from_str(raw).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl ToJSON for AriesMessage {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for AriesMessage {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for AriesMessage {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}
