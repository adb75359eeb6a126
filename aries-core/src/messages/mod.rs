//! `messages` holds the DIDComm message model exchanged between agents
//!
//! Every message is a JSON object tagged by its `@type` URI and correlated to its
//! exchange through the `~thread` decorator. [`AriesMessage`] is the closed set of
//! messages this crate understands, unknown types fail to decode.
mod attachment;
pub use attachment::{Attachment, AttachmentData, AttachmentSignature, JwsHeader};

mod thread;
pub use thread::Thread;

mod aries;
pub use aries::{AriesMessage, Family};

pub mod connection;
pub mod did_exchange;
pub mod discovery;
pub mod issuance;
pub mod notification;
pub mod out_of_band;
pub mod presentation;
pub mod trust_ping;

pub const PROTOCOL_CONNECTIONS: &str = "https://didcomm.org/connections/1.0";
pub const PROTOCOL_DIDEXCHANGE: &str = "https://didcomm.org/didexchange/1.0";
pub const PROTOCOL_TRUST_PING: &str = "https://didcomm.org/trust_ping/1.0";
pub const PROTOCOL_DISCOVER_FEATURES: &str = "https://didcomm.org/discover-features/1.0";
pub const PROTOCOL_NOTIFICATION: &str = "https://didcomm.org/notification/1.0";
pub const PROTOCOL_REPORT_PROBLEM: &str = "https://didcomm.org/report-problem/1.0";
pub const PROTOCOL_ISSUE_CREDENTIAL: &str = "https://didcomm.org/issue-credential/1.0";
pub const PROTOCOL_PRESENT_PROOF: &str = "https://didcomm.org/present-proof/1.0";
pub const PROTOCOL_OUT_OF_BAND: &str = "https://didcomm.org/out-of-band/1.1";

pub const PROTOCOLS_SUPPORTED: &[&str] = &[
    PROTOCOL_CONNECTIONS,
    PROTOCOL_DIDEXCHANGE,
    PROTOCOL_TRUST_PING,
    PROTOCOL_DISCOVER_FEATURES,
    PROTOCOL_NOTIFICATION,
    PROTOCOL_REPORT_PROBLEM,
    PROTOCOL_ISSUE_CREDENTIAL,
    PROTOCOL_PRESENT_PROOF,
    PROTOCOL_OUT_OF_BAND,
];
