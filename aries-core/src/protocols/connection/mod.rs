//! `connection` establishes a pairwise channel between two agents
//!
//! The inviter publishes an [`Invitation`](crate::messages::connection::Invitation),
//! the invitee answers with a request, the inviter signs a response and the invitee
//! acknowledges it. Once accepted the connection answers trust pings, feature
//! discovery queries and out-of-band handshake reuse.
pub mod types;

mod connection;
pub use connection::Connection;

mod usecase;
pub use usecase::Usecase;
