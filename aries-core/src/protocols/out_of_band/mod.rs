//! `out_of_band` carries invitations and protocol requests as one portable message
//!
//! The sender assembles an invitation append-only and finalizes it with
//! `to_message`. The receiver either reuses an existing connection, builds a new one
//! through the advertised handshake, or hands the attached request straight to the
//! matching exchange.
pub mod receiver;
pub mod sender;

/// attachment ids of embedded requests are `request-<n>` in append order
pub(crate) fn attachment_id(position: usize) -> String {
    format!("request-{}", position)
}
