//! `issuance` implements the issue-credential 1.0 exchange
//!
//! The issuer side walks `offer -> request -> credential -> ack`, the holder side
//! mirrors it. Both sides correlate every message through the offer's id, which is
//! the exchange thread.
pub mod holder;
pub mod issuer;
pub mod payload;
