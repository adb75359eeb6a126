//! `presentation` implements the present-proof 1.0 exchange
//!
//! The verifier opens the thread with its request. The prover answers with a proof, or
//! declines with a reason or a counter proposal. Proof invalidity is reported through
//! the verifier's `proof_state`, never as an error.
pub mod prover;
pub mod verification;
pub mod verifier;

pub const REQUEST_ATTACHMENT_ID: &str = "libindy-request-presentation-0";
pub const PRESENTATION_ATTACHMENT_ID: &str = "libindy-presentation-0";
