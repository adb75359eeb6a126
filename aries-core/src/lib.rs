//! `prople-aries-core` is the protocol engine of an identity agent
//!
//! It drives the DIDComm exchanges an agent takes part in:
//!
//! - `connection`, the pairwise channel every other exchange runs over
//! - `issuance`, offering, requesting and issuing credentials
//! - `presentation`, requesting, proving and verifying
//! - `out_of_band`, portable invitations carrying a request
//!
//! ---
//!
//! Every stateful object lives in a handle cache and is addressed by an opaque
//! [`handle::Handle`]. The ledger anchored objects credentials depend on, schemas,
//! credential definitions and revocation registries, live under [`anoncreds`].
//!
//! The engine owns no key material, ledger or network stack. Those come in through
//! the [`collaborators`] traits bundled into a single profile, [`memory`] provides
//! in-process implementations. [`agent::Agent`] wires everything to one profile.
pub mod agent;
pub mod anoncreds;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod handle;
pub mod memory;
pub mod messages;
pub mod protocols;

#[cfg(test)]
mod scenarios;

#[cfg(test)]
mod testing;
