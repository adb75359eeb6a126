//! `protocols` holds the DIDComm state machines
//!
//! Every protocol follows the same shape. `types.rs` declares the states and the API
//! trait, the entity files own the pure transition tables, and `usecase.rs` drives them
//! against the collaborators while the objects live in a handle cache.
pub mod connection;
pub mod issuance;
pub mod mailbox;
pub mod out_of_band;
pub mod presentation;
