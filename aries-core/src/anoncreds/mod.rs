//! `anoncreds` holds the ledger anchored objects credentials are issued against
//!
//! A schema names the attributes, a credential definition binds a schema to the
//! issuer's signing key, and a revocation registry tracks which issued credentials
//! are still valid. The signatures and accumulator here are a hash based model of the
//! CL primitives, the exchange protocols only depend on their interfaces.
pub mod credential;
pub mod credential_definition;
pub mod proof;
pub mod revocation;
pub mod schema;
