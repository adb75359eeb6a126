//! `revocation` manages revocation registries and their tails files
//!
//! The issuer creates a registry sized for `max_creds`, writes its tails file under a
//! local directory and publishes the definition with the location the file is served
//! from. Holders fetch the file from that location and check it against the published
//! hash before using it. Revocations are applied locally first and reach the ledger
//! as a delta on the next publish.
pub mod tails;
pub mod types;

mod cache;
pub use cache::TailsCache;

mod registry;
pub use registry::RevocationRegistry;

mod usecase;
pub use usecase::Usecase;
