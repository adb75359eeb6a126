//! `collaborators` are the external systems the protocol engine consumes
//!
//! The engine never owns key material, ledger state or a network stack. It reaches
//! them through the traits below, grouped into a single [`ProfileBuilder`] so a usecase
//! needs only one generic parameter.
pub mod types;

mod profile;
pub use profile::Profile;

pub use types::{
    CredentialRecord, Envelope, LedgerBuilder, LedgerDelta, ProfileBuilder, RecordKind,
    TailsFetcherBuilder, TransportBuilder, TxnReceipt, UnpackedMessage, WalletBuilder,
};
