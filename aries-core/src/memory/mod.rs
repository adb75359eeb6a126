//! `memory` provides in-process collaborators
//!
//! They back the tests and any embedding that does not need durable storage. Ledger
//! and transport are meant to be shared between agents by cloning, each agent keeps
//! its own wallet.
mod wallet;
pub use wallet::InMemoryWallet;

mod ledger;
pub use ledger::InMemoryLedger;

mod transport;
pub use transport::InMemoryTransport;

mod tails;
pub use tails::{FileTailsFetcher, StaticTailsFetcher};

use crate::collaborators::Profile;

pub type InMemoryProfile =
    Profile<InMemoryWallet, InMemoryLedger, InMemoryTransport, FileTailsFetcher>;
