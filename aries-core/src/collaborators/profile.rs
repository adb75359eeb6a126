use std::fmt::{self, Debug};

use super::types::{
    LedgerBuilder, ProfileBuilder, TailsFetcherBuilder, TransportBuilder, WalletBuilder,
};

/// Profile is the default [`ProfileBuilder`], one value per collaborator
#[derive(Clone)]
pub struct Profile<TWallet, TLedger, TTransport, TTails>
where
    TWallet: WalletBuilder,
    TLedger: LedgerBuilder,
    TTransport: TransportBuilder,
    TTails: TailsFetcherBuilder,
{
    wallet: TWallet,
    ledger: TLedger,
    transport: TTransport,
    tails: TTails,
}

impl<TWallet, TLedger, TTransport, TTails> Profile<TWallet, TLedger, TTransport, TTails>
where
    TWallet: WalletBuilder,
    TLedger: LedgerBuilder,
    TTransport: TransportBuilder,
    TTails: TailsFetcherBuilder,
{
    pub fn new(wallet: TWallet, ledger: TLedger, transport: TTransport, tails: TTails) -> Self {
        Self {
            wallet,
            ledger,
            transport,
            tails,
        }
    }
}

impl<TWallet, TLedger, TTransport, TTails> Debug for Profile<TWallet, TLedger, TTransport, TTails>
where
    TWallet: WalletBuilder,
    TLedger: LedgerBuilder,
    TTransport: TransportBuilder,
    TTails: TailsFetcherBuilder,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile").finish_non_exhaustive()
    }
}

impl<TWallet, TLedger, TTransport, TTails> ProfileBuilder
    for Profile<TWallet, TLedger, TTransport, TTails>
where
    TWallet: WalletBuilder + 'static,
    TLedger: LedgerBuilder + 'static,
    TTransport: TransportBuilder + 'static,
    TTails: TailsFetcherBuilder + 'static,
{
    type WalletImplementer = TWallet;
    type LedgerImplementer = TLedger;
    type TransportImplementer = TTransport;
    type TailsImplementer = TTails;

    fn wallet(&self) -> Self::WalletImplementer {
        self.wallet.clone()
    }

    fn ledger(&self) -> Self::LedgerImplementer {
        self.ledger.clone()
    }

    fn transport(&self) -> Self::TransportImplementer {
        self.transport.clone()
    }

    fn tails(&self) -> Self::TailsImplementer {
        self.tails.clone()
    }
}
