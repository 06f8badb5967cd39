pub mod keys;
pub mod ledger;

pub use ledger::WalletLedger;
