//! The side-ledger state machine and its `sled`-backed persistence engine
//! (spec.md §4, §6). `conclave-chain` supplies the data model; this crate
//! owns the store layout, the Bitcoin-adapter contract, the validation
//! pipeline, and the daemon's on-disk configuration.

pub mod config;
pub mod error;
pub mod ledger;
pub mod oracle;
pub mod store;

pub use config::Config;
pub use error::LedgerError;
pub use ledger::Ledger;
pub use oracle::ChainOracle;
pub use store::Store;
