//! The Bitcoin-chain adapter contract (spec.md §6.2): the state machine's
//! only window onto the base chain. The adapter is an external oracle —
//! "the core does not assume atomicity between adapter queries and its own
//! writes" — so this is a plain synchronous trait, not a `tower::Service`;
//! there is no request pipelining to model inside this crate's scope.

use conclave_chain::{Address, BitcoinTx, Hash32};

use crate::error::LedgerError;

/// The four operations `apply_claim`/withdrawal handling call on the
/// base-chain collaborator (spec.md §6.2).
pub trait ChainOracle: Send + Sync {
    fn get_tx(&self, tx_id: Hash32) -> Result<Option<BitcoinTx>, LedgerError>;
    fn get_address_balance(&self, addr: &Address) -> Result<u64, LedgerError>;
    fn submit_tx(&self, tx: &BitcoinTx) -> Result<Hash32, LedgerError>;
    fn latest_block_hash(&self) -> Result<Hash32, LedgerError>;
}

/// An in-memory oracle over a fixed set of Bitcoin transactions, for tests
/// that exercise `apply_claim` without a real Bitcoin node — grounded in the
/// teacher's pattern of dedicated test-fixture crates (`zebra-test`), here
/// folded directly into `conclave-state`'s own `#[cfg(test)]` modules since
/// there is no remaining counterpart crate.
#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct StubOracle {
        txs: Mutex<HashMap<Hash32, BitcoinTx>>,
    }

    impl StubOracle {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers `tx` under its own `tx_id` so `get_tx` can find it.
        pub fn insert(&self, tx: BitcoinTx) -> Hash32 {
            let tx_id = tx.tx_id();
            self.txs.lock().unwrap().insert(tx_id, tx);
            tx_id
        }
    }

    impl ChainOracle for StubOracle {
        fn get_tx(&self, tx_id: Hash32) -> Result<Option<BitcoinTx>, LedgerError> {
            Ok(self.txs.lock().unwrap().get(&tx_id).cloned())
        }

        fn get_address_balance(&self, _addr: &Address) -> Result<u64, LedgerError> {
            Ok(0)
        }

        fn submit_tx(&self, tx: &BitcoinTx) -> Result<Hash32, LedgerError> {
            let tx_id = tx.tx_id();
            self.txs.lock().unwrap().insert(tx_id, tx.clone());
            Ok(tx_id)
        }

        fn latest_block_hash(&self) -> Result<Hash32, LedgerError> {
            Ok(Hash32::from_bytes([0u8; 32]))
        }
    }
}
