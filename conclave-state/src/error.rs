//! The error taxonomy a submitted transaction either commits clean or fails
//! exactly one of (spec.md §7).

use thiserror::Error;

/// Every way `Ledger::submit` can fail, plus the passthrough variants for
/// conditions spec.md says "propagate outward unchanged" (storage I/O,
/// malformed bytes, adapter failures).
#[derive(Error, Debug)]
pub enum LedgerError {
    /// fund outpoint already claimed
    #[error("fund outpoint already claimed")]
    DoubleClaim,

    /// outpoint already spent
    #[error("outpoint already spent")]
    DoubleSpend,

    /// transaction already committed under this id
    #[error("transaction already committed under this id")]
    AlreadyCommitted,

    /// referenced Bitcoin fund transaction is unknown to the chain oracle
    #[error("referenced Bitcoin fund transaction is unknown to the chain oracle")]
    UnknownFundTx,

    /// referenced previous Conclave transaction is not in the object store
    #[error("referenced previous Conclave transaction is not in the object store")]
    UnknownPrevTx,

    /// referenced output/input index is out of range
    #[error("referenced output/input index is out of range")]
    IndexOutOfRange,

    /// claim outputs exceed the value of the referenced Bitcoin fund output
    #[error("claim outputs exceed the value of the referenced Bitcoin fund output")]
    OverClaim,

    /// spend outputs (plus withdrawals) exceed the value of the inputs
    #[error("spend outputs (plus withdrawals) exceed the value of the inputs")]
    OverSpend,

    /// claim script does not match the Bitcoin-side P2WSH commitment
    #[error("claim script does not match the Bitcoin-side P2WSH commitment")]
    ScriptMismatch,

    /// a wallet tip already points at the very output/input being added
    #[error("a wallet tip already points at the very output/input being added")]
    SelfReference,

    /// a wallet's predecessor chain exceeded the configured maximum depth
    #[error("a wallet's predecessor chain exceeded the configured maximum depth")]
    ChainTooDeep,

    /// a value read from the immutable store no longer hashes to its key
    #[error("a value read from the immutable store no longer hashes to its key")]
    StorageCorruption,

    /// a scriptSig did not satisfy its referenced scriptPubKey
    #[error("a scriptSig did not satisfy its referenced scriptPubKey")]
    SignatureInvalid,

    /// underlying store error: {0}
    #[error("underlying store error: {0}")]
    Store(#[from] sled::Error),

    /// canonical (de)serialization error: {0}
    #[error("canonical (de)serialization error: {0}")]
    Serialization(#[from] conclave_chain::SerializationError),

    /// Bitcoin-chain adapter error: {0}
    #[error("bitcoin-chain adapter error: {0}")]
    Adapter(String),
}

impl From<sled::transaction::TransactionError<LedgerError>> for LedgerError {
    fn from(err: sled::transaction::TransactionError<LedgerError>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(e) => e,
            sled::transaction::TransactionError::Storage(e) => LedgerError::Store(e),
        }
    }
}
