//! Byte primitives, cryptography, addresses, scripts and the transaction
//! data model underlying the side-ledger (spec.md §2 items 1–5).
//!
//! This crate has no notion of persistence or validation; those live in
//! `conclave-state`, which depends on it for every type that crosses the
//! store boundary.

pub mod address;
pub mod block;
pub mod crypto;
pub mod hash;
pub mod parameters;
pub mod script;
pub mod serialization;
pub mod transaction;

pub use address::{Address, AddressFormat, AddressHash, Payee};
pub use block::ConclaveBlockHeader;
pub use crypto::{hash160, hash256, sha256, EcdsaSig, PrivKey, PubKey};
pub use hash::{Hash20, Hash32};
pub use parameters::Network;
pub use script::Script;
pub use serialization::{ConclaveDeserialize, ConclaveDeserializeInto, ConclaveSerialize, SerializationError, VarInt};
pub use transaction::{
    BitcoinInput, BitcoinOutput, BitcoinTx, ConclaveInput, ConclaveOutput, ConclaveTx, Inpoint, Outpoint,
};
