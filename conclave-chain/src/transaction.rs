//! The side-ledger and Bitcoin transaction data model (spec.md §3.2–§3.3,
//! §4.6).
//!
//! Grounded in the teacher's `transaction.rs`/`transparent.rs` pair
//! (`Transaction`, `OutPoint`, `transparent::{Input, Output}`), rebuilt
//! around two distinct shapes — claim and spend — instead of one generic
//! Bitcoin transaction.

use conclave_serde_derive::{ConclaveDeserialize as DeriveConclaveDeserialize, ConclaveSerialize as DeriveConclaveSerialize};

use crate::crypto::{hash256, EcdsaSig, PubKey};
use crate::hash::Hash32;
use crate::script::Script;
use crate::serialization::{ConclaveDeserialize, ConclaveSerialize, SerializationError, VarInt};

/// A reference to a specific output `(txId, index)` of a committed
/// transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, DeriveConclaveSerialize, DeriveConclaveDeserialize)]
pub struct Outpoint {
    pub tx_id: Hash32,
    pub index: u32,
}

/// A reference to a specific input `(txId, index)` of a committed
/// transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, DeriveConclaveSerialize, DeriveConclaveDeserialize)]
pub struct Inpoint {
    pub tx_id: Hash32,
    pub index: u32,
}

/// A side-ledger output: pays `value` base units to `script_pub_key`,
/// optionally back-linked to the wallet's previous funding output.
#[derive(Clone, Debug, PartialEq, Eq, DeriveConclaveSerialize, DeriveConclaveDeserialize)]
pub struct ConclaveOutput {
    pub script_pub_key: Script,
    pub value: u64,
    pub predecessor: Option<Outpoint>,
}

/// A side-ledger input: spends `outpoint`, authorized by `script_sig`,
/// optionally back-linked to the wallet's previous spend.
#[derive(Clone, Debug, PartialEq, Eq, DeriveConclaveSerialize, DeriveConclaveDeserialize)]
pub struct ConclaveInput {
    pub outpoint: Outpoint,
    pub script_sig: Script,
    pub sequence: u32,
    pub predecessor: Option<Inpoint>,
}

/// A withdrawal request embedded in a spend tx: a plain Bitcoin output.
#[derive(Clone, Debug, PartialEq, Eq, DeriveConclaveSerialize, DeriveConclaveDeserialize)]
pub struct BitcoinOutput {
    pub value: u64,
    pub script_pub_key: Script,
}

/// An input of a Bitcoin transaction, as returned by the chain oracle
/// (spec.md §6.2). The core never constructs one; it only reads fields off
/// transactions handed back by `ChainOracle::get_tx`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveConclaveSerialize, DeriveConclaveDeserialize)]
pub struct BitcoinInput {
    pub outpoint: Outpoint,
    pub script_sig: Script,
    pub sequence: u32,
}

/// A Bitcoin transaction, as returned by the chain oracle. Identity is
/// `hash256(serialize(tx))`, matching Bitcoin's own txid convention.
#[derive(Clone, Debug, PartialEq, Eq, DeriveConclaveSerialize, DeriveConclaveDeserialize)]
pub struct BitcoinTx {
    pub version: u32,
    pub inputs: Vec<BitcoinInput>,
    pub outputs: Vec<BitcoinOutput>,
    pub lock_time: u32,
}

impl BitcoinTx {
    pub fn tx_id(&self) -> Hash32 {
        hash256(&self.conclave_serialize_to_vec().expect("in-memory write cannot fail"))
    }
}

/// A side-ledger transaction (spec.md §3.3). Exactly one of `fund_point`
/// (claim tx) or a non-empty `conclave_inputs` (spend tx) is populated;
/// construction is only ever through [`ConclaveTx::claim`] or
/// [`ConclaveTx::spend`], which enforce the shape.
///
/// Field order here **is** wire order (spec.md §4.6): `version`,
/// `lock_time`, `min_sigs`, `Option<fund_point>`, `Vec<trustees>`,
/// `Vec<conclave_inputs>`, `Vec<bitcoin_outputs>`, `Vec<conclave_outputs>`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveConclaveSerialize, DeriveConclaveDeserialize)]
pub struct ConclaveTx {
    pub version: u32,
    pub lock_time: u32,
    pub min_sigs: u8,
    pub fund_point: Option<Outpoint>,
    pub trustees: Vec<PubKey>,
    pub conclave_inputs: Vec<ConclaveInput>,
    pub bitcoin_outputs: Vec<BitcoinOutput>,
    pub conclave_outputs: Vec<ConclaveOutput>,
}

impl ConclaveTx {
    /// Builds a claim tx. Panics if `min_sigs` is out of `[1, trustees.len()]`
    /// or `conclave_outputs` is empty — these are the tx-shape invariants of
    /// spec.md §3.3, enforced at construction rather than left to the
    /// validator, since a malformed claim tx can never be produced by this
    /// constructor in the first place.
    pub fn claim(
        version: u32,
        lock_time: u32,
        fund_point: Outpoint,
        min_sigs: u8,
        trustees: Vec<PubKey>,
        conclave_outputs: Vec<ConclaveOutput>,
    ) -> Self {
        assert!(!trustees.is_empty(), "a claim tx must name at least one trustee");
        assert!(
            (1..=trustees.len() as u8).contains(&min_sigs),
            "min_sigs must be in [1, trustees.len()]"
        );
        assert!(!conclave_outputs.is_empty(), "a claim tx must produce at least one output");
        ConclaveTx {
            version,
            lock_time,
            min_sigs,
            fund_point: Some(fund_point),
            trustees,
            conclave_inputs: Vec::new(),
            bitcoin_outputs: Vec::new(),
            conclave_outputs,
        }
    }

    /// Builds a spend tx. Panics if `conclave_inputs` is empty, the
    /// shape-defining requirement of spec.md §3.3.
    pub fn spend(
        version: u32,
        lock_time: u32,
        conclave_inputs: Vec<ConclaveInput>,
        bitcoin_outputs: Vec<BitcoinOutput>,
        conclave_outputs: Vec<ConclaveOutput>,
    ) -> Self {
        assert!(!conclave_inputs.is_empty(), "a spend tx must consume at least one input");
        ConclaveTx {
            version,
            lock_time,
            min_sigs: 0,
            fund_point: None,
            trustees: Vec::new(),
            conclave_inputs,
            bitcoin_outputs,
            conclave_outputs,
        }
    }

    pub fn is_claim(&self) -> bool {
        self.fund_point.is_some()
    }

    pub fn is_spend(&self) -> bool {
        self.fund_point.is_none()
    }

    /// `hash256(serialize(tx))`, computed with whatever predecessor pointers
    /// are currently set. The ledger calls this once before resolving
    /// predecessors (`initialTxId`, spec.md §3.3) and once after
    /// (`finalTxId`).
    pub fn compute_hash(&self) -> Hash32 {
        hash256(&self.conclave_serialize_to_vec().expect("in-memory write cannot fail"))
    }

    /// Reconstructs the witness script a claim tx's Bitcoin fund output must
    /// commit to (spec.md §4.6). The claim script is a `CHECKMULTISIG`
    /// witness program over `(min_sigs, trustees)`, immediately followed by
    /// a data commitment to `conclave_outputs` so the script is pinned to
    /// the exact claim it authorizes:
    ///
    /// `<min_sigs> <trustee_0> .. <trustee_n-1> <n> OP_CHECKMULTISIG
    ///  <hash256(serialize(conclave_outputs))> OP_DROP`
    pub fn derive_claim_script(&self) -> Result<Script, SerializationError> {
        if self.trustees.is_empty() {
            return Err(SerializationError::Parse("claim script: no trustees"));
        }
        let commitment = {
            let mut buf = Vec::new();
            VarInt::from(self.conclave_outputs.len()).conclave_serialize(&mut buf)?;
            for output in &self.conclave_outputs {
                output.conclave_serialize(&mut buf)?;
            }
            hash256(&buf)
        };
        Ok(Script::claim_multisig(self.min_sigs, &self.trustees, commitment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivKey;

    fn sample_pubkey(seed: u8) -> PubKey {
        PrivKey::from_bytes(Hash32([seed; 32])).unwrap().public()
    }

    #[test]
    fn claim_tx_shape_roundtrips() {
        let fund_point = Outpoint { tx_id: Hash32([1u8; 32]), index: 0 };
        let output = ConclaveOutput {
            script_pub_key: Script::p2sh(crate::hash::Hash20([2u8; 20])),
            value: 1_000,
            predecessor: None,
        };
        let tx = ConclaveTx::claim(1, 0, fund_point, 1, vec![sample_pubkey(9)], vec![output]);
        assert!(tx.is_claim());
        let bytes = tx.conclave_serialize_to_vec().unwrap();
        let back = ConclaveTx::conclave_deserialize(&bytes[..]).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn spend_tx_shape_roundtrips() {
        let input = ConclaveInput {
            outpoint: Outpoint { tx_id: Hash32([3u8; 32]), index: 0 },
            script_sig: Script::new(),
            sequence: 0xffff_ffff,
            predecessor: None,
        };
        let output = ConclaveOutput {
            script_pub_key: Script::p2sh(crate::hash::Hash20([4u8; 20])),
            value: 500,
            predecessor: None,
        };
        let tx = ConclaveTx::spend(1, 0, vec![input], Vec::new(), vec![output]);
        assert!(tx.is_spend());
        let bytes = tx.conclave_serialize_to_vec().unwrap();
        let back = ConclaveTx::conclave_deserialize(&bytes[..]).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn claim_script_is_deterministic_and_commits_to_outputs() {
        let fund_point = Outpoint { tx_id: Hash32([5u8; 32]), index: 0 };
        let output = ConclaveOutput {
            script_pub_key: Script::p2sh(crate::hash::Hash20([6u8; 20])),
            value: 250,
            predecessor: None,
        };
        let tx = ConclaveTx::claim(1, 0, fund_point, 1, vec![sample_pubkey(1), sample_pubkey(2)], vec![output]);
        let script_a = tx.derive_claim_script().unwrap();
        let script_b = tx.derive_claim_script().unwrap();
        assert_eq!(script_a, script_b);

        let mut other = tx.clone();
        other.conclave_outputs[0].value = 251;
        let script_c = other.derive_claim_script().unwrap();
        assert_ne!(script_a, script_c, "claim script must commit to output values");
    }
}
