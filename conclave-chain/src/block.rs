//! The side-ledger block header (spec.md §2 item 5, §9).
//!
//! Grounded in `zebra-chain::block::header::Header`'s field layout
//! (version/previous hash/merkle root/time/height), trimmed to what a
//! read-only chain-tip accessor needs: no difficulty bits or nonce, since
//! this core never produces or validates blocks (spec.md §9: "no component
//! in the core produces blocks").

use conclave_serde_derive::{ConclaveDeserialize as DeriveConclaveDeserialize, ConclaveSerialize as DeriveConclaveSerialize};

use crate::hash::Hash32;
use crate::serialization::{ConclaveDeserialize, ConclaveSerialize};

/// A side-ledger block header. `chain_tip()` (spec.md §4.7.4) returns
/// whatever header is recorded under the store's chain-tip singleton, or
/// [`genesis_header`] if none has been written yet.
#[derive(Clone, Debug, PartialEq, Eq, DeriveConclaveSerialize, DeriveConclaveDeserialize)]
pub struct ConclaveBlockHeader {
    pub version: u32,
    pub previous_block_hash: Hash32,
    pub merkle_root: Hash32,
    pub time: u32,
    pub height: u32,
}

impl ConclaveBlockHeader {
    pub fn hash(&self) -> Hash32 {
        crate::crypto::hash256(&self.conclave_serialize_to_vec().expect("in-memory write cannot fail"))
    }
}

/// The hard-coded genesis header: height 0, no predecessor, empty merkle
/// root. Used as `chain_tip()`'s fallback before any consensus component
/// has written a tip (spec.md §9).
pub fn genesis_header() -> ConclaveBlockHeader {
    ConclaveBlockHeader {
        version: 1,
        previous_block_hash: Hash32([0u8; 32]),
        merkle_root: Hash32([0u8; 32]),
        time: 0,
        height: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_stable() {
        assert_eq!(genesis_header(), genesis_header());
        assert_eq!(genesis_header().height, 0);
    }

    #[test]
    fn header_roundtrips() {
        let header = ConclaveBlockHeader {
            version: 2,
            previous_block_hash: Hash32([1u8; 32]),
            merkle_root: Hash32([2u8; 32]),
            time: 1_700_000_000,
            height: 42,
        };
        let bytes = header.conclave_serialize_to_vec().unwrap();
        let back = ConclaveBlockHeader::conclave_deserialize(&bytes[..]).unwrap();
        assert_eq!(header, back);
    }
}
