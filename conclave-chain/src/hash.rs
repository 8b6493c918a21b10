//! Fixed-width hash types (spec.md §3.1).
//!
//! `Hash32` is used for SHA-256 digests, double-SHA-256 digests, transaction
//! and block ids, and public-key/scalar coordinates. `Hash20` is used for
//! RIPEMD-160(SHA-256(·)) digests and address payloads.
//!
//! Following Bitcoin's historical convention (preserved here because
//! spec.md §4.1 mandates it for wire compatibility with Bitcoin ids),
//! `Hash32` is stored in the byte order a hash function naturally produces
//! it, serialized on the wire in that same order, but *displayed* and
//! *parsed* in the reversed, big-endian-looking hex string everyone
//! recognizes as a txid or block hash.

use std::fmt;
use std::ops::BitXor;
use std::str::FromStr;

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

use crate::serialization::{ConclaveDeserialize, ConclaveSerialize, SerializationError};

/// A 32-byte hash (SHA-256, double-SHA-256, txid, block id, pubkey
/// coordinate, ECDSA scalar).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Hash32(pub [u8; 32]);

/// A 20-byte hash (RIPEMD-160(SHA-256(·)), address payload).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Hash20(pub [u8; 20]);

impl Hash32 {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash32(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Hash20 {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Hash20(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl BitXor for Hash32 {
    type Output = Hash32;

    fn bitxor(self, rhs: Hash32) -> Hash32 {
        let mut out = [0u8; 32];
        for i in 0..32 {
            out[i] = self.0[i] ^ rhs.0[i];
        }
        Hash32(out)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hash32({})", self)
    }
}

impl fmt::Display for Hash20 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash20 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hash20({})", self)
    }
}

impl FromStr for Hash32 {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| SerializationError::Parse("invalid hash32 hex"))?;
        bytes.reverse();
        Ok(Hash32(bytes))
    }
}

impl FromStr for Hash20 {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| SerializationError::Parse("invalid hash20 hex"))?;
        Ok(Hash20(bytes))
    }
}

impl ConclaveSerialize for Hash32 {
    fn conclave_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error> {
        self.0.conclave_serialize(target)
    }
}

impl ConclaveDeserialize for Hash32 {
    fn conclave_deserialize<R: std::io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Hash32(<[u8; 32]>::conclave_deserialize(reader)?))
    }
}

impl ConclaveSerialize for Hash20 {
    fn conclave_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error> {
        self.0.conclave_serialize(target)
    }
}

impl ConclaveDeserialize for Hash20 {
    fn conclave_deserialize<R: std::io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Hash20(<[u8; 20]>::conclave_deserialize(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::serialization::ConclaveDeserialize as _;

    proptest! {
        #[test]
        fn hash32_serialize_roundtrip(hash in any::<Hash32>()) {
            let bytes = hash.conclave_serialize_to_vec().unwrap();
            let back = Hash32::conclave_deserialize(&bytes[..]).unwrap();
            prop_assert_eq!(hash, back);
        }

        #[test]
        fn hash32_display_fromstr_roundtrip(hash in any::<Hash32>()) {
            let parsed: Hash32 = hash.to_string().parse().unwrap();
            prop_assert_eq!(hash, parsed);
        }
    }

    #[test]
    fn hash32_display_reverses_wire_order() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xaa;
        bytes[31] = 0xbb;
        let h = Hash32(bytes);
        // Displayed hex starts with the *last* wire byte.
        assert!(h.to_string().starts_with("bb"));
        assert!(h.to_string().ends_with("aa"));
    }

    #[test]
    fn hash32_roundtrip_via_string() {
        let hex_str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";
        let h: Hash32 = hex_str.parse().unwrap();
        assert_eq!(h.to_string(), hex_str);
    }

    #[test]
    fn xor_is_involutive() {
        let a = Hash32([1u8; 32]);
        let b = Hash32([2u8; 32]);
        assert_eq!((a ^ b) ^ b, a);
    }

    #[test]
    fn serialize_roundtrip() {
        let h = Hash32([7u8; 32]);
        let bytes = h.conclave_serialize_to_vec().unwrap();
        let back = Hash32::conclave_deserialize(&bytes[..]).unwrap();
        assert_eq!(h, back);
    }
}
