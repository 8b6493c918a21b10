//! Cryptographic primitives (spec.md §4.2): hashing, SECP256k1 keys, ECDSA
//! signatures.

use ripemd160::{Digest as _, Ripemd160};
use secp256k1::{Message, Secp256k1, SecretKey};
use sha2::{Digest as _, Sha256};

use crate::hash::{Hash20, Hash32};
use crate::serialization::{ConclaveDeserialize, ConclaveSerialize, SerializationError};

/// `SHA-256(x)`.
pub fn sha256(data: &[u8]) -> Hash32 {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash32(out)
}

/// `SHA-256(SHA-256(x))`.
pub fn hash256(data: &[u8]) -> Hash32 {
    sha256(sha256(data).as_bytes())
}

/// `RIPEMD-160(SHA-256(x))`.
pub fn hash160(data: &[u8]) -> Hash20 {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(&sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    Hash20(out)
}

/// A SECP256k1 scalar in `[1, n-1]`.
#[derive(Clone)]
pub struct PrivKey(SecretKey);

impl PrivKey {
    pub fn from_bytes(bytes: Hash32) -> Result<Self, SerializationError> {
        SecretKey::from_slice(bytes.as_bytes())
            .map(PrivKey)
            .map_err(|_| SerializationError::Parse("invalid private scalar"))
    }

    pub fn public(&self) -> PubKey {
        let secp = Secp256k1::new();
        PubKey(secp256k1::PublicKey::from_secret_key(&secp, &self.0))
    }

    /// Signs `digest`, returning a low-`s` ECDSA signature (spec.md §4.2).
    pub fn sign(&self, digest: &Hash32) -> EcdsaSig {
        let secp = Secp256k1::signing_only();
        let message = Message::from_slice(digest.as_bytes()).expect("Hash32 is 32 bytes");
        let mut sig = secp.sign(&message, &self.0);
        sig.normalize_s();
        EcdsaSig(sig)
    }
}

/// A point on SECP256k1 (spec.md §3.1: stored as two `Hash32` coordinates).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PubKey(secp256k1::PublicKey);

impl PubKey {
    pub fn from_compressed(bytes: &[u8; 33]) -> Result<Self, SerializationError> {
        secp256k1::PublicKey::from_slice(bytes)
            .map(PubKey)
            .map_err(|_| SerializationError::Parse("invalid compressed pubkey"))
    }

    pub fn from_uncompressed(bytes: &[u8; 65]) -> Result<Self, SerializationError> {
        secp256k1::PublicKey::from_slice(bytes)
            .map(PubKey)
            .map_err(|_| SerializationError::Parse("invalid uncompressed pubkey"))
    }

    /// The `(x, y)` coordinates spec.md §3.1 describes the key as.
    pub fn coordinates(&self) -> (Hash32, Hash32) {
        let uncompressed = self.0.serialize_uncompressed();
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&uncompressed[1..33]);
        y.copy_from_slice(&uncompressed[33..65]);
        (Hash32(x), Hash32(y))
    }

    pub fn serialize_compressed(&self) -> [u8; 33] {
        self.0.serialize()
    }

    pub fn serialize_uncompressed(&self) -> [u8; 65] {
        self.0.serialize_uncompressed()
    }

    pub fn verify(&self, digest: &Hash32, sig: &EcdsaSig) -> bool {
        let secp = Secp256k1::verification_only();
        let message = match Message::from_slice(digest.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        secp.verify(&message, &sig.0, &self.0).is_ok()
    }
}

impl ConclaveSerialize for PubKey {
    /// Compressed (33-byte) form, as required for trustee keys in the claim
    /// script (spec.md §4.6).
    fn conclave_serialize<W: std::io::Write>(&self, mut target: W) -> Result<(), std::io::Error> {
        target.write_all(&self.serialize_compressed())
    }
}

impl ConclaveDeserialize for PubKey {
    fn conclave_deserialize<R: std::io::Read>(
        mut reader: R,
    ) -> Result<Self, SerializationError> {
        let mut buf = [0u8; 33];
        reader.read_exact(&mut buf)?;
        PubKey::from_compressed(&buf)
    }
}

/// An `(r, s)` ECDSA signature pair (spec.md §3.1, §9: dual serialization —
/// DER inside a `Script`, raw 64 bytes elsewhere).
#[derive(Clone)]
pub struct EcdsaSig(secp256k1::Signature);

impl EcdsaSig {
    pub fn from_raw(bytes: &[u8; 64]) -> Result<Self, SerializationError> {
        secp256k1::Signature::from_compact(bytes)
            .map(EcdsaSig)
            .map_err(|_| SerializationError::Parse("invalid raw ecdsa signature"))
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self, SerializationError> {
        secp256k1::Signature::from_der(bytes)
            .map(EcdsaSig)
            .map_err(|_| SerializationError::Parse("invalid der ecdsa signature"))
    }

    pub fn to_raw(&self) -> [u8; 64] {
        self.0.serialize_compact()
    }

    pub fn to_der(&self) -> Vec<u8> {
        self.0.serialize_der().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash160_matches_known_vector() {
        // hash160("") = b472a266d0bd89c13706a4132ccfb16f7c3b9fcb
        let h = hash160(b"");
        assert_eq!(hex::encode(h.as_bytes()), "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb");
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let priv_key = PrivKey::from_bytes(Hash32([7u8; 32])).unwrap();
        let pub_key = priv_key.public();
        let digest = hash256(b"conclave");
        let sig = priv_key.sign(&digest);
        assert!(pub_key.verify(&digest, &sig));
    }

    #[test]
    fn der_and_raw_roundtrip() {
        let priv_key = PrivKey::from_bytes(Hash32([9u8; 32])).unwrap();
        let digest = hash256(b"roundtrip");
        let sig = priv_key.sign(&digest);
        let der = sig.to_der();
        let from_der = EcdsaSig::from_der(&der).unwrap();
        assert_eq!(from_der.to_raw(), sig.to_raw());
    }
}
