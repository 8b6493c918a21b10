//! Bitcoin script (spec.md §4.5): a flat opcode/push-data byte vector with
//! canonical hashing and the standard output-template factories.
//!
//! Grounded in `zebra-chain::transparent::script::Script`'s newtype-over-
//! `Vec<u8>` representation; unlike the teacher this module also knows how
//! to *construct* the handful of script templates the side-ledger cares
//! about (P2PKH/P2SH/P2WPKH/P2WSH), since there's no miner or script
//! interpreter downstream to build them instead.

use std::fmt;

use crate::address::{Address, AddressFormat, AddressHash, Payee};
use crate::crypto::{hash160, sha256};
use crate::hash::{Hash20, Hash32};
use crate::serialization::{ConclaveDeserialize, ConclaveSerialize, SerializationError, VarInt};

/// A single opcode, as a raw byte. Named constants cover the subset spec.md
/// §4.5 requires; any other byte is carried through as `Opcode::Other`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    Op0,
    PushBytes(u8),
    Dup,
    Hash160,
    Hash256,
    Sha256,
    Equal,
    EqualVerify,
    CheckSig,
    CheckMultisig,
    Drop,
    Other(u8),
}

impl Opcode {
    const OP_0: u8 = 0x00;
    const OP_PUSHDATA1: u8 = 0x4c;
    const OP_PUSHDATA2: u8 = 0x4d;
    const OP_PUSHDATA4: u8 = 0x4e;
    const OP_DUP: u8 = 0x76;
    const OP_EQUAL: u8 = 0x87;
    const OP_EQUALVERIFY: u8 = 0x88;
    const OP_HASH160: u8 = 0xa9;
    const OP_HASH256: u8 = 0xaa;
    const OP_SHA256: u8 = 0xa8;
    const OP_CHECKSIG: u8 = 0xac;
    const OP_CHECKMULTISIG: u8 = 0xae;
    const OP_DROP: u8 = 0x75;

    fn byte(self) -> u8 {
        match self {
            Opcode::Op0 => Self::OP_0,
            Opcode::PushBytes(n) => n,
            Opcode::Dup => Self::OP_DUP,
            Opcode::Hash160 => Self::OP_HASH160,
            Opcode::Hash256 => Self::OP_HASH256,
            Opcode::Sha256 => Self::OP_SHA256,
            Opcode::Equal => Self::OP_EQUAL,
            Opcode::EqualVerify => Self::OP_EQUALVERIFY,
            Opcode::CheckSig => Self::OP_CHECKSIG,
            Opcode::CheckMultisig => Self::OP_CHECKMULTISIG,
            Opcode::Drop => Self::OP_DROP,
            Opcode::Other(b) => b,
        }
    }
}

/// A finite ordered sequence of opcodes and push-data chunks, stored in its
/// flat serialized form (spec.md §3.1: "Equality is byte-equality of
/// canonical serialization.").
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    fn push_opcode(&mut self, op: Opcode) -> &mut Self {
        self.0.push(op.byte());
        self
    }

    /// Appends `data` as a single push, choosing the minimal-length pushdata
    /// opcode the way Bitcoin's script assembler does.
    pub fn push_data(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len < Opcode::OP_PUSHDATA1 as usize {
            self.0.push(len as u8);
        } else if len <= 0xff {
            self.0.push(Opcode::OP_PUSHDATA1);
            self.0.push(len as u8);
        } else if len <= 0xffff {
            self.0.push(Opcode::OP_PUSHDATA2);
            self.0.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.0.push(Opcode::OP_PUSHDATA4);
            self.0.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.0.extend_from_slice(data);
        self
    }

    /// `script.hash256()`: the canonical 32-byte wallet hash used as a key
    /// in `FundTips`/`SpendTips` (spec.md §4.5).
    pub fn hash256(&self) -> Hash32 {
        crate::crypto::hash256(&self.0)
    }

    pub fn sha256(&self) -> Hash32 {
        sha256(&self.0)
    }

    pub fn hash160(&self) -> Hash20 {
        hash160(&self.0)
    }

    /// `DUP HASH160 <addr.hash> EQUALVERIFY CHECKSIG`.
    pub fn p2pkh(hash: Hash20) -> Self {
        let mut s = Script::new();
        s.push_opcode(Opcode::Dup)
            .push_opcode(Opcode::Hash160)
            .push_data(hash.as_bytes())
            .push_opcode(Opcode::EqualVerify)
            .push_opcode(Opcode::CheckSig);
        s
    }

    /// `HASH160 <addr.hash> EQUAL`.
    pub fn p2sh(hash: Hash20) -> Self {
        let mut s = Script::new();
        s.push_opcode(Opcode::Hash160)
            .push_data(hash.as_bytes())
            .push_opcode(Opcode::Equal);
        s
    }

    /// `OP_0 <addr.hash>` (20-byte program: P2WPKH).
    pub fn p2wpkh(hash: Hash20) -> Self {
        let mut s = Script::new();
        s.push_opcode(Opcode::Op0).push_data(hash.as_bytes());
        s
    }

    /// `OP_0 <program>` (32-byte program: P2WSH).
    pub fn p2wsh(program: Hash32) -> Self {
        let mut s = Script::new();
        s.push_opcode(Opcode::Op0).push_data(program.as_bytes());
        s
    }

    /// `HASH160 <hash160(serialize(script))> EQUAL`.
    pub fn p2sh_of_script(inner: &Script) -> Self {
        Self::p2sh(hash160(&inner.0))
    }

    /// `OP_0 <sha256(serialize(script))>`.
    pub fn p2wsh_of_script(inner: &Script) -> Self {
        Self::p2wsh(sha256(&inner.0))
    }

    /// Pushes `n` as a minimal little-endian script number, Bitcoin's
    /// `CScriptNum` encoding (no sign bit needed here: `n` is always a
    /// trustee count or `min_sigs`, never negative).
    fn push_int(&mut self, n: u64) -> &mut Self {
        if n == 0 {
            return self.push_opcode(Opcode::Op0);
        }
        let mut bytes = n.to_le_bytes().to_vec();
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        if bytes.last().copied().unwrap_or(0) & 0x80 != 0 {
            bytes.push(0);
        }
        self.push_data(&bytes)
    }

    /// The claim script a side-ledger claim tx's Bitcoin fund output must
    /// commit to (spec.md §4.6): a `CHECKMULTISIG` witness program over
    /// `(min_sigs, trustees)` followed by a data commitment to the claimed
    /// outputs so the script is pinned to the exact claim it authorizes.
    pub fn claim_multisig(min_sigs: u8, trustees: &[crate::crypto::PubKey], outputs_commitment: Hash32) -> Self {
        let mut s = Script::new();
        s.push_int(min_sigs as u64);
        for trustee in trustees {
            s.push_data(&trustee.serialize_compressed());
        }
        s.push_int(trustees.len() as u64);
        s.push_opcode(Opcode::CheckMultisig);
        s.push_data(outputs_commitment.as_bytes());
        s.push_opcode(Opcode::Drop);
        s
    }

    /// Returns `Some(program)` if this script is a P2WSH output, i.e.
    /// `OP_0 <32-byte program>`.
    pub fn as_p2wsh_program(&self) -> Option<Hash32> {
        if self.0.len() == 34 && self.0[0] == Opcode::OP_0 && self.0[1] == 32 {
            let mut program = [0u8; 32];
            program.copy_from_slice(&self.0[2..34]);
            Some(Hash32(program))
        } else {
            None
        }
    }

    /// Returns `Some(hash)` if this script is exactly `DUP HASH160 <hash>
    /// EQUALVERIFY CHECKSIG`, the shape [`Script::p2pkh`] produces.
    pub fn as_p2pkh_hash(&self) -> Option<Hash20> {
        if self.0.len() == 25
            && self.0[0] == Opcode::OP_DUP
            && self.0[1] == Opcode::OP_HASH160
            && self.0[2] == 20
            && self.0[23] == Opcode::OP_EQUALVERIFY
            && self.0[24] == Opcode::OP_CHECKSIG
        {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&self.0[3..23]);
            Some(Hash20(hash))
        } else {
            None
        }
    }

    /// Returns `Some(hash)` if this script is exactly `HASH160 <hash>
    /// EQUAL`, the shape [`Script::p2sh`] produces.
    pub fn as_p2sh_hash(&self) -> Option<Hash20> {
        if self.0.len() == 23
            && self.0[0] == Opcode::OP_HASH160
            && self.0[1] == 20
            && self.0[22] == Opcode::OP_EQUAL
        {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&self.0[2..22]);
            Some(Hash20(hash))
        } else {
            None
        }
    }

    /// Parses a push-only script (as `scriptSig`s in this system always are)
    /// into its sequence of pushed byte strings.
    pub fn push_datas(&self) -> Result<Vec<Vec<u8>>, SerializationError> {
        let bytes = &self.0;
        let mut out = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let op = bytes[i];
            i += 1;
            let len = if op == Opcode::OP_0 {
                0
            } else if (op as usize) < Opcode::OP_PUSHDATA1 as usize {
                op as usize
            } else if op == Opcode::OP_PUSHDATA1 {
                let n = *bytes.get(i).ok_or(SerializationError::Parse("script: truncated pushdata1 length"))? as usize;
                i += 1;
                n
            } else if op == Opcode::OP_PUSHDATA2 {
                let slice = bytes
                    .get(i..i + 2)
                    .ok_or(SerializationError::Parse("script: truncated pushdata2 length"))?;
                i += 2;
                u16::from_le_bytes([slice[0], slice[1]]) as usize
            } else if op == Opcode::OP_PUSHDATA4 {
                let slice = bytes
                    .get(i..i + 4)
                    .ok_or(SerializationError::Parse("script: truncated pushdata4 length"))?;
                i += 4;
                u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]) as usize
            } else {
                return Err(SerializationError::Parse("script: not a push-only script"));
            };
            let data = bytes
                .get(i..i + len)
                .ok_or(SerializationError::Parse("script: truncated push data"))?
                .to_vec();
            i += len;
            out.push(data);
        }
        Ok(out)
    }

    /// Selects the right factory for `address`'s `(format, payee)` pair
    /// (spec.md §4.5's polymorphic `p2h`).
    pub fn p2h(address: &Address) -> Self {
        match (address.format, address.payee) {
            (AddressFormat::Segwit, Payee::PubKey) => match address.hash {
                AddressHash::H20(h) => Script::p2wpkh(h),
                AddressHash::H32(_) => unreachable!("segwit pubkey addresses carry a 20-byte hash"),
            },
            (AddressFormat::Segwit, Payee::Script) => match address.hash {
                AddressHash::H32(h) => Script::p2wsh(h),
                AddressHash::H20(_) => unreachable!("segwit script addresses carry a 32-byte hash"),
            },
            (_, Payee::PubKey) => match address.hash {
                AddressHash::H20(h) => Script::p2pkh(h),
                AddressHash::H32(_) => unreachable!("non-segwit addresses carry a 20-byte hash"),
            },
            (_, Payee::Script) => match address.hash {
                AddressHash::H20(h) => Script::p2sh(h),
                AddressHash::H32(_) => unreachable!("non-segwit addresses carry a 20-byte hash"),
            },
        }
    }

    /// Parses a whitespace-delimited assembly-style string such as
    /// `"OP_DUP OP_HASH160 <hex> OP_EQUALVERIFY OP_CHECKSIG"`.
    pub fn from_asm(asm: &str) -> Result<Self, SerializationError> {
        let mut s = Script::new();
        for token in asm.split_whitespace() {
            match token {
                "OP_0" => {
                    s.push_opcode(Opcode::Op0);
                }
                "OP_DUP" => {
                    s.push_opcode(Opcode::Dup);
                }
                "OP_HASH160" => {
                    s.push_opcode(Opcode::Hash160);
                }
                "OP_HASH256" => {
                    s.push_opcode(Opcode::Hash256);
                }
                "OP_SHA256" => {
                    s.push_opcode(Opcode::Sha256);
                }
                "OP_EQUAL" => {
                    s.push_opcode(Opcode::Equal);
                }
                "OP_EQUALVERIFY" => {
                    s.push_opcode(Opcode::EqualVerify);
                }
                "OP_CHECKSIG" => {
                    s.push_opcode(Opcode::CheckSig);
                }
                "OP_CHECKMULTISIG" => {
                    s.push_opcode(Opcode::CheckMultisig);
                }
                "OP_DROP" => {
                    s.push_opcode(Opcode::Drop);
                }
                hex_token => {
                    let bytes = hex::decode(hex_token)
                        .map_err(|_| SerializationError::Parse("script asm: invalid push-data hex"))?;
                    s.push_data(&bytes);
                }
            }
        }
        Ok(s)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Script({})", hex::encode(&self.0))
    }
}

impl ConclaveSerialize for Script {
    /// Varint byte-length of the flat opcode bytes, then those bytes
    /// (spec.md §4.1).
    fn conclave_serialize<W: std::io::Write>(&self, mut target: W) -> Result<(), std::io::Error> {
        VarInt::from(self.0.len()).conclave_serialize(&mut target)?;
        target.write_all(&self.0)
    }
}

impl ConclaveDeserialize for Script {
    fn conclave_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = VarInt::conclave_deserialize(&mut reader)?.value() as usize;
        let mut bytes = vec![0u8; len];
        reader.read_exact(&mut bytes)?;
        Ok(Script(bytes))
    }
}
