//! Address codec (spec.md §4.4): three formats, two networks, two payee
//! kinds. Grounded in `zebra-chain::transparent::address`'s Base58Check
//! P2PKH/P2SH addresses, extended with the Segwit (Bech32) and Conclave
//! (custom prime-modulus checksum) formats spec.md adds.

use std::fmt;
use std::str::FromStr;

use crate::crypto::hash160;
use crate::hash::{Hash20, Hash32};
use crate::parameters::Network;
use crate::script::Script;
use crate::serialization::SerializationError;

/// Which of the three address encodings a string/byte-string is in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddressFormat {
    Classic,
    Segwit,
    Conclave,
}

/// What kind of spending condition an address names.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Payee {
    PubKey,
    Script,
}

/// The payload hash carried by an address. `Hash20` for everything except
/// Segwit-script addresses, which commit to a full 32-byte witness script
/// hash (spec.md §3.1).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddressHash {
    H20(Hash20),
    H32(Hash32),
}

impl AddressHash {
    /// Byte-equality regardless of which arm holds the value; this is what
    /// backs `Address`'s hash-only equality (spec.md §3.1).
    fn as_slice(&self) -> &[u8] {
        match self {
            AddressHash::H20(h) => h.as_bytes(),
            AddressHash::H32(h) => h.as_bytes(),
        }
    }
}

/// `(format, network, payee, hash)` — spec.md §3.1's algebraic address
/// value.
#[derive(Copy, Clone, Debug)]
pub struct Address {
    pub format: AddressFormat,
    pub network: Network,
    pub payee: Payee,
    pub hash: AddressHash,
}

/// Address equality is hash-equality only (spec.md §3.1): two addresses
/// that dereference to the same `hash` are the same logical payee
/// regardless of format or network. Use `to_string()` comparison if
/// textual/format equality is what's wanted instead.
impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.hash.as_slice() == other.hash.as_slice()
    }
}
impl Eq for Address {}

mod classic_magics {
    pub mod p2pkh {
        pub const MAINNET: u8 = 0x00;
        pub const TESTNET: u8 = 0x6f;
    }
    pub mod p2sh {
        pub const MAINNET: u8 = 0x05;
        pub const TESTNET: u8 = 0xc4;
    }
}

/// The largest prime below 2^20, used as the Conclave address checksum
/// modulus (spec.md §4.4).
const CONCLAVE_CHECKSUM_MODULUS: u32 = (1 << 20) - 3;

impl Address {
    pub fn from_pubkey_hash(network: Network, format: AddressFormat, hash: Hash20) -> Self {
        Address {
            format,
            network,
            payee: Payee::PubKey,
            hash: AddressHash::H20(hash),
        }
    }

    pub fn from_script_hash(network: Network, format: AddressFormat, hash: Hash20) -> Self {
        Address {
            format,
            network,
            payee: Payee::Script,
            hash: AddressHash::H20(hash),
        }
    }

    pub fn from_segwit_script_hash(network: Network, hash: Hash32) -> Self {
        Address {
            format: AddressFormat::Segwit,
            network,
            payee: Payee::Script,
            hash: AddressHash::H32(hash),
        }
    }

    /// A P2SH address naming the wallet that owns `script`, i.e. the
    /// canonical way the side-ledger names a `scriptPubKey`'s wallet.
    pub fn p2sh_of(network: Network, format: AddressFormat, script: &Script) -> Self {
        let hash = hash160(&script.to_bytes());
        Self::from_script_hash(network, format, hash)
    }

    fn classic_version_byte(&self) -> u8 {
        use classic_magics::*;
        match (self.network, self.payee) {
            (Network::Mainnet, Payee::PubKey) => p2pkh::MAINNET,
            (Network::Testnet, Payee::PubKey) => p2pkh::TESTNET,
            (Network::Mainnet, Payee::Script) => p2sh::MAINNET,
            (Network::Testnet, Payee::Script) => p2sh::TESTNET,
        }
    }

    fn encode_classic(&self) -> String {
        let hash20 = match self.hash {
            AddressHash::H20(h) => h,
            AddressHash::H32(_) => unreachable!("classic addresses never carry a 32-byte hash"),
        };
        let mut payload = Vec::with_capacity(25);
        payload.push(self.classic_version_byte());
        payload.extend_from_slice(hash20.as_bytes());
        let checksum = crate::crypto::hash256(&payload);
        payload.extend_from_slice(&checksum.as_bytes()[..4]);
        bs58::encode(payload).into_string()
    }

    fn decode_classic(bytes: &[u8]) -> Result<Self, SerializationError> {
        if bytes.len() != 25 {
            return Err(SerializationError::Parse("classic address: wrong length"));
        }
        let (payload, checksum) = bytes.split_at(21);
        let expected = crate::crypto::hash256(payload);
        if &expected.as_bytes()[..4] != checksum {
            return Err(SerializationError::Parse("classic address: bad checksum"));
        }
        let version = payload[0];
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);
        let hash = Hash20(hash);
        use classic_magics::*;
        let (network, payee) = match version {
            v if v == p2pkh::MAINNET => (Network::Mainnet, Payee::PubKey),
            v if v == p2pkh::TESTNET => (Network::Testnet, Payee::PubKey),
            v if v == p2sh::MAINNET => (Network::Mainnet, Payee::Script),
            v if v == p2sh::TESTNET => (Network::Testnet, Payee::Script),
            _ => return Err(SerializationError::Parse("classic address: bad version byte")),
        };
        Ok(Address {
            format: AddressFormat::Classic,
            network,
            payee,
            hash: AddressHash::H20(hash),
        })
    }

    fn bech32_hrp(network: Network) -> &'static str {
        match network {
            Network::Mainnet => "bc",
            Network::Testnet => "tb",
        }
    }

    fn encode_segwit(&self) -> String {
        let hrp = Self::bech32_hrp(self.network);
        let program: Vec<u8> = match self.hash {
            AddressHash::H20(h) => h.as_bytes().to_vec(),
            AddressHash::H32(h) => h.as_bytes().to_vec(),
        };
        let mut data = vec![bech32::u5::try_from_u8(0).expect("witness version 0 fits in u5")];
        data.extend(
            bech32::convert_bits(&program, 8, 5, true)
                .expect("8->5 bit conversion cannot fail")
                .into_iter()
                .map(|b| bech32::u5::try_from_u8(b).expect("convert_bits yields 5-bit values")),
        );
        bech32::encode(hrp, data, bech32::Variant::Bech32).expect("hrp/program are valid")
    }

    fn decode_segwit(s: &str) -> Result<Self, SerializationError> {
        let (hrp, data, variant) =
            bech32::decode(s).map_err(|_| SerializationError::Parse("segwit: bech32 decode failed"))?;
        if variant != bech32::Variant::Bech32 {
            return Err(SerializationError::Parse("segwit: bech32m is not accepted"));
        }
        let network = match hrp.as_str() {
            "bc" => Network::Mainnet,
            "tb" => Network::Testnet,
            _ => return Err(SerializationError::Parse("segwit: unknown hrp")),
        };
        let (version, program) = data
            .split_first()
            .ok_or(SerializationError::Parse("segwit: empty program"))?;
        if version.to_u8() != 0 {
            return Err(SerializationError::Parse("segwit: only witness v0 is supported"));
        }
        let program = bech32::convert_bits(program, 5, 8, false)
            .map_err(|_| SerializationError::Parse("segwit: bad bit grouping"))?;
        match program.len() {
            20 => {
                let mut h = [0u8; 20];
                h.copy_from_slice(&program);
                Ok(Address::from_pubkey_hash(network, AddressFormat::Segwit, Hash20(h)))
            }
            32 => {
                let mut h = [0u8; 32];
                h.copy_from_slice(&program);
                Ok(Address::from_segwit_script_hash(network, Hash32(h)))
            }
            _ => Err(SerializationError::Parse("segwit: bad program length")),
        }
    }

    fn conclave_class_and_network(&self) -> (u8, u8) {
        let network_bit = match self.network {
            Network::Mainnet => 0u8,
            Network::Testnet => 1u8,
        };
        let class = match self.payee {
            Payee::PubKey => 0u8,
            Payee::Script => 1u8,
        };
        (class, network_bit)
    }

    fn encode_conclave(&self) -> String {
        let hash20 = match self.hash {
            AddressHash::H20(h) => h,
            AddressHash::H32(_) => unreachable!("conclave addresses never carry a 32-byte hash"),
        };
        let (class, network_bit) = self.conclave_class_and_network();

        // [class:3][hash:160][network:1] as a big-endian 164-bit integer, mod M.
        let checksum = conclave_checksum(class, hash20.as_bytes(), network_bit);

        // [network:1][class:3][checksum:20] as the first 24 bits.
        let header: u32 = ((network_bit as u32) << 23) | ((class as u32) << 20) | checksum;
        let mut out = Vec::with_capacity(23);
        out.push((header >> 16) as u8);
        out.push((header >> 8) as u8);
        out.push(header as u8);
        out.extend_from_slice(hash20.as_bytes());
        bs58::encode(out).into_string()
    }

    fn decode_conclave(bytes: &[u8]) -> Result<Self, SerializationError> {
        if bytes.len() != 23 {
            return Err(SerializationError::Parse("conclave address: wrong length"));
        }
        let header = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32);
        let network_bit = ((header >> 23) & 0x1) as u8;
        let class = ((header >> 20) & 0x7) as u8;
        let checksum = header & 0xf_ffff;

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[3..]);

        let expected = conclave_checksum(class, &hash, network_bit);
        if checksum != expected {
            return Err(SerializationError::Parse("conclave address: bad checksum"));
        }

        let network = match network_bit {
            0 => Network::Mainnet,
            _ => Network::Testnet,
        };
        let payee = match class {
            0 => Payee::PubKey,
            1 => Payee::Script,
            _ => return Err(SerializationError::Parse("conclave address: unknown class")),
        };
        Ok(Address {
            format: AddressFormat::Conclave,
            network,
            payee,
            hash: AddressHash::H20(Hash20(hash)),
        })
    }
}

/// `[class:3][hash:160][network:1]` read as a big-endian integer, mod
/// `2^20 - 3` (spec.md §4.4).
fn conclave_checksum(class: u8, hash: &[u8; 20], network_bit: u8) -> u32 {
    let mut acc: u64 = 0;
    acc = (acc << 3) | (class as u64 & 0x7);
    for byte in hash {
        acc = ((acc << 8) | (*byte as u64)) % (CONCLAVE_CHECKSUM_MODULUS as u64 * 1_000_000);
    }
    acc = (acc << 1) | (network_bit as u64 & 0x1);
    (acc % CONCLAVE_CHECKSUM_MODULUS as u64) as u32
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let encoded = match self.format {
            AddressFormat::Classic => self.encode_classic(),
            AddressFormat::Segwit => self.encode_segwit(),
            AddressFormat::Conclave => self.encode_conclave(),
        };
        f.write_str(&encoded)
    }
}

impl FromStr for Address {
    type Err = SerializationError;

    /// Recognizes the format by first attempting a plain Base58 decode: 25
    /// decoded bytes means Classic, 23 means Conclave; otherwise falls back
    /// to Bech32 (spec.md §4.4).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(bytes) = bs58::decode(s).into_vec() {
            match bytes.len() {
                25 => return Self::decode_classic(&bytes),
                23 => return Self::decode_conclave(&bytes),
                _ => {}
            }
        }
        Self::decode_segwit(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_roundtrip() {
        let addr = Address::from_pubkey_hash(Network::Mainnet, AddressFormat::Classic, Hash20([3u8; 20]));
        let s = addr.to_string();
        let back: Address = s.parse().unwrap();
        assert_eq!(addr, back);
        assert_eq!(back.format, AddressFormat::Classic);
    }

    #[test]
    fn conclave_roundtrip_all_variants() {
        for network in [Network::Mainnet, Network::Testnet] {
            for payee in [Payee::PubKey, Payee::Script] {
                let hash = Hash20([9u8; 20]);
                let addr = Address {
                    format: AddressFormat::Conclave,
                    network,
                    payee,
                    hash: AddressHash::H20(hash),
                };
                let s = addr.to_string();
                let back: Address = s.parse().expect("conclave address should decode");
                assert_eq!(addr, back);
                assert_eq!(back.network, network);
                assert_eq!(back.payee, payee);
            }
        }
    }

    #[test]
    fn conclave_bad_checksum_rejected() {
        let addr = Address {
            format: AddressFormat::Conclave,
            network: Network::Mainnet,
            payee: Payee::PubKey,
            hash: AddressHash::H20(Hash20([1u8; 20])),
        };
        let mut bytes = bs58::decode(addr.to_string()).into_vec().unwrap();
        bytes[2] ^= 0xff; // flip checksum bits
        let tampered = bs58::encode(bytes).into_string();
        assert!(Address::from_str(&tampered).is_err());
    }

    #[test]
    fn segwit_v0_roundtrip() {
        let addr = Address::from_pubkey_hash(Network::Testnet, AddressFormat::Segwit, Hash20([5u8; 20]));
        let s = addr.to_string();
        let back: Address = s.parse().unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn hash_equality_ignores_format_and_network() {
        let hash = Hash20([4u8; 20]);
        let classic = Address::from_pubkey_hash(Network::Mainnet, AddressFormat::Classic, hash);
        let conclave = Address {
            format: AddressFormat::Conclave,
            network: Network::Testnet,
            payee: Payee::PubKey,
            hash: AddressHash::H20(hash),
        };
        assert_eq!(classic, conclave);
        assert_ne!(classic.to_string(), conclave.to_string());
    }
}
