//! The daemon's on-disk configuration (spec.md §6.4): a JSON document with
//! the seven top-level keys, loaded once at startup.
//!
//! Grounded in the original `Config`/`BitcoinChainConfig`/
//! `ElectrumxClientConfig` (`config.cpp`, `bitcoin_chain_config.h`,
//! `electrumx_client_config.h`): a flat struct of sub-configs, one per
//! collaborator, parsed from a single document and failing the whole load on
//! any missing or malformed field. `serde`/`serde_json` stand in for the
//! original's `boost::property_tree`, matching the teacher's (`zebra-chain`)
//! choice of `serde` for every wire and config format it touches.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::store::Store;

/// Top-level config document (spec.md §6.4's seven keys).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub testnet: bool,
    pub display_name: String,
    pub private_key: String,
    #[serde(rename = "RPC")]
    pub rpc: RpcConfig,
    pub bitcoin_chain: BitcoinChainConfig,
    pub conclave_chain: ConclaveChainConfig,
    pub chainwatch: ChainwatchConfig,
}

/// Where the RPC boundary (spec.md §6.3) listens. The dispatcher itself is
/// out of this crate's scope; only the bind address is configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RpcConfig {
    pub bind_address: String,
    pub port: u16,
}

/// The Bitcoin-side chain adapter's connection details, mirroring the
/// original's `ElectrumxClientConfig` (host/port of an Electrum-protocol
/// server) one level down inside `BitcoinChainConfig`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BitcoinChainConfig {
    pub electrumx: ElectrumxClientConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ElectrumxClientConfig {
    pub host: String,
    pub port: u16,
}

/// Where this side-ledger's own `sled` store lives on disk and how deep a
/// predecessor chain it tolerates before returning `ChainTooDeep`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConclaveChainConfig {
    pub data_dir: PathBuf,
    pub max_chain_depth: u64,
}

/// Polling interval for the out-of-scope Chainwatch component that notices
/// new Bitcoin blocks (spec.md §9: block production/consensus is not this
/// core's job, but it still needs to know how often to look).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChainwatchConfig {
    pub poll_interval_seconds: u64,
}

impl Config {
    /// Loads and parses the JSON document at `path`, per spec.md §6.4: any
    /// I/O or parse failure here is the caller's cue to exit 1.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| LedgerError::Adapter(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| LedgerError::Adapter(e.to_string()))
    }

    /// Opens this config's `sled` store at `ConclaveChain.DataDir`.
    pub fn open_store(&self) -> Result<Store, LedgerError> {
        Store::open(&self.conclave_chain.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_top_level_keys() {
        let json = r#"{
            "Testnet": true,
            "DisplayName": "conclave-test-node",
            "PrivateKey": "deadbeef",
            "RPC": {"BindAddress": "127.0.0.1", "Port": 8080},
            "BitcoinChain": {"Electrumx": {"Host": "electrum.example.org", "Port": 50001}},
            "ConclaveChain": {"DataDir": "/tmp/conclave", "MaxChainDepth": 10000},
            "Chainwatch": {"PollIntervalSeconds": 30}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.testnet);
        assert_eq!(config.display_name, "conclave-test-node");
        assert_eq!(config.bitcoin_chain.electrumx.port, 50001);
        assert_eq!(config.conclave_chain.max_chain_depth, 10000);
        assert_eq!(config.chainwatch.poll_interval_seconds, 30);
    }

    #[test]
    fn rejects_a_document_missing_a_required_key() {
        let json = r#"{"Testnet": true, "DisplayName": "x", "PrivateKey": "y"}"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }
}
