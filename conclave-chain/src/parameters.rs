//! Network parameters (spec.md §3.1, §4.4).

/// Which Bitcoin network a chain-anchored address or transaction belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}
