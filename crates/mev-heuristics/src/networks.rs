//! Supported EVM networks.

use serde::Serialize;

/// Static description of a supported chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub chain_id: u64,
    pub name: &'static str,
    /// Symbol of the chain's native gas asset.
    pub native_symbol: &'static str,
    pub block_explorer: &'static str,
}

pub const SUPPORTED_NETWORKS: &[Network] = &[
    Network { chain_id: 1, name: "Ethereum", native_symbol: "ETH", block_explorer: "https://etherscan.io" },
    Network { chain_id: 10, name: "Optimism", native_symbol: "ETH", block_explorer: "https://optimistic.etherscan.io" },
    Network { chain_id: 56, name: "BNB Chain", native_symbol: "BNB", block_explorer: "https://bscscan.com" },
    Network { chain_id: 100, name: "Gnosis", native_symbol: "xDAI", block_explorer: "https://gnosisscan.io" },
    Network { chain_id: 137, name: "Polygon", native_symbol: "MATIC", block_explorer: "https://polygonscan.com" },
    Network { chain_id: 146, name: "Sonic", native_symbol: "S", block_explorer: "https://sonicscan.org" },
    Network { chain_id: 324, name: "zkSync Era", native_symbol: "ETH", block_explorer: "https://explorer.zksync.io" },
    Network { chain_id: 8453, name: "Base", native_symbol: "ETH", block_explorer: "https://basescan.org" },
    Network { chain_id: 42161, name: "Arbitrum", native_symbol: "ETH", block_explorer: "https://arbiscan.io" },
    Network { chain_id: 43114, name: "Avalanche", native_symbol: "AVAX", block_explorer: "https://snowtrace.io" },
    Network { chain_id: 59144, name: "Linea", native_symbol: "ETH", block_explorer: "https://lineascan.build" },
];

/// Look up a supported network by chain id.
pub fn network(chain_id: u64) -> Option<&'static Network> {
    SUPPORTED_NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Native asset symbol for a chain, `ETH` when the chain is not listed.
pub fn native_symbol(chain_id: u64) -> &'static str {
    network(chain_id).map(|n| n.native_symbol).unwrap_or("ETH")
}
