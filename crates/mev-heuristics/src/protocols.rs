//! Known-protocol tagging.

use crate::model::{Confidence, TransactionTrace};
use crate::walker::walk;
use alloy::primitives::{address, Address};
use serde::Serialize;
use std::collections::HashSet;

/// Broad role of a known contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolCategory {
    Dex,
    Aggregator,
    Lending,
    Marketplace,
    TradingBot,
}

/// Entry of the static protocol table.
#[derive(Debug, Clone, Copy)]
pub struct KnownProtocol {
    pub address: Address,
    pub name: &'static str,
    pub category: ProtocolCategory,
    /// Executes token swaps.
    pub swaps: bool,
    /// Offers same-transaction uncollateralized loans.
    pub flash_loans: bool,
}

const fn entry(
    address: Address,
    name: &'static str,
    category: ProtocolCategory,
    swaps: bool,
    flash_loans: bool,
) -> KnownProtocol {
    KnownProtocol {
        address,
        name,
        category,
        swaps,
        flash_loans,
    }
}

use ProtocolCategory::*;

pub const KNOWN_PROTOCOLS: &[KnownProtocol] = &[
    // DEXes and aggregators
    entry(address!("7a250d5630b4cf539739df2c5dacb4c659f2488d"), "Uniswap V2 Router", Dex, true, false),
    entry(address!("e592427a0aece92de3edee1f18e0157c05861564"), "Uniswap V3 Router", Dex, true, false),
    entry(address!("68b3465833fb72a70ecdf485e0e4c7bd8665fc45"), "Uniswap V3 Router 2", Dex, true, false),
    entry(address!("3fc91a3afd70395e496cb845d6726cfcc43de7d3"), "Uniswap Universal Router", Dex, true, false),
    entry(address!("d9e1ce17f2641f24ae83637ab66a2cca9c378b9f"), "SushiSwap Router", Dex, true, false),
    entry(address!("1b02da8cb0d097eb8d57a175b88c7d8b47997506"), "SushiSwap Trident Router", Dex, true, false),
    entry(address!("ba12222222228d8ba445958a75a0704d566bf2c8"), "Balancer V2 Vault", Dex, true, true),
    entry(address!("9008d19f58aabd9ed0d60971565aa8510560ab41"), "CoW Protocol Settlement", Aggregator, true, false),
    entry(address!("1111111254eeb25477b68fb85ed929f73a960582"), "1inch v5 Router", Aggregator, true, false),
    entry(address!("1111111254fb6c44bac0bed2854e76f90643097d"), "1inch v4 Router", Aggregator, true, false),
    entry(address!("def171fe48cf0115b1d80b88dc8eab59176fee57"), "ParaSwap Augustus V5", Aggregator, true, false),
    entry(address!("def1c0ded9bec7f1a1670819833240f027b25eff"), "0x Exchange Proxy", Aggregator, true, false),
    entry(address!("615f265506e8486241a8fa483a669e7123910b96"), "KyberSwap Elastic Router", Dex, true, false),
    // Curve
    entry(address!("90e00ace148ca3b23ac1bc8c240c2a7ddd9e0852"), "Curve Registry", Dex, false, false),
    entry(address!("d51a44d3fae010294c616388b506acda1bfaae46"), "Curve stETH-ETH Pool", Dex, true, false),
    entry(address!("bebc44782c7db0a1a60cb6fe97d0b483032ff1c7"), "Curve 3pool", Dex, true, false),
    entry(address!("dc24316b9ae028f1497c275eb9192a3ea0f67022"), "Curve cvxETH-ETH Pool", Dex, true, false),
    // Lending
    entry(address!("7d2768de32b0b80b7a3454c06bdac94a69ddc7a9"), "Aave V2 Lending Pool", Lending, false, true),
    entry(address!("87870bca3f3fd6335c3f4ce8392d69350b4fa4e2"), "Aave V3 Pool", Lending, false, true),
    entry(address!("3d9819210a31b4961b30ef54be2aed79b9c9cd3b"), "Compound Comptroller", Lending, false, true),
    entry(address!("ccf4429db6322d5c611ee964527d42e5d685dd6a"), "Compound III Comet", Lending, false, true),
    // Other infrastructure
    entry(address!("00000000006c3852cbef3e08e8df289169ede581"), "OpenSea Seaport 1.1", Marketplace, false, false),
    entry(address!("11111112542d85b3ef69ae05771c2dccff4faa26"), "1inch Flashloan Aggregator", Aggregator, false, true),
    entry(address!("40a871dd23de08c117d7e35b0d5aa9c22e442568"), "Banana Gun Router", TradingBot, true, false),
];

/// Find a protocol by exact address.
pub fn lookup_protocol(address: &Address) -> Option<&'static KnownProtocol> {
    KNOWN_PROTOCOLS.iter().find(|p| p.address == *address)
}

/// A known protocol touched by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolInteraction {
    pub address: Address,
    pub protocol: String,
    pub category: ProtocolCategory,
    /// Always `high`: matches are exact-address lookups.
    pub confidence: Confidence,
}

impl ProtocolInteraction {
    fn from_known(known: &KnownProtocol) -> Self {
        Self {
            address: known.address,
            protocol: known.name.to_string(),
            category: known.category,
            confidence: Confidence::High,
        }
    }

    pub fn known(&self) -> Option<&'static KnownProtocol> {
        lookup_protocol(&self.address)
    }

    pub fn swaps(&self) -> bool {
        self.known().is_some_and(|k| k.swaps)
    }

    pub fn flash_loans(&self) -> bool {
        self.known().is_some_and(|k| k.flash_loans)
    }
}

/// Tag every known protocol called by a transaction.
///
/// Callees are taken in pre-order, root callee included, and reported once
/// each in order of first appearance.
pub fn detect_protocols(trace: &TransactionTrace) -> Vec<ProtocolInteraction> {
    let mut seen = HashSet::new();
    walk(&trace.root)
        .map(|visit| visit.frame.to)
        .filter(|to| seen.insert(*to))
        .filter_map(|to| lookup_protocol(&to))
        .map(ProtocolInteraction::from_known)
        .collect()
}
