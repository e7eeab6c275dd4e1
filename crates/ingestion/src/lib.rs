//! HTTP chain-data provider for the MEVScope analyzer.
//!
//! Talks to a 1inch-style gateway exposing a JSON-RPC proxy per chain and a
//! trace API returning structured call trees with event logs.

pub mod provider;
pub mod retry;
pub mod rpc_client;

pub use provider::HttpChainProvider;
pub use rpc_client::{ProviderConfig, RpcClient};
