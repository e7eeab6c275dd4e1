//! Token metadata registry.
//!
//! Resolves `symbol()` and `decimals()` through the chain-data provider and
//! caches the answer per `(chain, address)`. Concurrent lookups of the same
//! uncached token share a single fetch. Failures resolve to the `UNKNOWN`/18
//! placeholder and are cached like any other answer.

use crate::erc20::IERC20::{decimalsCall, symbolCall};
use crate::flows::NATIVE_TOKEN;
use crate::model::TokenInfo;
use crate::networks::native_symbol;
use crate::provider::ChainDataProvider;
use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type CacheKey = (u64, Address);

/// Shared token metadata cache. Construct once per process and inject.
pub struct TokenRegistry {
    provider: Arc<dyn ChainDataProvider>,
    cells: Mutex<HashMap<CacheKey, Arc<OnceCell<TokenInfo>>>>,
    fetches: AtomicU64,
}

impl TokenRegistry {
    pub fn new(provider: Arc<dyn ChainDataProvider>) -> Self {
        Self {
            provider,
            cells: Mutex::new(HashMap::new()),
            fetches: AtomicU64::new(0),
        }
    }

    /// Resolve token metadata, never failing.
    ///
    /// # Arguments
    /// * `chain_id` - Chain the token lives on
    /// * `address` - Token contract, or the native sentinel
    pub async fn token_info(&self, chain_id: u64, address: Address) -> TokenInfo {
        if address == NATIVE_TOKEN {
            return TokenInfo {
                address,
                symbol: native_symbol(chain_id).to_string(),
                decimals: 18,
            };
        }

        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
            cells.entry((chain_id, address)).or_default().clone()
        };

        cell.get_or_init(|| self.fetch(chain_id, address))
            .await
            .clone()
    }

    /// Number of remote metadata fetches performed so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    async fn fetch(&self, chain_id: u64, address: Address) -> TokenInfo {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!("Fetching token metadata for {} on chain {}", address, chain_id);

        let symbol_call = self
            .provider
            .call(chain_id, address, Bytes::from(symbolCall {}.abi_encode()));
        let decimals_call = self
            .provider
            .call(chain_id, address, Bytes::from(decimalsCall {}.abi_encode()));

        match tokio::join!(symbol_call, decimals_call) {
            (Ok(symbol_data), Ok(decimals_data)) => {
                match (decode_symbol(&symbol_data), decode_decimals(&decimals_data)) {
                    (Some(symbol), Some(decimals)) => TokenInfo {
                        address,
                        symbol,
                        decimals,
                    },
                    _ => {
                        warn!("Undecodable token metadata for {}", address);
                        TokenInfo::unknown(address)
                    }
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Token metadata lookup failed for {}: {}", address, e);
                TokenInfo::unknown(address)
            }
        }
    }
}

/// Decode a `symbol()` return value: ABI `string`, or `bytes32` for older tokens.
fn decode_symbol(data: &[u8]) -> Option<String> {
    let symbol = match symbolCall::abi_decode_returns(data, true) {
        Ok(decoded) => decoded.symbol,
        Err(_) if data.len() == 32 => {
            let end = data.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
            String::from_utf8_lossy(&data[..end]).into_owned()
        }
        Err(_) => return None,
    };

    let symbol = symbol
        .chars()
        .filter(|c| !c.is_control() && *c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim()
        .to_string();

    (!symbol.is_empty()).then_some(symbol)
}

fn decode_decimals(data: &[u8]) -> Option<u8> {
    decimalsCall::abi_decode_returns(data, true)
        .ok()
        .map(|decoded| decoded.decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use alloy::sol_types::SolValue;

    #[test]
    fn test_calldata_uses_erc20_selectors() {
        assert_eq!(symbolCall {}.abi_encode(), vec![0x95, 0xd8, 0x9b, 0x41]);
        assert_eq!(decimalsCall {}.abi_encode(), vec![0x31, 0x3c, 0xe5, 0x67]);
    }

    #[test]
    fn test_decode_abi_string_symbol() {
        assert_eq!(decode_symbol(&"USDC".to_string().abi_encode()), Some("USDC".to_string()));
    }

    #[test]
    fn test_decode_bytes32_symbol() {
        let mut data = b"MKR".to_vec();
        data.resize(32, 0);
        assert_eq!(decode_symbol(&data), Some("MKR".to_string()));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_symbol(&[]), None);
        assert_eq!(decode_symbol(&[0u8; 32]), None);
        // Offset pointing past the end
        let mut data = U256::from(4096u64).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(&[0u8; 32]);
        assert_eq!(decode_symbol(&data), None);
    }

    #[test]
    fn test_decode_decimals() {
        assert_eq!(decode_decimals(&U256::from(6u64).to_be_bytes::<32>()), Some(6));
        assert_eq!(decode_decimals(&[1, 2]), None);
    }
}
