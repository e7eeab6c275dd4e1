//! Gas cost and efficiency.

use crate::accounting::format_token_amount;
use crate::config::GasConfig;
use crate::report::serialize_u256_decimal;
use alloy::primitives::U256;
use serde::Serialize;

/// Qualitative gas efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GasEfficiency {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GasAnalysis {
    pub total_gas_used: u64,
    #[serde(serialize_with = "serialize_u256_decimal")]
    pub gas_price: U256,
    /// Fee in the native asset, formatted.
    pub gas_cost: String,
    pub gas_efficiency: GasEfficiency,
}

/// Rate gas usage, upgrading busy multi-protocol transactions that stayed cheap.
pub fn gas_efficiency(gas_used: u64, protocol_count: usize, config: &GasConfig) -> GasEfficiency {
    if protocol_count > 2 && gas_used < config.multi_protocol_high_below {
        return GasEfficiency::High;
    }
    if gas_used < config.high_below {
        GasEfficiency::High
    } else if gas_used > config.low_above {
        GasEfficiency::Low
    } else {
        GasEfficiency::Medium
    }
}

/// Build the gas section of a report.
pub fn analyze_gas(
    gas_used: u64,
    gas_price: U256,
    protocol_count: usize,
    native_symbol: &str,
    config: &GasConfig,
) -> GasAnalysis {
    let fee = U256::from(gas_used).saturating_mul(gas_price);
    GasAnalysis {
        total_gas_used: gas_used,
        gas_price,
        gas_cost: format_token_amount(fee, 18, native_symbol),
        gas_efficiency: gas_efficiency(gas_used, protocol_count, config),
    }
}
