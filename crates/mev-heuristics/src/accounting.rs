//! Net-position accounting.
//!
//! All arithmetic stays in exact 256-bit integers; amounts are only turned
//! into text by [`format_token_amount`] at the very end.

use crate::controlled::ControlledAddressSet;
use crate::flows::{TokenFlow, NATIVE_TOKEN};
use crate::model::TransactionTrace;
use alloy::primitives::{Address, I256, U256};
use std::collections::BTreeMap;

/// Inflow and outflow of one token for one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetPosition {
    pub token: Address,
    pub total_inflow: U256,
    pub total_outflow: U256,
}

impl NetPosition {
    fn empty(token: Address) -> Self {
        Self {
            token,
            total_inflow: U256::ZERO,
            total_outflow: U256::ZERO,
        }
    }

    /// `inflow - outflow`.
    pub fn net_change(&self) -> I256 {
        to_signed(self.total_inflow).saturating_sub(to_signed(self.total_outflow))
    }

    pub fn is_touched(&self) -> bool {
        !self.total_inflow.is_zero() || !self.total_outflow.is_zero()
    }
}

/// Convert an unsigned amount, saturating above `I256::MAX`.
pub fn to_signed(amount: U256) -> I256 {
    I256::try_from(amount).unwrap_or(I256::MAX)
}

/// Per-token positions of one actor over one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetPositions {
    positions: BTreeMap<Address, NetPosition>,
}

impl NetPositions {
    /// Aggregate flows for the controlled set and debit the transaction fee.
    ///
    /// # Arguments
    /// * `trace` - The transaction trace (source of the fee)
    /// * `controlled` - Addresses acting as the transaction's actor
    /// * `flows` - Flows extracted from the same trace
    ///
    /// # Returns
    /// Positions for every token with non-zero inflow or outflow. The native
    /// position is additionally debited with the transaction's own value and
    /// with `gasUsed * gasPrice`, on top of the per-call native flows.
    pub fn compute(
        trace: &TransactionTrace,
        controlled: &ControlledAddressSet,
        flows: &[TokenFlow],
    ) -> Self {
        let mut positions: BTreeMap<Address, NetPosition> = BTreeMap::new();

        for flow in flows {
            let from_controlled = controlled.contains(&flow.from);
            let to_controlled = controlled.contains(&flow.to);
            if !from_controlled && !to_controlled {
                continue;
            }
            let position = positions
                .entry(flow.token)
                .or_insert_with(|| NetPosition::empty(flow.token));
            // A transfer inside the set debits and credits alike and nets to zero
            if from_controlled {
                position.total_outflow = position.total_outflow.saturating_add(flow.amount);
            }
            if to_controlled {
                position.total_inflow = position.total_inflow.saturating_add(flow.amount);
            }
        }

        let charged = trace.value().saturating_add(trace.fee());
        if !charged.is_zero() {
            let native = positions
                .entry(NATIVE_TOKEN)
                .or_insert_with(|| NetPosition::empty(NATIVE_TOKEN));
            native.total_outflow = native.total_outflow.saturating_add(charged);
        }

        positions.retain(|_, p| p.is_touched());
        Self { positions }
    }

    pub fn get(&self, token: &Address) -> Option<&NetPosition> {
        self.positions.get(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetPosition> {
        self.positions.values()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Net change per token, skipping tokens that net to zero.
    pub fn net_changes(&self) -> BTreeMap<Address, I256> {
        self.positions
            .values()
            .map(|p| (p.token, p.net_change()))
            .filter(|(_, net)| !net.is_zero())
            .collect()
    }

    /// Token with the most negative net change.
    pub fn primary_asset_in(&self) -> Option<(Address, I256)> {
        primary_in(&self.net_changes())
    }

    /// Token with the most positive net change.
    pub fn primary_asset_out(&self) -> Option<(Address, I256)> {
        primary_out(&self.net_changes())
    }
}

/// Most negative entry; ties go to the lower address.
pub fn primary_in(net: &BTreeMap<Address, I256>) -> Option<(Address, I256)> {
    net.iter()
        .filter(|(_, v)| v.is_negative())
        .fold(None, |best: Option<(Address, I256)>, (token, value)| match best {
            Some((_, best_value)) if best_value <= *value => best,
            _ => Some((*token, *value)),
        })
}

/// Most positive entry; ties go to the lower address.
pub fn primary_out(net: &BTreeMap<Address, I256>) -> Option<(Address, I256)> {
    net.iter()
        .filter(|(_, v)| v.is_positive())
        .fold(None, |best: Option<(Address, I256)>, (token, value)| match best {
            Some((_, best_value)) if best_value >= *value => best,
            _ => Some((*token, *value)),
        })
}

/// Sum several per-token net maps, dropping tokens that cancel out.
pub fn combine_net_changes<'a, I>(maps: I) -> BTreeMap<Address, I256>
where
    I: IntoIterator<Item = &'a BTreeMap<Address, I256>>,
{
    let mut combined: BTreeMap<Address, I256> = BTreeMap::new();
    for map in maps {
        for (token, value) in map {
            let entry = combined.entry(*token).or_insert(I256::ZERO);
            *entry = entry.saturating_add(*value);
        }
    }
    combined.retain(|_, v| !v.is_zero());
    combined
}

/// Render a raw token amount with its decimals, e.g. `1,234.5 USDC`.
///
/// The whole part is grouped in thousands, the fraction keeps every
/// significant digit and is shown as `.0` when it is zero.
pub fn format_token_amount(amount: U256, decimals: u8, symbol: &str) -> String {
    let (whole, fraction) = match U256::from(10u64).checked_pow(U256::from(decimals)) {
        Some(scale) => (amount / scale, amount % scale),
        // Scale beyond 256 bits: the whole part is necessarily zero
        None => (U256::ZERO, amount),
    };

    let mut fraction_digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    while fraction_digits.ends_with('0') {
        fraction_digits.pop();
    }
    if fraction_digits.is_empty() {
        fraction_digits.push('0');
    }

    format!(
        "{}.{} {}",
        group_thousands(&whole.to_string()),
        fraction_digits,
        symbol
    )
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlled::{resolve_controlled, ResolutionMode};
    use crate::flows::extract_token_flows;
    use crate::flows::test_support::{addr, trace_with, transfer_event};
    use crate::model::CallFrame;
    use std::collections::BTreeSet;

    #[test]
    fn test_format_token_amount() {
        assert_eq!(format_token_amount(U256::from(1_000_000u64), 6, "USDC"), "1.0 USDC");
        assert_eq!(format_token_amount(U256::from(1_500_000u64), 6, "USDC"), "1.5 USDC");
        assert_eq!(
            format_token_amount(U256::from(1_234_567_890_000u64), 6, "USDC"),
            "1,234,567.89 USDC"
        );
        assert_eq!(format_token_amount(U256::from(1u64), 18, "ETH"), "0.000000000000000001 ETH");
        assert_eq!(format_token_amount(U256::ZERO, 18, "ETH"), "0.0 ETH");
        assert_eq!(format_token_amount(U256::from(42u64), 0, "NFT"), "42.0 NFT");
        assert_eq!(format_token_amount(U256::from(5u64), 200, "ODD"), format!("0.{}5 ODD", "0".repeat(199)));
    }

    #[test]
    fn test_format_is_exact_for_large_amounts() {
        // 10^30 + 1 wei at 18 decimals would lose the trailing unit in f64
        let amount = U256::from(10u64).pow(U256::from(30)) + U256::from(1u64);
        assert_eq!(
            format_token_amount(amount, 18, "WETH"),
            "1,000,000,000,000.000000000000000001 WETH"
        );
    }

    #[test]
    fn test_gas_is_always_debited() {
        let sender = addr(1);
        let mut t = trace_with(CallFrame::new(sender, addr(2), U256::ZERO), vec![]);
        t.gas_used = 21_000;
        t.gas_price = U256::from(30_000_000_000u64);

        let controlled = resolve_controlled(&t, ResolutionMode::FixedPoint);
        let flows = extract_token_flows(&t);
        let positions = NetPositions::compute(&t, &controlled, &flows);

        let native = positions.get(&NATIVE_TOKEN).unwrap();
        assert_eq!(native.total_outflow, t.fee());
        assert!(native.net_change() <= -to_signed(t.fee()));
    }

    #[test]
    fn test_transaction_value_is_debited() {
        let sender = addr(1);
        let bot = addr(2);
        let t = trace_with(CallFrame::new(sender, bot, U256::from(1_000u64)), vec![]);

        let controlled = resolve_controlled(&t, ResolutionMode::FixedPoint);
        let flows = extract_token_flows(&t);
        let positions = NetPositions::compute(&t, &controlled, &flows);

        let native = positions.get(&NATIVE_TOKEN).unwrap();
        assert_eq!(native.total_inflow, U256::from(1_000u64));
        assert_eq!(native.total_outflow, U256::from(2_000u64));
        assert_eq!(native.net_change(), I256::try_from(-1_000i64).unwrap());
        assert_eq!(positions.primary_asset_in(), Some((NATIVE_TOKEN, I256::try_from(-1_000i64).unwrap())));
    }

    #[test]
    fn test_internal_transfers_net_to_zero() {
        let sender = addr(1);
        let bot = addr(2);
        let pool = addr(3);
        let token_a = addr(0xa0);
        let token_b = addr(0xb0);

        let root = CallFrame::new(sender, bot, U256::from(100u64))
            .with_call(CallFrame::new(bot, pool, U256::from(40u64)));
        let t = trace_with(
            root,
            vec![
                transfer_event(token_a, bot, pool, 500),
                transfer_event(token_b, pool, bot, 900),
                transfer_event(token_b, bot, sender, 900),
            ],
        );
        let controlled = resolve_controlled(&t, ResolutionMode::FixedPoint);
        let flows = extract_token_flows(&t);
        let positions = NetPositions::compute(&t, &controlled, &flows);

        // The pool is called by the bot and so joins the set; token legs cancel
        assert!(controlled.contains(&pool));
        let net = positions.net_changes();
        assert_eq!(net.len(), 1);
        assert_eq!(net.get(&NATIVE_TOKEN), Some(&I256::try_from(-100i64).unwrap()));

        let only_sender_and_bot: ControlledAddressSet = [sender, bot].into_iter().collect();
        let positions = NetPositions::compute(&t, &only_sender_and_bot, &flows);
        assert_eq!(positions.get(&token_a).unwrap().net_change(), I256::try_from(-500i64).unwrap());
        assert_eq!(positions.get(&token_b).unwrap().net_change(), I256::try_from(900i64).unwrap());
        // Root value is charged once more on top of the 40 sent to the pool
        assert_eq!(positions.get(&NATIVE_TOKEN).unwrap().net_change(), I256::try_from(-140i64).unwrap());

        assert_eq!(positions.primary_asset_in().map(|(t, _)| t), Some(token_a));
        assert_eq!(positions.primary_asset_out().map(|(t, _)| t), Some(token_b));
    }

    #[test]
    fn test_net_positions_are_conserved_across_actors() {
        let token = addr(0xa0);
        let actors = [addr(1), addr(2), addr(3), addr(4)];
        // Deterministic pseudo-random flow sets
        for seed in 1u64..=25 {
            let mut events = Vec::new();
            let mut state = seed;
            for _ in 0..(seed % 7 + 1) {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let from = actors[(state >> 33) as usize % actors.len()];
                let to = actors[(state >> 13) as usize % actors.len()];
                events.push(transfer_event(token, from, to, (state % 1_000_000) as u128));
            }
            let t = trace_with(CallFrame::new(addr(9), addr(8), U256::ZERO), events);
            let flows = extract_token_flows(&t);

            let touched: BTreeSet<Address> = flows.iter().flat_map(|f| [f.from, f.to]).collect();
            let total = touched.iter().fold(I256::ZERO, |sum, actor| {
                let single: ControlledAddressSet = std::iter::once(*actor).collect();
                let net = NetPositions::compute(&t, &single, &flows)
                    .get(&token)
                    .map(|p| p.net_change())
                    .unwrap_or(I256::ZERO);
                sum + net
            });
            assert_eq!(total, I256::ZERO, "seed {seed}");
        }
    }

    #[test]
    fn test_combine_and_primary_assets() {
        let a = addr(0xa0);
        let b = addr(0xb0);
        let front = BTreeMap::from([(a, I256::try_from(-100i64).unwrap()), (b, I256::try_from(90i64).unwrap())]);
        let back = BTreeMap::from([(a, I256::try_from(110i64).unwrap()), (b, I256::try_from(-90i64).unwrap())]);

        let combined = combine_net_changes([&front, &back]);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined.get(&a), Some(&I256::try_from(10i64).unwrap()));
        assert_eq!(primary_out(&combined).map(|(t, _)| t), Some(a));
        assert!(primary_in(&combined).is_none());
    }
}
