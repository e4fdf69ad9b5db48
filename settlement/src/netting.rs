//! Settlement planning
//!
//! Greedy minimum-cash-flow heuristic: repeatedly settle the largest
//! creditor against the largest debtor until every balance is within
//! tolerance of zero.
//!
//! # Algorithm
//!
//! 1. Take a working copy of the balances, ordered by member id
//! 2. Pick the top creditor and the top debtor (ties → smallest member id)
//! 3. Transfer `min(credit, -debt)` from the debtor to the creditor
//! 4. Repeat while both sides exceed ε, at most `n - 1` times
//!
//! # Example
//!
//! ```text
//! Balances:
//!   A: +$300
//!   B: -$100
//!   C: -$200
//!
//! Transfers:
//!   C pays A: $200
//!   B pays A: $100
//! ```
//!
//! Each step zeroes at least one of the two balances involved, so `n`
//! members never need more than `n - 1` transfers. The result is not
//! guaranteed to use the fewest transfers possible.

use crate::{config::Config, types::*};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Settlement planner
#[derive(Debug, Clone)]
pub struct SettlementPlanner {
    /// Amounts within this tolerance of zero count as settled
    epsilon: Decimal,
}

impl SettlementPlanner {
    /// Create new settlement planner
    pub fn new(config: &Config) -> Self {
        Self::with_epsilon(config.epsilon)
    }

    /// Create planner with an explicit tolerance
    pub fn with_epsilon(epsilon: Decimal) -> Self {
        Self {
            epsilon: epsilon.abs(),
        }
    }

    /// Tolerance in use
    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    /// Plan the payments that clear `balances`
    ///
    /// `balances` is left untouched. Output order is fully determined by
    /// the input values, never by the input order.
    pub fn plan_settlements(&self, balances: &[Balance]) -> Vec<SettlementTransaction> {
        let mut positions = working_copy(balances);
        let max_transfers = positions.len().saturating_sub(1);
        let mut transfers = Vec::with_capacity(max_transfers);

        while transfers.len() < max_transfers {
            let (Some(creditor), Some(debtor)) = (top_creditor(&positions), top_debtor(&positions))
            else {
                break;
            };

            let credit = positions[creditor].net_amount;
            let debt = positions[debtor].net_amount;

            if credit <= self.epsilon || debt >= -self.epsilon {
                break;
            }

            let amount = credit.min(-debt);

            transfers.push(SettlementTransaction {
                from_member_id: positions[debtor].member_id.clone(),
                from_name: positions[debtor].display_name.clone(),
                to_member_id: positions[creditor].member_id.clone(),
                to_name: positions[creditor].display_name.clone(),
                amount,
            });

            positions[creditor].net_amount -= amount;
            positions[debtor].net_amount += amount;
        }

        let unsettled = positions
            .iter()
            .filter(|p| !p.is_settled(self.epsilon))
            .count();

        if unsettled > 0 {
            warn!(
                "Settlement plan leaves {} of {} balances unsettled (input does not net to zero)",
                unsettled,
                positions.len()
            );
        }

        debug!(
            "Planned {} transfers for {} balances",
            transfers.len(),
            positions.len()
        );

        transfers
    }
}

impl Default for SettlementPlanner {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Apply transfers to a copy of `balances`
///
/// The payer of each transfer moves up by its amount and the receiver down.
/// Transfers naming members absent from `balances` are ignored. Amounts
/// saturate at the `Decimal` range.
pub fn apply_transfers(balances: &[Balance], transfers: &[SettlementTransaction]) -> Vec<Balance> {
    let mut positions = working_copy(balances);
    let index: BTreeMap<MemberId, usize> = positions
        .iter()
        .enumerate()
        .map(|(i, p)| (p.member_id.clone(), i))
        .collect();

    for transfer in transfers {
        if let Some(&from) = index.get(&transfer.from_member_id) {
            positions[from].net_amount = positions[from].net_amount.saturating_add(transfer.amount);
        }
        if let Some(&to) = index.get(&transfer.to_member_id) {
            positions[to].net_amount = positions[to].net_amount.saturating_sub(transfer.amount);
        }
    }

    positions
}

/// Sum of absolute balances
pub fn residual(balances: &[Balance]) -> Decimal {
    balances
        .iter()
        .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.net_amount.abs()))
}

/// Balances merged per member and ordered by member id
///
/// Duplicate entries whose sum leaves the `Decimal` range saturate.
fn working_copy(balances: &[Balance]) -> Vec<Balance> {
    let mut merged: BTreeMap<MemberId, Balance> = BTreeMap::new();

    for balance in balances {
        merged
            .entry(balance.member_id.clone())
            .and_modify(|b| {
                b.net_amount = b.net_amount.checked_add(balance.net_amount).unwrap_or_else(|| {
                    warn!("Merged balance of member {} saturates", balance.member_id);
                    b.net_amount.saturating_add(balance.net_amount)
                })
            })
            .or_insert_with(|| balance.clone());
    }

    merged.into_values().collect()
}

/// Index of the largest balance; the first (smallest id) wins ties
fn top_creditor(positions: &[Balance]) -> Option<usize> {
    let mut best: Option<usize> = None;

    for (i, position) in positions.iter().enumerate() {
        match best {
            Some(b) if positions[b].net_amount >= position.net_amount => {}
            _ => best = Some(i),
        }
    }

    best
}

/// Index of the most negative balance; the first (smallest id) wins ties
fn top_debtor(positions: &[Balance]) -> Option<usize> {
    let mut best: Option<usize> = None;

    for (i, position) in positions.iter().enumerate() {
        match best {
            Some(b) if positions[b].net_amount <= position.net_amount => {}
            _ => best = Some(i),
        }
    }

    best
}
