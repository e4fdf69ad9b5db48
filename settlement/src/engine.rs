//! Main settlement engine
//!
//! Runs the balance → settlement pipeline for one group snapshot.

use crate::{
    balances::BalanceCalculator,
    config::Config,
    netting::{self, SettlementPlanner},
    splits,
    types::*,
    Result,
};
use rust_decimal::Decimal;

/// Settlement engine
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    /// Balance calculator
    calculator: BalanceCalculator,

    /// Settlement planner
    planner: SettlementPlanner,

    /// Configuration
    config: Config,
}

impl SettlementEngine {
    /// Create new settlement engine
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            calculator: BalanceCalculator::new(&config),
            planner: SettlementPlanner::new(&config),
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Split `total` evenly between `member_ids` at the configured currency scale
    pub fn equal_split(&self, total: Decimal, member_ids: &[MemberId]) -> Result<Vec<Split>> {
        splits::equal_split(total, member_ids, self.config.currency_scale)
    }

    /// Current balances of a group, recorded payments included
    pub fn balances(&self, snapshot: &GroupSnapshot) -> Result<BalanceSheet> {
        let mut sheet = self
            .calculator
            .compute_balances(&snapshot.members, &snapshot.expenses)?;
        self.calculator.apply_payments(&mut sheet, &snapshot.payments)?;
        Ok(sheet)
    }

    /// Suggested payments for a group
    pub fn settlements(&self, snapshot: &GroupSnapshot) -> Result<Vec<SettlementTransaction>> {
        let sheet = self.balances(snapshot)?;
        Ok(self.planner.plan_settlements(&sheet.to_vec()))
    }

    /// Balances, suggested payments and summary figures for a group
    pub fn summarize(&self, snapshot: &GroupSnapshot) -> Result<GroupSummary> {
        tracing::info!(
            "Summarizing group {}: {} members, {} expenses, {} payments",
            snapshot.group_id,
            snapshot.members.len(),
            snapshot.expenses.len(),
            snapshot.payments.len()
        );

        let sheet = self.balances(snapshot)?;
        self.check_zero_sum(&snapshot.group_id, &sheet);

        let balances = sheet.to_vec();
        let settlements = self.planner.plan_settlements(&balances);
        let remaining = netting::apply_transfers(&balances, &settlements);

        let stats = SettlementStats {
            member_count: balances.len(),
            expense_count: sheet.applied_expenses,
            total_spent: sheet.applied_total,
            total_outstanding: balances
                .iter()
                .filter(|b| b.net_amount > Decimal::ZERO)
                .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.net_amount)),
            transaction_count: settlements.len(),
            residual: netting::residual(&remaining),
        };

        tracing::info!(
            "Group {} settles with {} payments ({} outstanding)",
            snapshot.group_id,
            stats.transaction_count,
            stats.total_outstanding
        );

        Ok(GroupSummary {
            group_id: snapshot.group_id.clone(),
            balances,
            settlements,
            stats,
            unknown_members: sheet.unknown_members,
            skipped_expenses: sheet.skipped_expenses,
            computed_at: chrono::Utc::now(),
        })
    }

    /// Log when balances do not net to zero
    fn check_zero_sum(&self, group_id: &str, sheet: &BalanceSheet) {
        let total = sheet.net_total();
        if total.abs() <= self.config.epsilon {
            return;
        }

        if sheet.is_complete() {
            tracing::warn!(
                "Balances of group {} net to {} instead of zero; expense splits do not match their totals",
                group_id,
                total
            );
        } else {
            tracing::warn!(
                "Balances of group {} net to {} after dropping {} unknown member references and {} expenses",
                group_id,
                total,
                sheet.unknown_members.len(),
                sheet.skipped_expenses.len()
            );
        }
    }
}
