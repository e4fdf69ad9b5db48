//! Balance computation
//!
//! Aggregates a group's expenses into one net balance per member.
//!
//! # Algorithm
//!
//! 1. Start every roster member at zero
//! 2. For each expense, credit the payer with the expense total
//! 3. Debit every split member with their owed amount
//!
//! # Example
//!
//! ```text
//! Expense: A pays $90, split A $30, B $30, C $30
//!
//! Balances:
//!   A: +$90 - $30 = +$60 (owed money)
//!   B: -$30
//!   C: -$30
//! ```
//!
//! Contributions naming a member outside the roster are dropped (with a
//! diagnostic) or rejected, depending on [`UnknownMemberPolicy`]. Expenses
//! whose split payload cannot be decoded fail the computation unless
//! [`MalformedSplitPolicy::Skip`] is configured.

use crate::{
    config::{Config, MalformedSplitPolicy, UnknownMemberPolicy},
    types::*,
    Error, Result,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Balance calculator
#[derive(Debug, Clone)]
pub struct BalanceCalculator {
    /// Unknown member handling
    unknown_member_policy: UnknownMemberPolicy,

    /// Malformed split handling
    malformed_split_policy: MalformedSplitPolicy,
}

impl BalanceCalculator {
    /// Create new balance calculator
    pub fn new(config: &Config) -> Self {
        Self {
            unknown_member_policy: config.unknown_member_policy,
            malformed_split_policy: config.malformed_split_policy,
        }
    }

    /// Compute net balances for `members` from `expenses`
    pub fn compute_balances(&self, members: &[Member], expenses: &[Expense]) -> Result<BalanceSheet> {
        let mut sheet = BalanceSheet {
            balances: self.initial_balances(members),
            ..Default::default()
        };

        for expense in expenses {
            self.apply_expense(&mut sheet, expense)?;
        }

        debug!(
            "Computed {} balances from {} expenses ({} unknown member references, {} skipped)",
            sheet.len(),
            expenses.len(),
            sheet.unknown_members.len(),
            sheet.skipped_expenses.len()
        );

        Ok(sheet)
    }

    /// Apply payments members already made to each other
    ///
    /// The sender moves up by `amount`, the receiver down by `amount`.
    pub fn apply_payments(&self, sheet: &mut BalanceSheet, payments: &[RecordedPayment]) -> Result<()> {
        for payment in payments {
            if payment.amount <= Decimal::ZERO {
                return Err(Error::InvalidAmount(format!(
                    "{} has non-positive amount {}",
                    payment.reference(),
                    payment.amount
                )));
            }

            let source_id = payment.reference();
            if self.unknown_member_policy == UnknownMemberPolicy::Reject {
                for member_id in [&payment.from_member_id, &payment.to_member_id] {
                    if !sheet.balances.contains_key(member_id) {
                        return Err(Error::UnknownGroupMember {
                            expense_id: source_id,
                            member_id: member_id.clone(),
                        });
                    }
                }
            }

            self.post(
                sheet,
                &source_id,
                &payment.from_member_id,
                MemberRole::PaymentSender,
                payment.amount,
            )?;
            self.post(
                sheet,
                &source_id,
                &payment.to_member_id,
                MemberRole::PaymentReceiver,
                -payment.amount,
            )?;
        }

        Ok(())
    }

    /// One zero balance per distinct member id, first occurrence wins
    fn initial_balances(&self, members: &[Member]) -> BTreeMap<MemberId, Balance> {
        let mut balances = BTreeMap::new();

        for member in members {
            if balances.contains_key(&member.id) {
                debug!("Ignoring duplicate roster entry for member {}", member.id);
                continue;
            }
            balances.insert(member.id.clone(), Balance::zero(member));
        }

        balances
    }

    fn apply_expense(&self, sheet: &mut BalanceSheet, expense: &Expense) -> Result<()> {
        if expense.total_amount <= Decimal::ZERO {
            return Err(Error::InvalidExpense {
                expense_id: expense.expense_id.clone(),
                reason: format!("total amount {} is not positive", expense.total_amount),
            });
        }

        let splits = match expense.splits.decode(&expense.expense_id) {
            Ok(splits) => splits,
            Err(err) => match self.malformed_split_policy {
                MalformedSplitPolicy::Reject => return Err(err),
                MalformedSplitPolicy::Skip => {
                    warn!("Skipping expense {}: {}", expense.expense_id, err);
                    sheet.skipped_expenses.push(expense.expense_id.clone());
                    return Ok(());
                }
            },
        };

        // Validate every reference before touching the sheet so a rejected
        // expense leaves no partial contribution behind.
        if self.unknown_member_policy == UnknownMemberPolicy::Reject {
            let unknown = std::iter::once(&expense.payer_id)
                .chain(splits.iter().map(|s| &s.member_id))
                .find(|id| !sheet.balances.contains_key(*id));

            if let Some(member_id) = unknown {
                return Err(Error::UnknownGroupMember {
                    expense_id: expense.expense_id.clone(),
                    member_id: member_id.clone(),
                });
            }
        }

        self.post(
            sheet,
            &expense.expense_id,
            &expense.payer_id,
            MemberRole::Payer,
            expense.total_amount,
        )?;

        for split in splits.iter() {
            self.post(
                sheet,
                &expense.expense_id,
                &split.member_id,
                MemberRole::Split,
                -split.owed_amount,
            )?;
        }

        sheet.applied_expenses += 1;
        sheet.applied_total = sheet
            .applied_total
            .checked_add(expense.total_amount)
            .ok_or_else(|| {
                Error::InvalidAmount(format!(
                    "total spent overflows when applying {}",
                    expense.expense_id
                ))
            })?;

        Ok(())
    }

    /// Add `delta` to a member's balance, or handle the unknown member
    fn post(
        &self,
        sheet: &mut BalanceSheet,
        source_id: &str,
        member_id: &MemberId,
        role: MemberRole,
        delta: Decimal,
    ) -> Result<()> {
        if let Some(balance) = sheet.balances.get_mut(member_id) {
            balance.net_amount = balance.net_amount.checked_add(delta).ok_or_else(|| {
                Error::InvalidAmount(format!(
                    "balance of member {} overflows when applying {}",
                    member_id, source_id
                ))
            })?;
            return Ok(());
        }

        match self.unknown_member_policy {
            UnknownMemberPolicy::Reject => Err(Error::UnknownGroupMember {
                expense_id: source_id.to_string(),
                member_id: member_id.clone(),
            }),
            UnknownMemberPolicy::Warn => {
                warn!(
                    "Dropping {} from {}: member {} ({:?}) is not in the group",
                    delta.abs(),
                    source_id,
                    member_id,
                    role
                );
                sheet.unknown_members.push(UnknownMemberRef {
                    source_id: source_id.to_string(),
                    member_id: member_id.clone(),
                    role,
                    amount: delta.abs(),
                });
                Ok(())
            }
        }
    }
}

impl Default for BalanceCalculator {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
