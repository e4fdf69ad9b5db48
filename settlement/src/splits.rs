//! Split payload decoding and split construction helpers
//!
//! The balance calculator only ever calls [`SplitData::decode`]. The
//! other helpers are for the collaborators that build expenses:
//! [`equal_split`] divides a total evenly down to the minor currency unit,
//! and [`validate_split_sum`] lets ingestion refuse splits that do not add
//! up to the expense total. The calculator itself never re-validates sums.

use crate::{
    types::{Expense, MemberId, Split, SplitData},
    Error, Result,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// Largest number of decimal places a `Decimal` can hold
pub const MAX_SCALE: u32 = 28;

impl SplitData {
    /// Decode the split list of `expense_id`
    ///
    /// A `null` payload decodes to no splits. Any split with a negative
    /// owed amount makes the whole payload malformed.
    pub fn decode(&self, expense_id: &str) -> Result<Cow<'_, [Split]>> {
        let splits = match self {
            SplitData::Decoded(splits) => Cow::Borrowed(splits.as_slice()),
            SplitData::Raw(payload) => {
                let decoded: Option<Vec<Split>> =
                    serde_json::from_str(payload).map_err(|e| Error::MalformedSplitData {
                        expense_id: expense_id.to_string(),
                        reason: e.to_string(),
                    })?;
                Cow::Owned(decoded.unwrap_or_default())
            }
        };

        if let Some(split) = splits.iter().find(|s| s.owed_amount < Decimal::ZERO) {
            return Err(Error::MalformedSplitData {
                expense_id: expense_id.to_string(),
                reason: format!(
                    "negative owed amount {} for member {}",
                    split.owed_amount, split.member_id
                ),
            });
        }

        Ok(splits)
    }

    /// Encode as the JSON payload stored next to an expense
    pub fn encode(&self) -> Result<String> {
        match self {
            SplitData::Decoded(splits) => Ok(serde_json::to_string(splits)?),
            SplitData::Raw(payload) => Ok(payload.clone()),
        }
    }
}

impl Expense {
    /// Sum of owed amounts across all splits
    pub fn split_total(&self) -> Result<Decimal> {
        self.splits
            .decode(&self.expense_id)?
            .iter()
            .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s.owed_amount))
            .ok_or_else(|| {
                Error::InvalidAmount(format!("split total of expense {} overflows", self.expense_id))
            })
    }
}

/// Split `total` evenly between `member_ids`
///
/// Amounts are rounded down to `scale` decimal places; the leftover minor
/// units go one each to members in id order, so the result always sums
/// to `total` (itself rounded to `scale`). Duplicate ids are collapsed and
/// the output is in id order. `scale` above [`MAX_SCALE`] is an error.
///
/// [`SettlementEngine::equal_split`](crate::SettlementEngine::equal_split)
/// applies the configured currency scale.
pub fn equal_split(total: Decimal, member_ids: &[MemberId], scale: u32) -> Result<Vec<Split>> {
    if scale > MAX_SCALE {
        return Err(Error::InvalidAmount(format!(
            "cannot round to {} decimal places (at most {})",
            scale, MAX_SCALE
        )));
    }

    if total < Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "cannot split negative total {}",
            total
        )));
    }

    let members: BTreeSet<&MemberId> = member_ids.iter().collect();
    if members.is_empty() {
        return Ok(Vec::new());
    }

    let total = total.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven);
    let count = Decimal::from(members.len());
    let unit = Decimal::new(1, scale);

    let share = (total / count).round_dp_with_strategy(scale, RoundingStrategy::ToZero);
    let leftover_units = ((total - share * count) / unit)
        .round()
        .to_usize()
        .ok_or_else(|| Error::InvalidAmount(format!("cannot split {} evenly", total)))?;

    Ok(members
        .into_iter()
        .enumerate()
        .map(|(i, member_id)| {
            let owed_amount = if i < leftover_units { share + unit } else { share };
            Split::new(member_id.clone(), owed_amount)
        })
        .collect())
}

/// Check that an expense's splits add up to its total within `epsilon`
pub fn validate_split_sum(expense: &Expense, epsilon: Decimal) -> Result<()> {
    let split_total = expense.split_total()?;

    if (split_total - expense.total_amount).abs() > epsilon {
        return Err(Error::SplitSumMismatch {
            expense_id: expense.expense_id.clone(),
            total: expense.total_amount,
            split_total,
        });
    }

    Ok(())
}
