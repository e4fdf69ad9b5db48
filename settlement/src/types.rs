//! Core types for balance computation and settlement planning
//!
//! All money amounts are exact decimals in major currency units
//! (e.g. `12.50` for twelve and a half). Signs follow one convention
//! throughout: positive means the member is owed money, negative means
//! the member owes money.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Group member identifier
///
/// Opaque to the engine. Ordering is plain lexicographic string order and
/// is what settlement planning uses to break ties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Create new member ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MemberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Member of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member ID
    pub id: MemberId,

    /// Display name (presentation only)
    #[serde(alias = "name")]
    pub display_name: String,
}

impl Member {
    /// Create new member
    pub fn new(id: impl Into<MemberId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Portion of an expense attributed to one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Member who owes this portion
    #[serde(alias = "user_id")]
    pub member_id: MemberId,

    /// Amount owed (never negative)
    #[serde(alias = "amount")]
    pub owed_amount: Decimal,
}

impl Split {
    /// Create new split
    pub fn new(member_id: impl Into<MemberId>, owed_amount: Decimal) -> Self {
        Self {
            member_id: member_id.into(),
            owed_amount,
        }
    }
}

/// Split payload of an expense
///
/// Persistence layers usually keep splits as a JSON blob next to the
/// expense row. `Raw` carries that blob untouched; it is decoded when
/// balances are computed, which is where a broken payload surfaces as
/// [`Error::MalformedSplitData`](crate::Error::MalformedSplitData).
///
/// Deserialization never fails on the payload itself: an inline value that
/// is not a valid split list is kept as `Raw` JSON text, so the error is
/// reported against its expense (and can be skipped by policy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SplitData {
    /// Splits already decoded by the caller
    Decoded(Vec<Split>),
    /// JSON-encoded array of splits
    Raw(String),
}

impl<'de> Deserialize<'de> for SplitData {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        Ok(match value {
            serde_json::Value::String(payload) => SplitData::Raw(payload),
            serde_json::Value::Array(_) => match serde_json::from_value::<Vec<Split>>(value.clone()) {
                Ok(splits) => SplitData::Decoded(splits),
                Err(_) => SplitData::Raw(value.to_string()),
            },
            other => SplitData::Raw(other.to_string()),
        })
    }
}

impl From<Vec<Split>> for SplitData {
    fn from(splits: Vec<Split>) -> Self {
        SplitData::Decoded(splits)
    }
}

/// Shared expense paid by one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID
    #[serde(alias = "id")]
    pub expense_id: String,

    /// Member who paid
    #[serde(alias = "paid_by")]
    pub payer_id: MemberId,

    /// Total amount paid (positive)
    #[serde(alias = "amount")]
    pub total_amount: Decimal,

    /// Per-member owed shares
    #[serde(alias = "split_data")]
    pub splits: SplitData,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Category (food, transport, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Expense {
    /// Create expense with decoded splits
    pub fn new(
        expense_id: impl Into<String>,
        payer_id: impl Into<MemberId>,
        total_amount: Decimal,
        splits: Vec<Split>,
    ) -> Self {
        Self {
            expense_id: expense_id.into(),
            payer_id: payer_id.into(),
            total_amount,
            splits: SplitData::Decoded(splits),
            description: None,
            category: None,
        }
    }

    /// Create expense whose splits are still a JSON payload
    pub fn with_raw_splits(
        expense_id: impl Into<String>,
        payer_id: impl Into<MemberId>,
        total_amount: Decimal,
        split_payload: impl Into<String>,
    ) -> Self {
        Self {
            expense_id: expense_id.into(),
            payer_id: payer_id.into(),
            total_amount,
            splits: SplitData::Raw(split_payload.into()),
            description: None,
            category: None,
        }
    }

    /// Attach a description
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Net position of a member within a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Member ID
    pub member_id: MemberId,

    /// Display name
    pub display_name: String,

    /// Net amount (positive = owed money, negative = owes money)
    pub net_amount: Decimal,
}

impl Balance {
    /// Zero balance for a member
    pub fn zero(member: &Member) -> Self {
        Self {
            member_id: member.id.clone(),
            display_name: member.display_name.clone(),
            net_amount: Decimal::ZERO,
        }
    }

    /// Owed more than `epsilon`
    pub fn is_creditor(&self, epsilon: Decimal) -> bool {
        self.net_amount > epsilon
    }

    /// Owes more than `epsilon`
    pub fn is_debtor(&self, epsilon: Decimal) -> bool {
        self.net_amount < -epsilon
    }

    /// Within `epsilon` of zero
    pub fn is_settled(&self, epsilon: Decimal) -> bool {
        self.net_amount.abs() <= epsilon
    }
}

/// Suggested payment between two members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTransaction {
    /// Member who pays (debtor)
    pub from_member_id: MemberId,

    /// Debtor display name
    pub from_name: String,

    /// Member who receives (creditor)
    pub to_member_id: MemberId,

    /// Creditor display name
    pub to_name: String,

    /// Amount to pay (positive)
    pub amount: Decimal,
}

/// Payment a member has already made to another member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedPayment {
    /// Payment ID
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,

    /// Member who paid
    #[serde(alias = "from_user")]
    pub from_member_id: MemberId,

    /// Member who received
    #[serde(alias = "to_user")]
    pub to_member_id: MemberId,

    /// Amount paid (positive)
    pub amount: Decimal,
}

impl RecordedPayment {
    /// Create new recorded payment
    pub fn new(
        from_member_id: impl Into<MemberId>,
        to_member_id: impl Into<MemberId>,
        amount: Decimal,
    ) -> Self {
        Self {
            payment_id: None,
            from_member_id: from_member_id.into(),
            to_member_id: to_member_id.into(),
            amount,
        }
    }

    /// Identifier used in diagnostics
    pub fn reference(&self) -> String {
        match &self.payment_id {
            Some(id) => id.clone(),
            None => format!("payment {} -> {}", self.from_member_id, self.to_member_id),
        }
    }
}

impl From<&SettlementTransaction> for RecordedPayment {
    fn from(tx: &SettlementTransaction) -> Self {
        Self::new(tx.from_member_id.clone(), tx.to_member_id.clone(), tx.amount)
    }
}

/// Where an unknown member id showed up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Expense payer
    Payer,
    /// Split line item
    Split,
    /// Sender of a recorded payment
    PaymentSender,
    /// Receiver of a recorded payment
    PaymentReceiver,
}

/// Diagnostic for a contribution dropped because its member is not in the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownMemberRef {
    /// Expense or payment the reference came from
    pub source_id: String,

    /// Unknown member ID
    pub member_id: MemberId,

    /// Role of the member in the source record
    pub role: MemberRole,

    /// Amount that was not attributed
    pub amount: Decimal,
}

/// Output of balance computation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// Balances keyed (and iterated) by member id
    pub balances: BTreeMap<MemberId, Balance>,

    /// Contributions dropped because of unknown members
    pub unknown_members: Vec<UnknownMemberRef>,

    /// Expenses skipped because their split data could not be decoded
    pub skipped_expenses: Vec<String>,

    /// Number of expenses applied to the balances
    #[serde(default)]
    pub applied_expenses: usize,

    /// Sum of the totals of applied expenses
    #[serde(default)]
    pub applied_total: Decimal,
}

impl BalanceSheet {
    /// Number of members
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// No members at all
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Balance of one member
    pub fn get(&self, member_id: &MemberId) -> Option<&Balance> {
        self.balances.get(member_id)
    }

    /// Net amount of one member, zero when unknown
    pub fn net_amount(&self, member_id: &MemberId) -> Decimal {
        self.get(member_id)
            .map(|b| b.net_amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of all net amounts
    ///
    /// Saturates at the `Decimal` range instead of overflowing.
    pub fn net_total(&self) -> Decimal {
        self.balances
            .values()
            .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.net_amount))
    }

    /// Whether every input contribution landed on a roster member
    pub fn is_complete(&self) -> bool {
        self.unknown_members.is_empty() && self.skipped_expenses.is_empty()
    }

    /// Balances in member-id order
    pub fn to_vec(&self) -> Vec<Balance> {
        self.balances.values().cloned().collect()
    }
}

/// Summary figures for a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementStats {
    /// Number of members
    pub member_count: usize,

    /// Number of expenses processed
    pub expense_count: usize,

    /// Sum of expense totals
    pub total_spent: Decimal,

    /// Sum of positive balances before settlement
    pub total_outstanding: Decimal,

    /// Number of suggested payments
    pub transaction_count: usize,

    /// Sum of absolute balances left after the suggested payments
    pub residual: Decimal,
}

/// Everything the persistence collaborator knows about a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    /// Group ID
    #[serde(alias = "id")]
    pub group_id: String,

    /// Member roster
    pub members: Vec<Member>,

    /// Expenses
    #[serde(default)]
    pub expenses: Vec<Expense>,

    /// Settlement payments already made
    #[serde(default, alias = "settlements")]
    pub payments: Vec<RecordedPayment>,
}

/// Balances plus suggested payments for a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group ID
    pub group_id: String,

    /// Balances in member-id order
    pub balances: Vec<Balance>,

    /// Suggested payments, in the order they were planned
    pub settlements: Vec<SettlementTransaction>,

    /// Summary figures
    pub stats: SettlementStats,

    /// Contributions dropped because of unknown members
    pub unknown_members: Vec<UnknownMemberRef>,

    /// Expenses skipped because of undecodable split data
    pub skipped_expenses: Vec<String>,

    /// Computation timestamp
    pub computed_at: DateTime<Utc>,
}
