//! Error types for balance computation and settlement planning

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::MemberId;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Expense or payment references a member outside the roster
    #[error("Unknown group member {member_id} referenced by {expense_id}")]
    UnknownGroupMember {
        /// Expense (or payment) holding the reference
        expense_id: String,
        /// Member id not present in the roster
        member_id: MemberId,
    },

    /// Split payload of an expense could not be decoded
    #[error("Malformed split data in expense {expense_id}: {reason}")]
    MalformedSplitData {
        /// Offending expense
        expense_id: String,
        /// Decoder message
        reason: String,
    },

    /// Expense failed basic validation
    #[error("Invalid expense {expense_id}: {reason}")]
    InvalidExpense {
        /// Offending expense
        expense_id: String,
        /// What was wrong with it
        reason: String,
    },

    /// Amount outside its allowed range (negative total, non-positive payment, ...)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Splits do not add up to the expense total
    #[error("Split total {split_total} does not match expense {expense_id} total {total}")]
    SplitSumMismatch {
        /// Offending expense
        expense_id: String,
        /// Expense total amount
        total: Decimal,
        /// Sum of owed amounts across splits
        split_total: Decimal,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Expense id the error is attached to, if any
    pub fn expense_id(&self) -> Option<&str> {
        match self {
            Error::UnknownGroupMember { expense_id, .. }
            | Error::MalformedSplitData { expense_id, .. }
            | Error::InvalidExpense { expense_id, .. }
            | Error::SplitSumMismatch { expense_id, .. } => Some(expense_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_split_message_names_expense() {
        let err = Error::MalformedSplitData {
            expense_id: "exp-7".to_string(),
            reason: "expected value at line 1 column 1".to_string(),
        };

        assert_eq!(err.expense_id(), Some("exp-7"));
        assert!(err.to_string().contains("exp-7"));
    }

    #[test]
    fn test_config_error_has_no_expense() {
        let err = Error::Config("epsilon must be positive".to_string());
        assert_eq!(err.expense_id(), None);
    }
}
