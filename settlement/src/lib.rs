//! Group Settlement Engine
//!
//! Computes who owes whom inside a group of people sharing expenses, and
//! which payments clear those debts.
//!
//! # Architecture

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]
//!
//! Two pure stages, composed in a fixed pipeline:
//!
//! 1. **Balances**: aggregate expenses (payer credit, split debits) into one
//!    net balance per member
//! 2. **Settlement**: greedily match the largest creditor with the largest
//!    debtor until every balance is within ε of zero
//!
//! Neither stage performs I/O or keeps state between calls, so independent
//! groups can be processed on any number of threads.
//!
//! # Invariants
//!
//! - Zero sum: with a complete roster and consistent splits, Σ(balances) == 0
//! - Bounded plan: `n` members never need more than `n - 1` payments
//! - Deterministic output: ties always go to the smallest member id
//!
//! # Example
//!
//! ```
//! use group_settlement::{BalanceCalculator, Config, Expense, Member, SettlementPlanner, Split};
//! use rust_decimal::Decimal;
//!
//! # fn main() -> group_settlement::Result<()> {
//! let config = Config::default();
//! let members = vec![Member::new("a", "Alice"), Member::new("b", "Bob"), Member::new("c", "Carol")];
//! let expenses = vec![Expense::new(
//!     "dinner",
//!     "a",
//!     Decimal::new(90, 0),
//!     vec![
//!         Split::new("a", Decimal::new(30, 0)),
//!         Split::new("b", Decimal::new(30, 0)),
//!         Split::new("c", Decimal::new(30, 0)),
//!     ],
//! )];
//!
//! let sheet = BalanceCalculator::new(&config).compute_balances(&members, &expenses)?;
//! let payments = SettlementPlanner::new(&config).plan_settlements(&sheet.to_vec());
//!
//! assert_eq!(payments.len(), 2);
//! assert_eq!(payments[0].amount, Decimal::new(30, 0));
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations, clippy::all)]

pub mod types;
pub mod splits;
pub mod balances;
pub mod netting;
pub mod error;
pub mod config;
pub mod engine;

// Re-exports
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, MalformedSplitPolicy, UnknownMemberPolicy};
pub use balances::BalanceCalculator;
pub use netting::SettlementPlanner;
pub use engine::SettlementEngine;
