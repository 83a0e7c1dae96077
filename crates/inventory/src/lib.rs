//! `pitstock-inventory` — parts inventory domain.
//!
//! A [`Part`] is a stock-quantity record. Its quantity only ever changes
//! through the mutation service in `pitstock-infra`, which pairs every change
//! with exactly one immutable [`PartTransaction`] ledger entry.

pub mod approval;
pub mod part;
pub mod transaction;

pub use approval::{ApprovalPolicy, ThresholdApprovalPolicy};
pub use part::{Part, PartCategory, PartDraft};
pub use transaction::{PartTransaction, TransactionContext, TransactionType};
