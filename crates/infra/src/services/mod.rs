//! Application services over the storage seams.
//!
//! [`PartService`] is the only path that changes stock; [`LedgerService`]
//! owns ledger entries and approval; [`FulfillmentService`] evaluates
//! template requirements against live stock.

pub mod fulfillment;
pub mod ledger;
pub mod parts;

pub use fulfillment::{FulfillmentService, PartNeed, UnfulfilledRequirement};
pub use ledger::{BulkApprovalOutcome, LedgerService};
pub use parts::PartService;
