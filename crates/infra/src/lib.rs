//! Infrastructure layer: storage seams and the inventory services.
//!
//! Stores are injected into services through constructors; there is no global
//! registry. The in-memory implementations back tests and dev setups; a
//! relational backend implements the same traits in production.

pub mod services;
pub mod store;


pub use services::{
    BulkApprovalOutcome, FulfillmentService, LedgerService, PartNeed, PartService,
    UnfulfilledRequirement,
};
pub use store::{
    InMemoryInventoryStore, InMemoryRequirementStore, InventoryStore, RequirementStore, StoreError,
};
