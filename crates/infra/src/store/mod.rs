//! Storage boundary for parts, ledger entries, and requirements.
//!
//! This module defines infrastructure-facing abstractions for persisting the
//! inventory records without making any storage assumptions. A relational
//! backend is assumed in production; the in-memory implementations serve
//! tests and dev.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryInventoryStore, InMemoryRequirementStore};
pub use r#trait::{InventoryStore, RequirementStore, StoreError};
