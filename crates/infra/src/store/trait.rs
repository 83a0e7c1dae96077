use std::sync::Arc;

use thiserror::Error;

use pitstock_core::{
    ExpectedVersion, PartId, ProjectTemplateId, RequirementId, TaskTemplateId, TransactionId,
};
use pitstock_inventory::{Part, PartTransaction};
use pitstock_planning::PartRequirement;

/// Storage operation error.
///
/// These are infrastructure failures (duplicates, stale versions, backend
/// trouble) as opposed to domain errors. Services translate them into the
/// domain taxonomy at their boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("record not found")]
    NotFound,

    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for pitstock_core::DomainError {
    fn from(value: StoreError) -> Self {
        use pitstock_core::DomainError;
        match value {
            StoreError::Concurrency(msg) => DomainError::Conflict(msg),
            StoreError::Duplicate(msg) => DomainError::Conflict(msg),
            StoreError::NotFound => DomainError::NotFound,
            StoreError::InvalidCommit(msg) => DomainError::Storage(msg),
            StoreError::Unavailable(msg) => DomainError::Storage(msg),
        }
    }
}

/// Persistence seam for parts and their append-only ledger.
///
/// ## Versioning
///
/// Every stored Part carries a version the store assigns: 1 on insert, +1 on
/// each committed update. Writes take an [`ExpectedVersion`]; a mismatch is a
/// `Concurrency` error and nothing is written. This is what serializes the
/// read-validate-write cycle per part (no long-lived locks).
///
/// ## Atomicity
///
/// `commit_mutation` persists the updated part row and its ledger entry as
/// one unit: both succeed or neither is observable. `insert_part` gives the
/// same guarantee for a new part and its optional initial-stock entry.
///
/// ## Read resilience
///
/// Collection-shaped reads return empty collections on internal failure so
/// dashboard-style consumers stay up; keyed reads and all writes report
/// errors.
pub trait InventoryStore: Send + Sync {
    /// Insert a new part, optionally together with its initial-stock ledger
    /// entry. Rejects a duplicate part number (active or inactive) with
    /// `Duplicate`.
    fn insert_part(
        &self,
        part: Part,
        initial_entry: Option<PartTransaction>,
    ) -> Result<Part, StoreError>;

    fn part(&self, id: PartId) -> Result<Option<Part>, StoreError>;

    fn part_by_number(&self, part_number: &str) -> Result<Option<Part>, StoreError>;

    fn parts(&self) -> Vec<Part>;

    /// Persist a part row (metadata or soft-delete changes) under an
    /// optimistic version check. Returns the stored copy with its new
    /// version.
    fn update_part(&self, part: Part, expected: ExpectedVersion) -> Result<Part, StoreError>;

    /// Hard-delete a part row. Callers own the referential-integrity guard.
    fn remove_part(&self, id: PartId) -> Result<(), StoreError>;

    /// Atomically persist a mutated part row and the ledger entry recording
    /// the mutation. The entry must reference the part and carry
    /// `balance_after` equal to the part's new quantity on hand.
    fn commit_mutation(
        &self,
        part: Part,
        expected: ExpectedVersion,
        entry: PartTransaction,
    ) -> Result<(Part, PartTransaction), StoreError>;

    fn transaction(&self, id: TransactionId) -> Result<Option<PartTransaction>, StoreError>;

    /// All ledger entries in commit order.
    fn transactions(&self) -> Vec<PartTransaction>;

    /// Ledger entries for one part in commit order.
    fn transactions_for_part(&self, part_id: PartId) -> Vec<PartTransaction>;

    /// Persist approval-state changes on an entry. Everything but the
    /// approval fields is immutable; a change elsewhere is an
    /// `InvalidCommit`.
    fn update_transaction(&self, entry: PartTransaction) -> Result<PartTransaction, StoreError>;

    /// Administrative removal of a ledger entry. Not part of normal
    /// operation; implementations log it loudly.
    fn remove_transaction(&self, id: TransactionId) -> Result<(), StoreError>;

    fn count_transactions_for_part(&self, part_id: PartId) -> usize;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn insert_part(
        &self,
        part: Part,
        initial_entry: Option<PartTransaction>,
    ) -> Result<Part, StoreError> {
        (**self).insert_part(part, initial_entry)
    }

    fn part(&self, id: PartId) -> Result<Option<Part>, StoreError> {
        (**self).part(id)
    }

    fn part_by_number(&self, part_number: &str) -> Result<Option<Part>, StoreError> {
        (**self).part_by_number(part_number)
    }

    fn parts(&self) -> Vec<Part> {
        (**self).parts()
    }

    fn update_part(&self, part: Part, expected: ExpectedVersion) -> Result<Part, StoreError> {
        (**self).update_part(part, expected)
    }

    fn remove_part(&self, id: PartId) -> Result<(), StoreError> {
        (**self).remove_part(id)
    }

    fn commit_mutation(
        &self,
        part: Part,
        expected: ExpectedVersion,
        entry: PartTransaction,
    ) -> Result<(Part, PartTransaction), StoreError> {
        (**self).commit_mutation(part, expected, entry)
    }

    fn transaction(&self, id: TransactionId) -> Result<Option<PartTransaction>, StoreError> {
        (**self).transaction(id)
    }

    fn transactions(&self) -> Vec<PartTransaction> {
        (**self).transactions()
    }

    fn transactions_for_part(&self, part_id: PartId) -> Vec<PartTransaction> {
        (**self).transactions_for_part(part_id)
    }

    fn update_transaction(&self, entry: PartTransaction) -> Result<PartTransaction, StoreError> {
        (**self).update_transaction(entry)
    }

    fn remove_transaction(&self, id: TransactionId) -> Result<(), StoreError> {
        (**self).remove_transaction(id)
    }

    fn count_transactions_for_part(&self, part_id: PartId) -> usize {
        (**self).count_transactions_for_part(part_id)
    }
}

/// Persistence seam for template part requirements.
///
/// Requirements are authored alongside planning templates and read by the
/// fulfillment engine; there is no versioning pressure on them.
pub trait RequirementStore: Send + Sync {
    fn insert(&self, requirement: PartRequirement) -> Result<PartRequirement, StoreError>;

    fn requirement(&self, id: RequirementId) -> Result<Option<PartRequirement>, StoreError>;

    fn update(&self, requirement: PartRequirement) -> Result<PartRequirement, StoreError>;

    fn remove(&self, id: RequirementId) -> Result<(), StoreError>;

    fn for_project_template(&self, template_id: ProjectTemplateId) -> Vec<PartRequirement>;

    fn for_task_template(&self, template_id: TaskTemplateId) -> Vec<PartRequirement>;

    fn for_part(&self, part_id: PartId) -> Vec<PartRequirement>;
}

impl<S> RequirementStore for Arc<S>
where
    S: RequirementStore + ?Sized,
{
    fn insert(&self, requirement: PartRequirement) -> Result<PartRequirement, StoreError> {
        (**self).insert(requirement)
    }

    fn requirement(&self, id: RequirementId) -> Result<Option<PartRequirement>, StoreError> {
        (**self).requirement(id)
    }

    fn update(&self, requirement: PartRequirement) -> Result<PartRequirement, StoreError> {
        (**self).update(requirement)
    }

    fn remove(&self, id: RequirementId) -> Result<(), StoreError> {
        (**self).remove(id)
    }

    fn for_project_template(&self, template_id: ProjectTemplateId) -> Vec<PartRequirement> {
        (**self).for_project_template(template_id)
    }

    fn for_task_template(&self, template_id: TaskTemplateId) -> Vec<PartRequirement> {
        (**self).for_task_template(template_id)
    }

    fn for_part(&self, part_id: PartId) -> Vec<PartRequirement> {
        (**self).for_part(part_id)
    }
}
