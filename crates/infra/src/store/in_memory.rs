use std::collections::HashMap;
use std::sync::RwLock;

use pitstock_core::{
    ExpectedVersion, PartId, ProjectTemplateId, RequirementId, TaskTemplateId, TransactionId,
};
use pitstock_inventory::{Part, PartTransaction};
use pitstock_planning::PartRequirement;

use super::r#trait::{InventoryStore, RequirementStore, StoreError};

#[derive(Debug, Default)]
struct InventoryState {
    parts: HashMap<PartId, Part>,
    /// Append-only; push order is commit order.
    ledger: Vec<PartTransaction>,
}

/// In-memory inventory store.
///
/// Intended for tests/dev. A single lock guards parts and ledger together,
/// which makes the combined part+entry commit trivially atomic. Not optimized
/// for performance.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    inner: RwLock<InventoryState>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_part_number_free(
        state: &InventoryState,
        part_number: &str,
        except: Option<PartId>,
    ) -> Result<(), StoreError> {
        let taken = state
            .parts
            .values()
            .any(|p| p.part_number == part_number && Some(p.id) != except);
        if taken {
            return Err(StoreError::Duplicate(format!(
                "part number already exists: {part_number}"
            )));
        }
        Ok(())
    }

    fn check_entry(part: &Part, entry: &PartTransaction) -> Result<(), StoreError> {
        if entry.part_id != part.id {
            return Err(StoreError::InvalidCommit(format!(
                "ledger entry references part {}, commit targets part {}",
                entry.part_id, part.id
            )));
        }
        if entry.balance_after != part.quantity_on_hand {
            return Err(StoreError::InvalidCommit(format!(
                "ledger entry balance_after {} does not match part quantity {}",
                entry.balance_after, part.quantity_on_hand
            )));
        }
        Ok(())
    }
}

fn poisoned(_: impl core::fmt::Debug) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl InventoryStore for InMemoryInventoryStore {
    fn insert_part(
        &self,
        mut part: Part,
        initial_entry: Option<PartTransaction>,
    ) -> Result<Part, StoreError> {
        let mut state = self.inner.write().map_err(poisoned)?;

        if state.parts.contains_key(&part.id) {
            return Err(StoreError::Duplicate(format!(
                "part id already exists: {}",
                part.id
            )));
        }
        Self::check_part_number_free(&state, &part.part_number, None)?;

        part.version = 1;
        if let Some(entry) = &initial_entry {
            Self::check_entry(&part, entry)?;
        }

        state.parts.insert(part.id, part.clone());
        if let Some(entry) = initial_entry {
            state.ledger.push(entry);
        }

        Ok(part)
    }

    fn part(&self, id: PartId) -> Result<Option<Part>, StoreError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.parts.get(&id).cloned())
    }

    fn part_by_number(&self, part_number: &str) -> Result<Option<Part>, StoreError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state
            .parts
            .values()
            .find(|p| p.part_number == part_number)
            .cloned())
    }

    fn parts(&self) -> Vec<Part> {
        let state = match self.inner.read() {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        let mut parts: Vec<Part> = state.parts.values().cloned().collect();
        parts.sort_by(|a, b| a.part_number.cmp(&b.part_number));
        parts
    }

    fn update_part(&self, mut part: Part, expected: ExpectedVersion) -> Result<Part, StoreError> {
        let mut state = self.inner.write().map_err(poisoned)?;

        let current = state.parts.get(&part.id).ok_or(StoreError::NotFound)?;
        if !expected.matches(current.version) {
            return Err(StoreError::Concurrency(format!(
                "expected {expected:?}, found {}",
                current.version
            )));
        }
        let current_version = current.version;
        Self::check_part_number_free(&state, &part.part_number, Some(part.id))?;

        part.version = current_version + 1;
        state.parts.insert(part.id, part.clone());
        Ok(part)
    }

    fn remove_part(&self, id: PartId) -> Result<(), StoreError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        state.parts.remove(&id).ok_or(StoreError::NotFound)?;
        Ok(())
    }

    fn commit_mutation(
        &self,
        mut part: Part,
        expected: ExpectedVersion,
        entry: PartTransaction,
    ) -> Result<(Part, PartTransaction), StoreError> {
        let mut state = self.inner.write().map_err(poisoned)?;

        Self::check_entry(&part, &entry)?;

        let stored = state.parts.get_mut(&part.id).ok_or(StoreError::NotFound)?;
        if !expected.matches(stored.version) {
            return Err(StoreError::Concurrency(format!(
                "expected {expected:?}, found {}",
                stored.version
            )));
        }

        part.version = stored.version + 1;
        *stored = part.clone();
        state.ledger.push(entry.clone());

        Ok((part, entry))
    }

    fn transaction(&self, id: TransactionId) -> Result<Option<PartTransaction>, StoreError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.ledger.iter().find(|t| t.id == id).cloned())
    }

    fn transactions(&self) -> Vec<PartTransaction> {
        match self.inner.read() {
            Ok(state) => state.ledger.clone(),
            Err(_) => vec![],
        }
    }

    fn transactions_for_part(&self, part_id: PartId) -> Vec<PartTransaction> {
        match self.inner.read() {
            Ok(state) => state
                .ledger
                .iter()
                .filter(|t| t.part_id == part_id)
                .cloned()
                .collect(),
            Err(_) => vec![],
        }
    }

    fn update_transaction(&self, entry: PartTransaction) -> Result<PartTransaction, StoreError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        let stored = state
            .ledger
            .iter_mut()
            .find(|t| t.id == entry.id)
            .ok_or(StoreError::NotFound)?;

        // Ledger entries are immutable outside the approval fields.
        let mut frozen = stored.clone();
        frozen.is_approved = entry.is_approved;
        frozen.approved_by = entry.approved_by.clone();
        frozen.approved_at = entry.approved_at;
        if frozen != entry {
            return Err(StoreError::InvalidCommit(
                "only approval fields of a ledger entry may change".to_string(),
            ));
        }

        *stored = entry.clone();
        Ok(entry)
    }

    fn remove_transaction(&self, id: TransactionId) -> Result<(), StoreError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        let idx = state
            .ledger
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound)?;
        let removed = state.ledger.remove(idx);
        tracing::warn!(
            transaction = %removed.id,
            part_id = %removed.part_id,
            "administrative removal of a ledger entry"
        );
        Ok(())
    }

    fn count_transactions_for_part(&self, part_id: PartId) -> usize {
        match self.inner.read() {
            Ok(state) => state.ledger.iter().filter(|t| t.part_id == part_id).count(),
            Err(_) => 0,
        }
    }
}

/// In-memory requirement store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryRequirementStore {
    inner: RwLock<HashMap<RequirementId, PartRequirement>>,
}

impl InMemoryRequirementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn filtered(&self, keep: impl Fn(&PartRequirement) -> bool) -> Vec<PartRequirement> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut requirements: Vec<PartRequirement> =
            map.values().filter(|r| keep(r)).cloned().collect();
        requirements.sort_by_key(|r| r.created_at);
        requirements
    }
}

impl RequirementStore for InMemoryRequirementStore {
    fn insert(&self, requirement: PartRequirement) -> Result<PartRequirement, StoreError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        if map.contains_key(&requirement.id) {
            return Err(StoreError::Duplicate(format!(
                "requirement id already exists: {}",
                requirement.id
            )));
        }
        map.insert(requirement.id, requirement.clone());
        Ok(requirement)
    }

    fn requirement(&self, id: RequirementId) -> Result<Option<PartRequirement>, StoreError> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.get(&id).cloned())
    }

    fn update(&self, requirement: PartRequirement) -> Result<PartRequirement, StoreError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        if !map.contains_key(&requirement.id) {
            return Err(StoreError::NotFound);
        }
        map.insert(requirement.id, requirement.clone());
        Ok(requirement)
    }

    fn remove(&self, id: RequirementId) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        map.remove(&id).ok_or(StoreError::NotFound)?;
        Ok(())
    }

    fn for_project_template(&self, template_id: ProjectTemplateId) -> Vec<PartRequirement> {
        self.filtered(|r| r.project_template_id == Some(template_id))
    }

    fn for_task_template(&self, template_id: TaskTemplateId) -> Vec<PartRequirement> {
        self.filtered(|r| r.task_template_id == Some(template_id))
    }

    fn for_part(&self, part_id: PartId) -> Vec<PartRequirement> {
        self.filtered(|r| r.part_id == part_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pitstock_inventory::{PartCategory, PartDraft, TransactionContext, TransactionType};

    fn stored_part(store: &InMemoryInventoryStore, part_number: &str, quantity: i64) -> Part {
        let mut draft = PartDraft::new(part_number, "Test part", PartCategory::Other, "pieces");
        draft.quantity_on_hand = quantity;
        let part = Part::new(PartId::new(), draft, Utc::now()).unwrap();
        store.insert_part(part, None).unwrap()
    }

    fn usage_entry(part: &Part, quantity: i64) -> PartTransaction {
        PartTransaction::new(
            TransactionId::new(),
            part.id,
            TransactionType::Usage,
            quantity,
            part.quantity_on_hand,
            TransactionContext::default(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn duplicate_part_number_is_rejected_even_when_inactive() {
        let store = InMemoryInventoryStore::new();
        let mut first = stored_part(&store, "BOLT-M5x20", 0);

        first.deactivate(Utc::now());
        store
            .update_part(first.clone(), ExpectedVersion::Exact(first.version))
            .unwrap();

        let draft = PartDraft::new("BOLT-M5x20", "Duplicate", PartCategory::Fasteners, "pieces");
        let dup = Part::new(PartId::new(), draft, Utc::now()).unwrap();
        let err = store.insert_part(dup, None).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn stale_version_commit_is_a_concurrency_error() {
        let store = InMemoryInventoryStore::new();
        let part = stored_part(&store, "GEAR-20T", 10);

        // First writer wins.
        let mut winner = part.clone();
        winner.apply_delta(-4).unwrap();
        let entry = usage_entry(&winner, 4);
        store
            .commit_mutation(winner, ExpectedVersion::Exact(part.version), entry)
            .unwrap();

        // Second writer committed against the stale read.
        let mut loser = part.clone();
        loser.apply_delta(-8).unwrap();
        let entry = usage_entry(&loser, 8);
        let err = store
            .commit_mutation(loser, ExpectedVersion::Exact(part.version), entry)
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));

        // Only the winner's movement is visible.
        let current = store.part(part.id).unwrap().unwrap();
        assert_eq!(current.quantity_on_hand, 6);
        assert_eq!(store.count_transactions_for_part(part.id), 1);
    }

    #[test]
    fn commit_rejects_entry_whose_balance_disagrees_with_the_part() {
        let store = InMemoryInventoryStore::new();
        let part = stored_part(&store, "WHEEL-6IN", 10);

        let mut updated = part.clone();
        updated.apply_delta(-2).unwrap();
        let mut entry = usage_entry(&updated, 2);
        entry.balance_after = 99;

        let err = store
            .commit_mutation(updated, ExpectedVersion::Exact(part.version), entry)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCommit(_)));
        assert_eq!(store.part(part.id).unwrap().unwrap().quantity_on_hand, 10);
    }

    #[test]
    fn update_transaction_only_allows_approval_changes() {
        let store = InMemoryInventoryStore::new();
        let mut part = stored_part(&store, "CHAIN-25", 10);
        part.apply_delta(-1).unwrap();
        let entry = usage_entry(&part, 1);
        let (_, stored) = store
            .commit_mutation(part, ExpectedVersion::Exact(1), entry)
            .unwrap();

        let mut tampered = stored.clone();
        tampered.quantity = 5;
        let err = store.update_transaction(tampered).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCommit(_)));

        let mut approved = stored.clone();
        approved.is_approved = true;
        approved.approved_by = Some("mentor".to_string());
        approved.approved_at = Some(Utc::now());
        assert!(store.update_transaction(approved).is_ok());
    }
}
