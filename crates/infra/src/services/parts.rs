use chrono::{NaiveDate, Utc};

use pitstock_core::{DomainError, DomainResult, ExpectedVersion, PartId, ProjectId, TaskId};
use pitstock_inventory::{
    ApprovalPolicy, Part, PartCategory, PartDraft, TransactionContext, TransactionType,
};

use super::ledger::LedgerService;
use crate::store::{InventoryStore, StoreError};

/// Bounded optimistic retries for the read-validate-commit cycle. Losing the
/// version race this many times in a row means pathological contention;
/// surface it as a conflict instead of spinning.
const MAX_COMMIT_ATTEMPTS: usize = 5;

/// A planned stock movement: what to record and how to stamp the part.
struct Mutation {
    transaction_type: TransactionType,
    quantity: i64,
    context: TransactionContext,
    mark_restocked: bool,
    mark_used: bool,
}

/// Part mutation service: the sole entry point for changing a part's
/// quantity on hand.
///
/// Every mutating call is one atomic unit: the part row and exactly one
/// ledger entry commit together or not at all. Concurrent mutations against
/// the same part are serialized by the store's version check; this service
/// re-reads and retries a bounded number of times when it loses the race.
#[derive(Debug, Clone)]
pub struct PartService<S, P> {
    store: S,
    ledger: LedgerService<S, P>,
}

impl<S, P> PartService<S, P> {
    pub fn new(store: S, ledger: LedgerService<S, P>) -> Self {
        Self { store, ledger }
    }
}

impl<S, P> PartService<S, P>
where
    S: InventoryStore,
    P: ApprovalPolicy,
{
    /// Create a part. The part number must be free across active and
    /// inactive records. A starting quantity above zero is recorded as an
    /// initial-stock ledger entry in the same commit.
    pub fn create_part(&self, draft: PartDraft) -> DomainResult<Part> {
        let now = Utc::now();
        let part = Part::new(PartId::new(), draft, now)?;

        if self.store.part_by_number(&part.part_number)?.is_some() {
            return Err(DomainError::conflict(format!(
                "part number already exists: {}",
                part.part_number
            )));
        }

        let initial = if part.quantity_on_hand > 0 {
            Some(self.ledger.build_initial_entry(&part, now)?)
        } else {
            None
        };

        let part = self.store.insert_part(part, initial)?;
        tracing::info!(
            part_id = %part.id,
            part_number = %part.part_number,
            quantity = part.quantity_on_hand,
            "created part"
        );
        Ok(part)
    }

    /// Replace a part's metadata. Stock is untouched; quantity moves only
    /// through the ledger-backed mutations below.
    pub fn update_part(&self, part_id: PartId, draft: PartDraft) -> DomainResult<Part> {
        let now = Utc::now();
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let mut part = self.load(part_id)?;
            let expected = ExpectedVersion::Exact(part.version);

            if part.part_number != draft.part_number
                && self
                    .store
                    .part_by_number(&draft.part_number)?
                    .is_some_and(|other| other.id != part_id)
            {
                return Err(DomainError::conflict(format!(
                    "part number already exists: {}",
                    draft.part_number
                )));
            }

            part.apply_metadata(draft.clone(), now)?;
            match self.store.update_part(part, expected) {
                Ok(part) => return Ok(part),
                Err(StoreError::Concurrency(_)) if attempt < MAX_COMMIT_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(DomainError::conflict("too many concurrent updates"))
    }

    /// Receive stock from a vendor: adds quantity, stamps the restock date,
    /// and records a purchase entry.
    pub fn restock(
        &self,
        part_id: PartId,
        quantity: i64,
        unit_cost_cents: Option<i64>,
        vendor: Option<String>,
        reference_number: Option<String>,
    ) -> DomainResult<Part> {
        if quantity <= 0 {
            return Err(DomainError::validation("restock quantity must be positive"));
        }
        let reason = match &vendor {
            Some(v) => format!("restocked from vendor: {v}"),
            None => "restocked".to_string(),
        };
        let context = TransactionContext {
            reason: Some(reason),
            vendor,
            reference_number,
            unit_cost_cents,
            ..TransactionContext::default()
        };
        self.mutate(part_id, |_| {
            Ok(Some(Mutation {
                transaction_type: TransactionType::Purchase,
                quantity,
                context: context.clone(),
                mark_restocked: true,
                mark_used: false,
            }))
        })
    }

    /// Consume stock for a project or task. Fails with
    /// [`DomainError::InsufficientStock`], changing nothing, when the
    /// request exceeds the quantity on hand.
    pub fn use_parts(
        &self,
        part_id: PartId,
        quantity: i64,
        project_id: Option<ProjectId>,
        task_id: Option<TaskId>,
        reason: Option<String>,
    ) -> DomainResult<Part> {
        if quantity <= 0 {
            return Err(DomainError::validation("usage quantity must be positive"));
        }
        let context = TransactionContext {
            reason: Some(reason.unwrap_or_else(|| "used in project/task".to_string())),
            project_id,
            task_id,
            ..TransactionContext::default()
        };
        self.mutate(part_id, |_| {
            Ok(Some(Mutation {
                transaction_type: TransactionType::Usage,
                quantity,
                context: context.clone(),
                mark_restocked: false,
                mark_used: true,
            }))
        })
    }

    /// Set the quantity to a counted value. A zero delta is a no-op (no
    /// ledger entry); otherwise one adjustment entry sized `|delta|` is
    /// recorded in the matching direction.
    pub fn adjust_inventory(
        &self,
        part_id: PartId,
        new_quantity: i64,
        reason: Option<String>,
    ) -> DomainResult<Part> {
        if new_quantity < 0 {
            return Err(DomainError::validation(
                "adjusted quantity cannot be negative",
            ));
        }
        let context = TransactionContext {
            reason: Some(reason.unwrap_or_else(|| "inventory adjustment".to_string())),
            ..TransactionContext::default()
        };
        self.mutate(part_id, |part| {
            let delta = new_quantity - part.quantity_on_hand;
            if delta == 0 {
                return Ok(None);
            }
            let transaction_type = if delta > 0 {
                TransactionType::AdjustmentPositive
            } else {
                TransactionType::AdjustmentNegative
            };
            Ok(Some(Mutation {
                transaction_type,
                quantity: delta.abs(),
                context: context.clone(),
                mark_restocked: false,
                mark_used: false,
            }))
        })
    }

    /// Generic signed-delta mutation. The delta's sign must match the
    /// transaction type's direction; the sufficiency check applies when the
    /// delta is negative.
    pub fn update_quantity(
        &self,
        part_id: PartId,
        delta: i64,
        transaction_type: TransactionType,
        reason: Option<String>,
    ) -> DomainResult<Part> {
        if delta == 0 {
            return Err(DomainError::validation("quantity delta cannot be zero"));
        }
        if delta.signum() != transaction_type.direction() {
            return Err(DomainError::validation(format!(
                "delta {delta} does not match the direction of {transaction_type}"
            )));
        }
        let context = match reason {
            Some(r) => TransactionContext::with_reason(r),
            None => TransactionContext::default(),
        };
        self.mutate(part_id, |_| {
            Ok(Some(Mutation {
                transaction_type,
                quantity: delta.abs(),
                context: context.clone(),
                mark_restocked: false,
                mark_used: delta < 0,
            }))
        })
    }

    /// Soft-delete: the part drops out of active listings but keeps its
    /// number reserved and its ledger history intact.
    pub fn delete_part(&self, part_id: PartId) -> DomainResult<Part> {
        let now = Utc::now();
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let mut part = self.load(part_id)?;
            if !part.is_active {
                return Ok(part);
            }
            let expected = ExpectedVersion::Exact(part.version);
            part.deactivate(now);
            match self.store.update_part(part, expected) {
                Ok(part) => {
                    tracing::info!(part_id = %part.id, "soft-deleted part");
                    return Ok(part);
                }
                Err(StoreError::Concurrency(_)) if attempt < MAX_COMMIT_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(DomainError::conflict("too many concurrent updates"))
    }

    /// Hard-delete. Only allowed while the part has no ledger history;
    /// otherwise the history wins and this is an integrity error.
    pub fn permanently_delete_part(&self, part_id: PartId) -> DomainResult<()> {
        let part = self.load(part_id)?;
        if self.store.count_transactions_for_part(part_id) > 0 {
            return Err(DomainError::integrity(
                "cannot permanently delete a part with ledger history",
            ));
        }
        self.store.remove_part(part_id)?;
        tracing::warn!(part_id = %part.id, part_number = %part.part_number, "permanently deleted part");
        Ok(())
    }

    // Lookups and monitoring reads. Internal failures surface as empty
    // results so dashboards stay up.

    pub fn find_part(&self, part_id: PartId) -> Option<Part> {
        self.store.part(part_id).ok().flatten()
    }

    pub fn find_part_by_number(&self, part_number: &str) -> Option<Part> {
        self.store.part_by_number(part_number).ok().flatten()
    }

    pub fn active_parts(&self) -> Vec<Part> {
        self.filtered(|p| p.is_active)
    }

    pub fn low_stock_parts(&self) -> Vec<Part> {
        self.filtered(|p| p.is_active && p.is_low_stock())
    }

    pub fn critically_low_parts(&self) -> Vec<Part> {
        self.filtered(|p| p.is_active && p.is_critically_low())
    }

    pub fn out_of_stock_parts(&self) -> Vec<Part> {
        self.filtered(|p| p.is_active && p.is_out_of_stock())
    }

    pub fn parts_needing_reorder(&self) -> Vec<Part> {
        self.filtered(|p| p.is_active && p.needs_reordering())
    }

    pub fn total_inventory_value_cents(&self) -> i64 {
        self.active_parts()
            .iter()
            .map(Part::inventory_value_cents)
            .sum()
    }

    pub fn inventory_value_by_category_cents(&self, category: PartCategory) -> i64 {
        self.filtered(|p| p.is_active && p.category == category)
            .iter()
            .map(Part::inventory_value_cents)
            .sum()
    }

    pub fn parts_by_category(&self, category: PartCategory) -> Vec<Part> {
        self.filtered(|p| p.is_active && p.category == category)
    }

    /// Case-insensitive search over part number, name, and description.
    pub fn search_parts(&self, term: &str) -> Vec<Part> {
        let needle = term.to_lowercase();
        self.filtered(|p| {
            p.part_number.to_lowercase().contains(&needle)
                || p.name.to_lowercase().contains(&needle)
                || p
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
    }

    pub fn parts_by_vendor(&self, vendor: &str) -> Vec<Part> {
        let needle = vendor.to_lowercase();
        self.filtered(|p| {
            p.vendor
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        })
    }

    pub fn parts_by_storage_location(&self, location: &str) -> Vec<Part> {
        let needle = location.to_lowercase();
        self.filtered(|p| {
            p.storage_location
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(&needle))
        })
    }

    /// Active parts whose last recorded use predates `date`.
    pub fn unused_parts_since(&self, date: NaiveDate) -> Vec<Part> {
        self.filtered(|p| p.is_active && p.last_used_date.is_some_and(|d| d < date))
    }

    /// Active parts ordered by unit cost, highest first; parts without a
    /// cost are excluded.
    pub fn most_expensive_parts(&self, limit: usize) -> Vec<Part> {
        let mut parts = self.filtered(|p| p.is_active && p.unit_cost_cents.is_some());
        parts.sort_by(|a, b| b.unit_cost_cents.cmp(&a.unit_cost_cents));
        parts.truncate(limit);
        parts
    }

    fn load(&self, part_id: PartId) -> DomainResult<Part> {
        self.store.part(part_id)?.ok_or(DomainError::NotFound)
    }

    fn filtered(&self, keep: impl Fn(&Part) -> bool) -> Vec<Part> {
        self.store.parts().into_iter().filter(|p| keep(p)).collect()
    }

    /// The critical section: read the part, plan the movement, apply it to a
    /// working copy, and commit copy + ledger entry atomically under the
    /// version read at the start. Lost races re-read and retry.
    fn mutate(
        &self,
        part_id: PartId,
        plan: impl Fn(&Part) -> DomainResult<Option<Mutation>>,
    ) -> DomainResult<Part> {
        let now = Utc::now();
        let today = now.date_naive();

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let part = self.load(part_id)?;
            let expected = ExpectedVersion::Exact(part.version);

            let Some(mutation) = plan(&part)? else {
                return Ok(part);
            };

            let mut updated = part;
            updated.apply_delta(mutation.quantity * mutation.transaction_type.direction())?;
            if mutation.mark_restocked {
                updated.mark_restocked(today);
            }
            if mutation.mark_used {
                updated.mark_used(today);
            }
            updated.touch(now);

            let entry = self.ledger.build_entry(
                part_id,
                mutation.transaction_type,
                mutation.quantity,
                updated.quantity_on_hand,
                mutation.context,
                now,
            )?;

            match self.ledger.append(updated, expected, entry) {
                Ok((part, _entry)) => return Ok(part),
                Err(StoreError::Concurrency(msg)) if attempt < MAX_COMMIT_ATTEMPTS => {
                    tracing::debug!(part_id = %part_id, attempt, %msg, "lost mutation race, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DomainError::conflict("too many concurrent updates"))
    }
}
