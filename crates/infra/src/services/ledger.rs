use chrono::{DateTime, Utc};

use pitstock_core::{
    DomainError, DomainResult, ExpectedVersion, PartId, ProjectId, TaskId, TeamMemberId,
    TransactionId,
};
use pitstock_inventory::{
    ApprovalPolicy, Part, PartTransaction, TransactionContext, TransactionType,
};

use crate::store::{InventoryStore, StoreError};

/// Outcome of a bulk approval: the entries that were approved plus the ids
/// that failed, each with its reason. Partial success is the contract: one
/// bad id never blocks the rest.
#[derive(Debug, Default)]
pub struct BulkApprovalOutcome {
    pub approved: Vec<PartTransaction>,
    pub failures: Vec<(TransactionId, DomainError)>,
}

/// Transaction ledger service: builds, approves, and queries ledger entries.
///
/// Entry creation is reached only through the part mutation service, which
/// hands the mutated part row and the entry to [`LedgerService::append`] for
/// one atomic commit. The approval policy is injected so rules can change
/// without touching ledger mechanics.
#[derive(Debug, Clone)]
pub struct LedgerService<S, P> {
    store: S,
    policy: P,
}

impl<S, P> LedgerService<S, P> {
    pub fn new(store: S, policy: P) -> Self {
        Self { store, policy }
    }
}

impl<S, P> LedgerService<S, P>
where
    S: InventoryStore,
    P: ApprovalPolicy,
{
    /// Build a ledger entry for a movement against `part_id`, stamping the
    /// approval state from the policy.
    pub(crate) fn build_entry(
        &self,
        part_id: PartId,
        transaction_type: TransactionType,
        quantity: i64,
        balance_after: i64,
        context: TransactionContext,
        now: DateTime<Utc>,
    ) -> DomainResult<PartTransaction> {
        let mut entry = PartTransaction::new(
            TransactionId::new(),
            part_id,
            transaction_type,
            quantity,
            balance_after,
            context,
            now,
        )?;
        if self
            .policy
            .requires_approval(transaction_type, entry.total_cost_cents, quantity)
        {
            entry.hold_for_approval();
        }
        Ok(entry)
    }

    /// Build the initial-stock entry for a freshly created part.
    pub(crate) fn build_initial_entry(
        &self,
        part: &Part,
        now: DateTime<Utc>,
    ) -> DomainResult<PartTransaction> {
        let context = TransactionContext {
            reason: Some("initial inventory entry".to_string()),
            unit_cost_cents: part.unit_cost_cents,
            ..TransactionContext::default()
        };
        self.build_entry(
            part.id,
            TransactionType::InitialStock,
            part.quantity_on_hand,
            part.quantity_on_hand,
            context,
            now,
        )
    }

    /// Atomically persist a mutated part row together with its ledger entry.
    ///
    /// Returns the raw store error so the caller can distinguish a lost
    /// optimistic race (retry) from terminal failures.
    pub(crate) fn append(
        &self,
        part: Part,
        expected: ExpectedVersion,
        entry: PartTransaction,
    ) -> Result<(Part, PartTransaction), StoreError> {
        let (part, entry) = self.store.commit_mutation(part, expected, entry)?;
        tracing::info!(
            part_id = %part.id,
            transaction = %entry.id,
            transaction_type = %entry.transaction_type,
            quantity = entry.quantity,
            balance_after = entry.balance_after,
            approved = entry.is_approved,
            "recorded ledger entry"
        );
        Ok((part, entry))
    }

    pub fn find_transaction(&self, id: TransactionId) -> Option<PartTransaction> {
        self.store.transaction(id).ok().flatten()
    }

    /// Approve a pending entry. One-way: an already approved entry is a
    /// conflict.
    pub fn approve_transaction(
        &self,
        id: TransactionId,
        approver: &str,
    ) -> DomainResult<PartTransaction> {
        let mut entry = self
            .store
            .transaction(id)?
            .ok_or(DomainError::NotFound)?;
        entry.approve(approver, Utc::now())?;
        let entry = self.store.update_transaction(entry)?;
        tracing::info!(transaction = %entry.id, approver, "approved ledger entry");
        Ok(entry)
    }

    /// Approve each id independently. A failure on one id (unknown, already
    /// approved) is reported and does not prevent the others from
    /// succeeding.
    pub fn bulk_approve_transactions(
        &self,
        ids: &[TransactionId],
        approver: &str,
    ) -> BulkApprovalOutcome {
        let mut outcome = BulkApprovalOutcome::default();
        for &id in ids {
            match self.approve_transaction(id, approver) {
                Ok(entry) => outcome.approved.push(entry),
                Err(e) => {
                    tracing::warn!(transaction = %id, error = %e, "bulk approval skipped entry");
                    outcome.failures.push((id, e));
                }
            }
        }
        outcome
    }

    pub fn requires_approval(
        &self,
        transaction_type: TransactionType,
        total_cost_cents: Option<i64>,
        quantity: i64,
    ) -> bool {
        self.policy
            .requires_approval(transaction_type, total_cost_cents, quantity)
    }

    /// Shape check on a stored entry: positive magnitude and a balance
    /// consistent with a reachable pre-movement stock level.
    pub fn validate_transaction_integrity(&self, entry: &PartTransaction) -> bool {
        entry.is_internally_consistent()
    }

    // Query surface. All read-only; failures surface as empty results so
    // dashboard-style consumers stay up.

    pub fn transactions_for_part(&self, part_id: PartId) -> Vec<PartTransaction> {
        self.store.transactions_for_part(part_id)
    }

    pub fn transactions_for_part_in_range(
        &self,
        part_id: PartId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<PartTransaction> {
        self.store
            .transactions_for_part(part_id)
            .into_iter()
            .filter(|t| t.transaction_date >= start && t.transaction_date <= end)
            .collect()
    }

    pub fn transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<PartTransaction> {
        self.filtered(|t| t.transaction_date >= start && t.transaction_date <= end)
    }

    pub fn transactions_by_type(&self, transaction_type: TransactionType) -> Vec<PartTransaction> {
        self.filtered(|t| t.transaction_type == transaction_type)
    }

    pub fn incoming_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<PartTransaction> {
        self.filtered(|t| {
            t.transaction_type.is_incoming() && t.transaction_date >= start && t.transaction_date <= end
        })
    }

    pub fn outgoing_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<PartTransaction> {
        self.filtered(|t| {
            t.transaction_type.is_outgoing() && t.transaction_date >= start && t.transaction_date <= end
        })
    }

    pub fn adjustments_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<PartTransaction> {
        self.filtered(|t| {
            t.transaction_type.is_adjustment() && t.transaction_date >= start && t.transaction_date <= end
        })
    }

    pub fn transactions_for_project(&self, project_id: ProjectId) -> Vec<PartTransaction> {
        self.filtered(|t| t.project_id == Some(project_id))
    }

    pub fn transactions_for_task(&self, task_id: TaskId) -> Vec<PartTransaction> {
        self.filtered(|t| t.task_id == Some(task_id))
    }

    pub fn transactions_for_member(&self, member_id: TeamMemberId) -> Vec<PartTransaction> {
        self.filtered(|t| t.performed_by == Some(member_id))
    }

    /// The approval backlog, oldest first.
    pub fn unapproved_transactions(&self) -> Vec<PartTransaction> {
        self.filtered(|t| !t.is_approved)
    }

    pub fn count_unapproved(&self) -> usize {
        self.unapproved_transactions().len()
    }

    pub fn high_value_transactions(&self, threshold_cents: i64) -> Vec<PartTransaction> {
        self.filtered(|t| t.total_cost_cents.is_some_and(|c| c > threshold_cents))
    }

    pub fn transactions_without_cost(&self) -> Vec<PartTransaction> {
        self.filtered(|t| t.total_cost_cents.is_none())
    }

    pub fn transactions_by_vendor(&self, vendor: &str) -> Vec<PartTransaction> {
        let needle = vendor.to_lowercase();
        self.filtered(|t| {
            t.vendor
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        })
    }

    pub fn transactions_by_reference(&self, reference_number: &str) -> Vec<PartTransaction> {
        self.filtered(|t| t.reference_number.as_deref() == Some(reference_number))
    }

    pub fn search_by_reason(&self, term: &str) -> Vec<PartTransaction> {
        let needle = term.to_lowercase();
        self.filtered(|t| {
            t.reason
                .as_deref()
                .is_some_and(|r| r.to_lowercase().contains(&needle))
        })
    }

    /// Most recent entries first.
    pub fn recent_transactions(&self, limit: usize) -> Vec<PartTransaction> {
        let mut all = self.store.transactions();
        all.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        all.truncate(limit);
        all
    }

    pub fn recent_for_part(&self, part_id: PartId, limit: usize) -> Vec<PartTransaction> {
        let mut all = self.store.transactions_for_part(part_id);
        all.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        all.truncate(limit);
        all
    }

    pub fn last_transaction_for_part(&self, part_id: PartId) -> Option<PartTransaction> {
        self.store.transactions_for_part(part_id).into_iter().last()
    }

    /// Total purchase spend (entries with a known cost) in the range.
    pub fn total_spending_cents(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        self.filtered(|t| {
            t.transaction_type == TransactionType::Purchase
                && t.transaction_date >= start
                && t.transaction_date <= end
        })
        .iter()
        .filter_map(|t| t.total_cost_cents)
        .sum()
    }

    /// Purchase spend per vendor in the range, highest first. Entries with no
    /// vendor are grouped under the empty string.
    pub fn spending_by_vendor(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<(String, i64)> {
        let mut totals: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
        for entry in self.filtered(|t| {
            t.transaction_type == TransactionType::Purchase
                && t.transaction_date >= start
                && t.transaction_date <= end
        }) {
            if let Some(cost) = entry.total_cost_cents {
                *totals.entry(entry.vendor.unwrap_or_default()).or_insert(0) += cost;
            }
        }
        let mut rows: Vec<(String, i64)> = totals.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        rows
    }

    /// Units consumed per part (usage entries) in the range, highest first.
    pub fn usage_by_part(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<(PartId, i64)> {
        let mut totals: std::collections::HashMap<PartId, i64> = std::collections::HashMap::new();
        for entry in self.filtered(|t| {
            t.transaction_type == TransactionType::Usage
                && t.transaction_date >= start
                && t.transaction_date <= end
        }) {
            *totals.entry(entry.part_id).or_insert(0) += entry.quantity;
        }
        let mut rows: Vec<(PartId, i64)> = totals.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows
    }

    pub fn count_by_type(&self, transaction_type: TransactionType) -> usize {
        self.transactions_by_type(transaction_type).len()
    }

    fn filtered(&self, keep: impl Fn(&PartTransaction) -> bool) -> Vec<PartTransaction> {
        self.store
            .transactions()
            .into_iter()
            .filter(|t| keep(t))
            .collect()
    }
}
