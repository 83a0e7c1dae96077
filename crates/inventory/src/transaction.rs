use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pitstock_core::{
    DomainError, DomainResult, Entity, PartId, ProjectId, TaskId, TeamMemberId, TransactionId,
};

/// Kind of stock movement a ledger entry records.
///
/// Every kind has a fixed direction: incoming kinds add stock, outgoing kinds
/// remove it. New kinds must pick a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    // Incoming
    InitialStock,
    Purchase,
    Donation,
    Return,
    Found,
    TransferIn,
    AdjustmentPositive,
    // Outgoing
    Usage,
    Damaged,
    Lost,
    Disposed,
    TransferOut,
    AdjustmentNegative,
}

impl TransactionType {
    /// Signed unit direction: +1 for incoming kinds, -1 for outgoing kinds.
    pub fn direction(self) -> i64 {
        match self {
            TransactionType::InitialStock
            | TransactionType::Purchase
            | TransactionType::Donation
            | TransactionType::Return
            | TransactionType::Found
            | TransactionType::TransferIn
            | TransactionType::AdjustmentPositive => 1,
            TransactionType::Usage
            | TransactionType::Damaged
            | TransactionType::Lost
            | TransactionType::Disposed
            | TransactionType::TransferOut
            | TransactionType::AdjustmentNegative => -1,
        }
    }

    pub fn is_incoming(self) -> bool {
        self.direction() > 0
    }

    pub fn is_outgoing(self) -> bool {
        self.direction() < 0
    }

    pub fn is_adjustment(self) -> bool {
        matches!(
            self,
            TransactionType::AdjustmentPositive | TransactionType::AdjustmentNegative
        )
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            TransactionType::InitialStock => "initial_stock",
            TransactionType::Purchase => "purchase",
            TransactionType::Donation => "donation",
            TransactionType::Return => "return",
            TransactionType::Found => "found",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::AdjustmentPositive => "adjustment_positive",
            TransactionType::Usage => "usage",
            TransactionType::Damaged => "damaged",
            TransactionType::Lost => "lost",
            TransactionType::Disposed => "disposed",
            TransactionType::TransferOut => "transfer_out",
            TransactionType::AdjustmentNegative => "adjustment_negative",
        };
        f.write_str(s)
    }
}

/// Optional context a caller attaches to a stock movement.
///
/// Project/task/member references are opaque; the ledger stores them without
/// validating more than presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub reason: Option<String>,
    pub vendor: Option<String>,
    pub reference_number: Option<String>,
    pub unit_cost_cents: Option<i64>,
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
    pub performed_by: Option<TeamMemberId>,
}

impl TransactionContext {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// One immutable ledger entry: a single stock movement and the balance it
/// left behind.
///
/// Entries are append-only. After creation only the approval fields may
/// change, and only from unapproved to approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartTransaction {
    pub id: TransactionId,
    pub part_id: PartId,
    pub transaction_type: TransactionType,
    /// Positive magnitude of the movement.
    pub quantity: i64,
    pub unit_cost_cents: Option<i64>,
    /// `unit_cost_cents * quantity` when the cost is known.
    pub total_cost_cents: Option<i64>,
    pub reason: Option<String>,
    pub vendor: Option<String>,
    pub reference_number: Option<String>,
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
    pub performed_by: Option<TeamMemberId>,
    pub transaction_date: DateTime<Utc>,
    /// The part's quantity on hand immediately after this entry committed.
    pub balance_after: i64,
    pub is_approved: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PartTransaction {
    /// Build an entry for a movement of `quantity` units against a part whose
    /// post-movement balance is `balance_after`.
    pub fn new(
        id: TransactionId,
        part_id: PartId,
        transaction_type: TransactionType,
        quantity: i64,
        balance_after: i64,
        context: TransactionContext,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(
                "transaction quantity must be positive",
            ));
        }
        if balance_after < 0 {
            return Err(DomainError::validation(
                "balance after transaction cannot be negative",
            ));
        }
        if context.unit_cost_cents.is_some_and(|c| c < 0) {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }

        let total_cost_cents = context.unit_cost_cents.map(|c| c * quantity);

        Ok(Self {
            id,
            part_id,
            transaction_type,
            quantity,
            unit_cost_cents: context.unit_cost_cents,
            total_cost_cents,
            reason: context.reason,
            vendor: context.vendor,
            reference_number: context.reference_number,
            project_id: context.project_id,
            task_id: context.task_id,
            performed_by: context.performed_by,
            transaction_date: now,
            balance_after,
            is_approved: true,
            approved_by: None,
            approved_at: None,
            created_at: now,
        })
    }

    /// Signed stock change this entry applied: `quantity` for incoming kinds,
    /// `-quantity` for outgoing kinds.
    pub fn effective_quantity_change(&self) -> i64 {
        self.quantity * self.transaction_type.direction()
    }

    /// Mark the entry as pending approval. Used at creation time when the
    /// approval policy flags it; never after.
    pub fn hold_for_approval(&mut self) {
        self.is_approved = false;
    }

    /// Approve the entry. Approval is one-way; approving an already approved
    /// entry is a conflict.
    pub fn approve(&mut self, approver: impl Into<String>, now: DateTime<Utc>) -> DomainResult<()> {
        if self.is_approved {
            return Err(DomainError::conflict("transaction already approved"));
        }
        self.is_approved = true;
        self.approved_by = Some(approver.into());
        self.approved_at = Some(now);
        Ok(())
    }

    /// Consistency check: magnitude positive, balance non-negative, and the
    /// balance consistent with some pre-movement quantity ≥ 0.
    pub fn is_internally_consistent(&self) -> bool {
        if self.quantity <= 0 || self.balance_after < 0 {
            return false;
        }
        // balance_before = balance_after - effective change; it must be a
        // reachable (non-negative) stock level.
        self.balance_after - self.effective_quantity_change() >= 0
    }
}

impl Entity for PartTransaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
