//! Approval policy seam for ledger entries.

use std::sync::Arc;

use crate::transaction::TransactionType;

/// Decides whether a ledger entry must wait for human approval.
///
/// Injected into the ledger service so approval rules can change without
/// touching ledger mechanics.
pub trait ApprovalPolicy: Send + Sync {
    fn requires_approval(
        &self,
        transaction_type: TransactionType,
        total_cost_cents: Option<i64>,
        quantity: i64,
    ) -> bool;
}

impl<P> ApprovalPolicy for Arc<P>
where
    P: ApprovalPolicy + ?Sized,
{
    fn requires_approval(
        &self,
        transaction_type: TransactionType,
        total_cost_cents: Option<i64>,
        quantity: i64,
    ) -> bool {
        (**self).requires_approval(transaction_type, total_cost_cents, quantity)
    }
}

/// Default policy: flag entries whose total cost or magnitude crosses a
/// configured threshold. Count corrections (adjustments) are always flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdApprovalPolicy {
    pub cost_threshold_cents: i64,
    pub quantity_threshold: i64,
}

impl Default for ThresholdApprovalPolicy {
    fn default() -> Self {
        Self {
            cost_threshold_cents: 50_000,
            quantity_threshold: 100,
        }
    }
}

impl ApprovalPolicy for ThresholdApprovalPolicy {
    fn requires_approval(
        &self,
        transaction_type: TransactionType,
        total_cost_cents: Option<i64>,
        quantity: i64,
    ) -> bool {
        if transaction_type.is_adjustment() {
            return true;
        }
        if total_cost_cents.is_some_and(|c| c > self.cost_threshold_cents) {
            return true;
        }
        quantity > self.quantity_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cheap_small_purchases_skip_approval() {
        let policy = ThresholdApprovalPolicy::default();
        assert!(!policy.requires_approval(TransactionType::Purchase, Some(2_000), 10));
        assert!(!policy.requires_approval(TransactionType::Usage, None, 3));
    }

    #[test]
    fn cost_above_threshold_requires_approval() {
        let policy = ThresholdApprovalPolicy::default();
        assert!(policy.requires_approval(TransactionType::Purchase, Some(50_001), 1));
    }

    #[test]
    fn bulk_movements_require_approval_even_without_cost() {
        let policy = ThresholdApprovalPolicy::default();
        assert!(policy.requires_approval(TransactionType::Usage, None, 101));
    }

    #[test]
    fn adjustments_always_require_approval() {
        let policy = ThresholdApprovalPolicy::default();
        assert!(policy.requires_approval(TransactionType::AdjustmentNegative, None, 1));
        assert!(policy.requires_approval(TransactionType::AdjustmentPositive, None, 1));
    }
}
