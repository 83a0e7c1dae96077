use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use pitstock_core::{DomainError, DomainResult, Entity, PartId};

/// Major part categories for a robotics build team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartCategory {
    Drivetrain,
    Structural,
    Electronics,
    Pneumatics,
    GameSpecific,
    Fasteners,
    Tools,
    RawMaterials,
    Safety,
    Other,
}

impl core::fmt::Display for PartCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            PartCategory::Drivetrain => "drivetrain",
            PartCategory::Structural => "structural",
            PartCategory::Electronics => "electronics",
            PartCategory::Pneumatics => "pneumatics",
            PartCategory::GameSpecific => "game_specific",
            PartCategory::Fasteners => "fasteners",
            PartCategory::Tools => "tools",
            PartCategory::RawMaterials => "raw_materials",
            PartCategory::Safety => "safety",
            PartCategory::Other => "other",
        };
        f.write_str(s)
    }
}

/// Input for creating a part or replacing its metadata.
///
/// Quantity is accepted only on the create path (starting stock); after that,
/// stock moves exclusively through ledger-backed mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDraft {
    pub part_number: String,
    pub name: String,
    pub description: Option<String>,
    pub category: PartCategory,
    pub quantity_on_hand: i64,
    pub minimum_stock: i64,
    pub safety_stock: i64,
    pub unit: String,
    pub unit_cost_cents: Option<i64>,
    pub vendor: Option<String>,
    pub vendor_part_number: Option<String>,
    pub storage_location: Option<String>,
    pub lead_time_days: Option<u32>,
    pub is_consumable: bool,
    pub notes: Option<String>,
}

impl PartDraft {
    /// Minimal draft with sensible defaults for the optional metadata.
    pub fn new(
        part_number: impl Into<String>,
        name: impl Into<String>,
        category: PartCategory,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            part_number: part_number.into(),
            name: name.into(),
            description: None,
            category,
            quantity_on_hand: 0,
            minimum_stock: 0,
            safety_stock: 0,
            unit: unit.into(),
            unit_cost_cents: None,
            vendor: None,
            vendor_part_number: None,
            storage_location: None,
            lead_time_days: None,
            is_consumable: true,
            notes: None,
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.part_number.trim().is_empty() {
            return Err(DomainError::validation("part number cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("part name cannot be empty"));
        }
        if self.unit.trim().is_empty() {
            return Err(DomainError::validation("unit cannot be empty"));
        }
        if self.quantity_on_hand < 0 {
            return Err(DomainError::validation("quantity on hand cannot be negative"));
        }
        if self.minimum_stock < 0 || self.safety_stock < 0 {
            return Err(DomainError::validation("stock thresholds cannot be negative"));
        }
        if self.unit_cost_cents.is_some_and(|c| c < 0) {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }
        Ok(())
    }
}

/// Inventory record for one trackable part.
///
/// `quantity_on_hand` is never observably negative. All arithmetic against it
/// goes through [`Part::apply_delta`], and every committed change is paired
/// with a ledger entry by the mutation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    /// Globally unique across active and inactive records.
    pub part_number: String,
    pub name: String,
    pub description: Option<String>,
    pub category: PartCategory,
    pub quantity_on_hand: i64,
    /// At or below this level the part shows up in low-stock reports.
    pub minimum_stock: i64,
    /// Buffer for critical parts; at or below is critically low.
    pub safety_stock: i64,
    /// Unit of measurement (pieces, feet, pounds, ...).
    pub unit: String,
    pub unit_cost_cents: Option<i64>,
    pub vendor: Option<String>,
    pub vendor_part_number: Option<String>,
    pub storage_location: Option<String>,
    pub lead_time_days: Option<u32>,
    pub is_consumable: bool,
    pub notes: Option<String>,
    /// Soft-delete flag; inactive parts keep their number reserved.
    pub is_active: bool,
    pub last_restock_date: Option<NaiveDate>,
    pub last_used_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Monotonic record version; the store bumps it on every committed write.
    pub version: u64,
}

impl Part {
    pub fn new(id: PartId, draft: PartDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        draft.validate()?;
        Ok(Self {
            id,
            part_number: draft.part_number,
            name: draft.name,
            description: draft.description,
            category: draft.category,
            quantity_on_hand: draft.quantity_on_hand,
            minimum_stock: draft.minimum_stock,
            safety_stock: draft.safety_stock,
            unit: draft.unit,
            unit_cost_cents: draft.unit_cost_cents,
            vendor: draft.vendor,
            vendor_part_number: draft.vendor_part_number,
            storage_location: draft.storage_location,
            lead_time_days: draft.lead_time_days,
            is_consumable: draft.is_consumable,
            notes: draft.notes,
            is_active: true,
            last_restock_date: None,
            last_used_date: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Apply a signed stock movement.
    ///
    /// Rejects any movement that would drive the quantity below zero and
    /// leaves the record untouched in that case.
    pub fn apply_delta(&mut self, delta: i64) -> DomainResult<()> {
        let new_quantity = self.quantity_on_hand + delta;
        if new_quantity < 0 {
            return Err(DomainError::insufficient_stock(-delta, self.quantity_on_hand));
        }
        self.quantity_on_hand = new_quantity;
        Ok(())
    }

    /// Replace the editable metadata from a draft, keeping identity, stock
    /// level, dates, and version intact.
    pub fn apply_metadata(&mut self, draft: PartDraft, now: DateTime<Utc>) -> DomainResult<()> {
        draft.validate()?;
        self.part_number = draft.part_number;
        self.name = draft.name;
        self.description = draft.description;
        self.category = draft.category;
        self.minimum_stock = draft.minimum_stock;
        self.safety_stock = draft.safety_stock;
        self.unit = draft.unit;
        self.unit_cost_cents = draft.unit_cost_cents;
        self.vendor = draft.vendor;
        self.vendor_part_number = draft.vendor_part_number;
        self.storage_location = draft.storage_location;
        self.lead_time_days = draft.lead_time_days;
        self.is_consumable = draft.is_consumable;
        self.notes = draft.notes;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_restocked(&mut self, date: NaiveDate) {
        self.last_restock_date = Some(date);
    }

    pub fn mark_used(&mut self, date: NaiveDate) {
        self.last_used_date = Some(date);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity_on_hand <= self.minimum_stock
    }

    pub fn is_critically_low(&self) -> bool {
        self.quantity_on_hand <= self.safety_stock
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity_on_hand == 0
    }

    /// Recommended reorder quantity: bring stock back to twice the minimum.
    pub fn reorder_quantity(&self) -> i64 {
        (self.minimum_stock * 2 - self.quantity_on_hand).max(0)
    }

    /// Value of the stock on hand, zero when the unit cost is unknown.
    pub fn inventory_value_cents(&self) -> i64 {
        self.unit_cost_cents
            .map(|c| c * self.quantity_on_hand)
            .unwrap_or(0)
    }

    /// Whether the part should appear in reorder recommendations.
    ///
    /// Low stock always qualifies; a long lead time widens the threshold by
    /// one unit per week of lead time.
    pub fn needs_reordering(&self) -> bool {
        if self.is_low_stock() {
            return true;
        }
        match self.lead_time_days {
            Some(days) => self.quantity_on_hand <= self.minimum_stock + i64::from(days / 7),
            None => false,
        }
    }
}

impl Entity for Part {
    type Id = PartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_part(quantity: i64) -> Part {
        let mut draft = PartDraft::new("AL-6061-1x1x12", "Aluminum tube", PartCategory::RawMaterials, "pieces");
        draft.quantity_on_hand = quantity;
        draft.minimum_stock = 5;
        draft.safety_stock = 2;
        draft.unit_cost_cents = Some(350);
        Part::new(PartId::new(), draft, Utc::now()).unwrap()
    }

    #[test]
    fn draft_with_blank_part_number_is_rejected() {
        let draft = PartDraft::new("   ", "Aluminum tube", PartCategory::RawMaterials, "pieces");
        let err = Part::new(PartId::new(), draft, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn draft_with_negative_quantity_is_rejected() {
        let mut draft = PartDraft::new("MOTOR-CIM", "CIM motor", PartCategory::Electronics, "pieces");
        draft.quantity_on_hand = -1;
        assert!(Part::new(PartId::new(), draft, Utc::now()).is_err());
    }

    #[test]
    fn apply_delta_rejects_overdraw_and_keeps_quantity() {
        let mut part = test_part(50);
        let err = part.apply_delta(-70).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 70,
                available: 50
            }
        );
        assert_eq!(part.quantity_on_hand, 50);
    }

    #[test]
    fn stock_level_predicates() {
        let part = test_part(5);
        assert!(part.is_low_stock());
        assert!(!part.is_critically_low());
        assert!(!part.is_out_of_stock());

        let part = test_part(2);
        assert!(part.is_critically_low());

        let part = test_part(0);
        assert!(part.is_out_of_stock());
    }

    #[test]
    fn reorder_quantity_targets_twice_the_minimum() {
        let part = test_part(3);
        assert_eq!(part.reorder_quantity(), 7);

        let part = test_part(20);
        assert_eq!(part.reorder_quantity(), 0);
    }

    #[test]
    fn lead_time_widens_the_reorder_threshold() {
        let mut part = test_part(7);
        assert!(!part.needs_reordering());
        part.lead_time_days = Some(21);
        assert!(part.needs_reordering());
    }

    #[test]
    fn inventory_value_is_zero_without_unit_cost() {
        let mut part = test_part(10);
        assert_eq!(part.inventory_value_cents(), 3500);
        part.unit_cost_cents = None;
        assert_eq!(part.inventory_value_cents(), 0);
    }

    #[test]
    fn metadata_update_preserves_stock_and_dates() {
        let mut part = test_part(12);
        part.mark_used(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        let mut draft = PartDraft::new("AL-6061-1x1x12", "Aluminum box tube", PartCategory::Structural, "pieces");
        draft.minimum_stock = 8;
        part.apply_metadata(draft, Utc::now()).unwrap();
        assert_eq!(part.quantity_on_hand, 12);
        assert_eq!(part.minimum_stock, 8);
        assert_eq!(part.category, PartCategory::Structural);
        assert!(part.last_used_date.is_some());
    }

    proptest! {
        /// Property: a part absorbing any sequence of signed deltas accepts
        /// exactly those that keep stock non-negative, and its final quantity
        /// is the sum of the accepted deltas.
        #[test]
        fn quantity_never_goes_negative(deltas in prop::collection::vec(-50i64..50, 0..40)) {
            let mut part = test_part(0);
            let mut accepted: i64 = 0;

            for delta in deltas {
                match part.apply_delta(delta) {
                    Ok(()) => accepted += delta,
                    Err(DomainError::InsufficientStock { .. }) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
                prop_assert!(part.quantity_on_hand >= 0);
            }

            prop_assert_eq!(part.quantity_on_hand, accepted);
        }
    }
}
