use std::collections::HashMap;

use chrono::Utc;

use pitstock_core::{
    DomainError, DomainResult, PartId, ProjectTemplateId, RequirementId, TaskTemplateId,
};
use pitstock_planning::{BuildPhase, PartRequirement, RequirementDraft, RequirementPriority};

use crate::store::{InventoryStore, RequirementStore};

/// A requirement that current stock cannot satisfy, annotated with how many
/// units are missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnfulfilledRequirement {
    pub requirement: PartRequirement,
    pub shortfall: i64,
}

/// Aggregate need for one part across a template's requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartNeed {
    pub part_id: PartId,
    pub total_required: i64,
    pub quantity_on_hand: i64,
    pub shortfall: i64,
}

/// Requirement fulfillment engine.
///
/// Reads template requirements and live part stock and reports readiness and
/// shortfalls. It never mutates stock.
#[derive(Debug, Clone)]
pub struct FulfillmentService<S, R> {
    inventory: S,
    requirements: R,
}

impl<S, R> FulfillmentService<S, R> {
    pub fn new(inventory: S, requirements: R) -> Self {
        Self {
            inventory,
            requirements,
        }
    }
}

impl<S, R> FulfillmentService<S, R>
where
    S: InventoryStore,
    R: RequirementStore,
{
    /// Author a requirement. The referenced part must exist.
    pub fn create_requirement(&self, draft: RequirementDraft) -> DomainResult<PartRequirement> {
        if self.inventory.part(draft.part_id)?.is_none() {
            return Err(DomainError::NotFound);
        }
        let requirement = PartRequirement::new(RequirementId::new(), draft, Utc::now())?;
        let requirement = self.requirements.insert(requirement)?;
        tracing::info!(
            requirement = %requirement.id,
            part_id = %requirement.part_id,
            quantity = requirement.quantity_required,
            "created part requirement"
        );
        Ok(requirement)
    }

    pub fn update_requirement(
        &self,
        id: RequirementId,
        draft: RequirementDraft,
    ) -> DomainResult<PartRequirement> {
        if self.inventory.part(draft.part_id)?.is_none() {
            return Err(DomainError::NotFound);
        }
        let mut requirement = self
            .requirements
            .requirement(id)?
            .ok_or(DomainError::NotFound)?;
        requirement.apply_draft(draft, Utc::now())?;
        Ok(self.requirements.update(requirement)?)
    }

    pub fn delete_requirement(&self, id: RequirementId) -> DomainResult<()> {
        self.requirements.remove(id)?;
        Ok(())
    }

    pub fn find_requirement(&self, id: RequirementId) -> Option<PartRequirement> {
        self.requirements.requirement(id).ok().flatten()
    }

    pub fn requirements_for_project(&self, template_id: ProjectTemplateId) -> Vec<PartRequirement> {
        self.requirements.for_project_template(template_id)
    }

    pub fn requirements_for_task(&self, template_id: TaskTemplateId) -> Vec<PartRequirement> {
        self.requirements.for_task_template(template_id)
    }

    /// Whether current stock can satisfy one requirement. Optional
    /// requirements are always satisfiable; anything else needs the full
    /// required quantity on hand. A missing or unknown part cannot fulfill.
    pub fn can_be_fulfilled(&self, requirement: &PartRequirement) -> bool {
        if requirement.is_optional {
            return true;
        }
        self.on_hand(requirement.part_id) >= requirement.quantity_required
    }

    /// Units missing to satisfy the requirement from stock.
    pub fn shortfall(&self, requirement: &PartRequirement) -> i64 {
        (requirement.quantity_required - self.on_hand(requirement.part_id)).max(0)
    }

    /// Whether every non-optional requirement of the template is
    /// individually satisfiable from current stock.
    pub fn can_fulfill_all(&self, template_id: ProjectTemplateId) -> bool {
        self.active_requirements(template_id)
            .iter()
            .filter(|r| !r.is_optional)
            .all(|r| self.can_be_fulfilled(r))
    }

    /// Every requirement the template cannot currently satisfy, each with
    /// its shortfall. Deliberately not short-circuited: purchasing wants the
    /// whole list.
    pub fn unfulfillable_requirements(
        &self,
        template_id: ProjectTemplateId,
    ) -> Vec<UnfulfilledRequirement> {
        self.active_requirements(template_id)
            .into_iter()
            .filter(|r| !self.can_be_fulfilled(r))
            .map(|r| {
                let shortfall = self.shortfall(&r);
                UnfulfilledRequirement {
                    requirement: r,
                    shortfall,
                }
            })
            .collect()
    }

    /// Requirements needed during `phase`; a requirement tagged `Any`
    /// matches every phase.
    pub fn requirements_by_phase(
        &self,
        template_id: ProjectTemplateId,
        phase: BuildPhase,
    ) -> Vec<PartRequirement> {
        self.active_requirements(template_id)
            .into_iter()
            .filter(|r| r.build_phase.matches(phase))
            .collect()
    }

    /// Requirements for the current phase and the next one in the season
    /// order, deduplicated. Competition has no next phase.
    pub fn immediate_requirements(
        &self,
        template_id: ProjectTemplateId,
        current_phase: BuildPhase,
    ) -> Vec<PartRequirement> {
        let next = current_phase.next();
        self.active_requirements(template_id)
            .into_iter()
            .filter(|r| {
                r.build_phase.matches(current_phase)
                    || next.is_some_and(|n| r.build_phase.matches(n))
            })
            .collect()
    }

    /// Estimated cost of every requirement of the template, in cents. Each
    /// requirement's own estimate wins over the part's standard cost.
    pub fn total_cost_cents(&self, template_id: ProjectTemplateId) -> i64 {
        self.active_requirements(template_id)
            .iter()
            .map(|r| {
                let part_cost = self
                    .inventory
                    .part(r.part_id)
                    .ok()
                    .flatten()
                    .and_then(|p| p.unit_cost_cents);
                r.estimated_total_cost_cents(part_cost)
            })
            .sum()
    }

    pub fn requirements_by_priority(
        &self,
        template_id: ProjectTemplateId,
        priority: RequirementPriority,
    ) -> Vec<PartRequirement> {
        self.active_requirements(template_id)
            .into_iter()
            .filter(|r| r.priority == priority)
            .collect()
    }

    pub fn critical_requirements(&self, template_id: ProjectTemplateId) -> Vec<PartRequirement> {
        self.active_requirements(template_id)
            .into_iter()
            .filter(|r| r.is_critical)
            .collect()
    }

    pub fn optional_requirements(&self, template_id: ProjectTemplateId) -> Vec<PartRequirement> {
        self.active_requirements(template_id)
            .into_iter()
            .filter(|r| r.is_optional)
            .collect()
    }

    /// Critical- and high-priority requirements, critical first.
    pub fn high_priority_requirements(
        &self,
        template_id: ProjectTemplateId,
    ) -> Vec<PartRequirement> {
        let mut requirements: Vec<PartRequirement> = self
            .active_requirements(template_id)
            .into_iter()
            .filter(|r| r.priority <= RequirementPriority::High)
            .collect();
        requirements.sort_by_key(|r| r.priority);
        requirements
    }

    /// Total units needed per part across the template's non-optional
    /// requirements, compared against stock. For purchasing planning.
    pub fn parts_needed(&self, template_id: ProjectTemplateId) -> Vec<PartNeed> {
        let mut required: HashMap<PartId, i64> = HashMap::new();
        for r in self
            .active_requirements(template_id)
            .iter()
            .filter(|r| !r.is_optional)
        {
            *required.entry(r.part_id).or_insert(0) += r.quantity_required;
        }

        let mut needs: Vec<PartNeed> = required
            .into_iter()
            .map(|(part_id, total_required)| {
                let quantity_on_hand = self.on_hand(part_id);
                PartNeed {
                    part_id,
                    total_required,
                    quantity_on_hand,
                    shortfall: (total_required - quantity_on_hand).max(0),
                }
            })
            .collect();
        needs.sort_by(|a, b| b.shortfall.cmp(&a.shortfall));
        needs
    }

    /// Shape checks only; reports a bool so forms can validate before
    /// saving.
    pub fn validate_requirement(&self, requirement: &PartRequirement) -> bool {
        requirement.is_valid()
    }

    fn active_requirements(&self, template_id: ProjectTemplateId) -> Vec<PartRequirement> {
        self.requirements
            .for_project_template(template_id)
            .into_iter()
            .filter(|r| r.is_active)
            .collect()
    }

    fn on_hand(&self, part_id: PartId) -> i64 {
        self.inventory
            .part(part_id)
            .ok()
            .flatten()
            .map(|p| p.quantity_on_hand)
            .unwrap_or(0)
    }
}
