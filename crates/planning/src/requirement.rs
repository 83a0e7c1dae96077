use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pitstock_core::{
    DomainError, DomainResult, Entity, PartId, ProjectTemplateId, RequirementId, TaskTemplateId,
};

/// Priority of a declared part need. Ordered: `Critical` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementPriority {
    Critical,
    High,
    Medium,
    Low,
}

/// Ordered stage of a build season.
///
/// `Any` is a wildcard that matches every stage and never participates in the
/// phase ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Design,
    Fabrication,
    Testing,
    Integration,
    Competition,
    Any,
}

impl BuildPhase {
    /// The next phase in the fixed season order. Competition is terminal, and
    /// the wildcard has no position in the order.
    pub fn next(self) -> Option<BuildPhase> {
        match self {
            BuildPhase::Design => Some(BuildPhase::Fabrication),
            BuildPhase::Fabrication => Some(BuildPhase::Testing),
            BuildPhase::Testing => Some(BuildPhase::Integration),
            BuildPhase::Integration => Some(BuildPhase::Competition),
            BuildPhase::Competition | BuildPhase::Any => None,
        }
    }

    /// Whether a requirement tagged with `self` applies during `phase`.
    pub fn matches(self, phase: BuildPhase) -> bool {
        self == BuildPhase::Any || self == phase
    }
}

impl core::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            BuildPhase::Design => "design",
            BuildPhase::Fabrication => "fabrication",
            BuildPhase::Testing => "testing",
            BuildPhase::Integration => "integration",
            BuildPhase::Competition => "competition",
            BuildPhase::Any => "any",
        };
        f.write_str(s)
    }
}

/// Input for authoring a requirement alongside a planning template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDraft {
    pub part_id: PartId,
    pub project_template_id: Option<ProjectTemplateId>,
    pub task_template_id: Option<TaskTemplateId>,
    pub quantity_required: i64,
    pub minimum_quantity: Option<i64>,
    pub maximum_quantity: Option<i64>,
    pub priority: RequirementPriority,
    pub is_critical: bool,
    pub is_optional: bool,
    pub build_phase: BuildPhase,
    pub estimated_unit_cost_cents: Option<i64>,
    pub preferred_vendor: Option<String>,
    pub specifications: Option<String>,
}

impl RequirementDraft {
    pub fn new(
        part_id: PartId,
        project_template_id: ProjectTemplateId,
        quantity_required: i64,
        priority: RequirementPriority,
    ) -> Self {
        Self {
            part_id,
            project_template_id: Some(project_template_id),
            task_template_id: None,
            quantity_required,
            minimum_quantity: None,
            maximum_quantity: None,
            priority,
            is_critical: false,
            is_optional: false,
            build_phase: BuildPhase::Any,
            estimated_unit_cost_cents: None,
            preferred_vendor: None,
            specifications: None,
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.project_template_id.is_none() && self.task_template_id.is_none() {
            return Err(DomainError::validation(
                "requirement must reference a project or task template",
            ));
        }
        if self.quantity_required <= 0 {
            return Err(DomainError::validation(
                "quantity required must be positive",
            ));
        }
        if self.minimum_quantity.is_some_and(|q| q <= 0)
            || self.maximum_quantity.is_some_and(|q| q <= 0)
        {
            return Err(DomainError::validation(
                "quantity bounds must be positive when set",
            ));
        }
        if let Some(min) = self.minimum_quantity {
            if min > self.quantity_required {
                return Err(DomainError::validation(
                    "minimum quantity cannot exceed quantity required",
                ));
            }
        }
        if let Some(max) = self.maximum_quantity {
            if max < self.quantity_required {
                return Err(DomainError::validation(
                    "maximum quantity cannot be below quantity required",
                ));
            }
        }
        if self.estimated_unit_cost_cents.is_some_and(|c| c < 0) {
            return Err(DomainError::validation(
                "estimated unit cost cannot be negative",
            ));
        }
        Ok(())
    }
}

/// A planning template's declared need for a part.
///
/// Read-only from the inventory subsystem's perspective; the fulfillment
/// engine evaluates it against stock but never mutates stock through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRequirement {
    pub id: RequirementId,
    pub part_id: PartId,
    pub project_template_id: Option<ProjectTemplateId>,
    pub task_template_id: Option<TaskTemplateId>,
    pub quantity_required: i64,
    /// Lower bound for flexible needs ("2-4 wheels").
    pub minimum_quantity: Option<i64>,
    /// Upper bound for flexible needs.
    pub maximum_quantity: Option<i64>,
    pub priority: RequirementPriority,
    pub is_critical: bool,
    pub is_optional: bool,
    pub build_phase: BuildPhase,
    /// Overrides the part's standard cost in template cost totals.
    pub estimated_unit_cost_cents: Option<i64>,
    pub preferred_vendor: Option<String>,
    pub specifications: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PartRequirement {
    pub fn new(id: RequirementId, draft: RequirementDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        draft.validate()?;
        Ok(Self {
            id,
            part_id: draft.part_id,
            project_template_id: draft.project_template_id,
            task_template_id: draft.task_template_id,
            quantity_required: draft.quantity_required,
            minimum_quantity: draft.minimum_quantity,
            maximum_quantity: draft.maximum_quantity,
            priority: draft.priority,
            is_critical: draft.is_critical,
            is_optional: draft.is_optional,
            build_phase: draft.build_phase,
            estimated_unit_cost_cents: draft.estimated_unit_cost_cents,
            preferred_vendor: draft.preferred_vendor,
            specifications: draft.specifications,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the authored fields from a draft, keeping identity and
    /// timestamps of creation.
    pub fn apply_draft(&mut self, draft: RequirementDraft, now: DateTime<Utc>) -> DomainResult<()> {
        draft.validate()?;
        self.part_id = draft.part_id;
        self.project_template_id = draft.project_template_id;
        self.task_template_id = draft.task_template_id;
        self.quantity_required = draft.quantity_required;
        self.minimum_quantity = draft.minimum_quantity;
        self.maximum_quantity = draft.maximum_quantity;
        self.priority = draft.priority;
        self.is_critical = draft.is_critical;
        self.is_optional = draft.is_optional;
        self.build_phase = draft.build_phase;
        self.estimated_unit_cost_cents = draft.estimated_unit_cost_cents;
        self.preferred_vendor = draft.preferred_vendor;
        self.specifications = draft.specifications;
        self.updated_at = now;
        Ok(())
    }

    /// Whether the requirement passes all shape checks. Mirrors the create
    /// path but reports a plain bool for pre-save form validation.
    pub fn is_valid(&self) -> bool {
        self.draft().validate().is_ok()
    }

    pub fn effective_minimum_quantity(&self) -> i64 {
        self.minimum_quantity.unwrap_or(self.quantity_required)
    }

    pub fn effective_maximum_quantity(&self) -> i64 {
        self.maximum_quantity.unwrap_or(self.quantity_required)
    }

    /// A flexible requirement carries a real min/max range.
    pub fn is_flexible_quantity(&self) -> bool {
        matches!(
            (self.minimum_quantity, self.maximum_quantity),
            (Some(min), Some(max)) if min != max
        )
    }

    /// Total estimated cost, preferring the requirement's own estimate over
    /// the part's standard cost.
    pub fn estimated_total_cost_cents(&self, part_unit_cost_cents: Option<i64>) -> i64 {
        let unit = self
            .estimated_unit_cost_cents
            .or(part_unit_cost_cents)
            .unwrap_or(0);
        unit * self.quantity_required
    }

    fn draft(&self) -> RequirementDraft {
        RequirementDraft {
            part_id: self.part_id,
            project_template_id: self.project_template_id,
            task_template_id: self.task_template_id,
            quantity_required: self.quantity_required,
            minimum_quantity: self.minimum_quantity,
            maximum_quantity: self.maximum_quantity,
            priority: self.priority,
            is_critical: self.is_critical,
            is_optional: self.is_optional,
            build_phase: self.build_phase,
            estimated_unit_cost_cents: self.estimated_unit_cost_cents,
            preferred_vendor: self.preferred_vendor.clone(),
            specifications: self.specifications.clone(),
        }
    }
}

impl Entity for PartRequirement {
    type Id = RequirementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
