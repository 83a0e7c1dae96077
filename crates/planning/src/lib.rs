//! `pitstock-planning` — part requirements declared by planning templates.
//!
//! A [`PartRequirement`] states how many units of a part a project or task
//! template needs, in which build phase, and how negotiable the need is. The
//! fulfillment engine in `pitstock-infra` evaluates these against live stock.

pub mod requirement;

pub use requirement::{BuildPhase, PartRequirement, RequirementDraft, RequirementPriority};
