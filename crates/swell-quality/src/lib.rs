//! Quality scoring and gate enforcement.
//!
//! Content is scored along independent dimensions by pluggable, named
//! scoring rules; the validator combines them with fixed weights into an
//! overall score, tier, and recommendations. The gates coordinator
//! drives a 10-step validation cycle with two designated quality-gate
//! checkpoints and bounded per-step score trends.
//!
//! # Main types
//!
//! - [`ScoringRule`] — One named, swappable scoring dimension.
//! - [`QualityValidator`] — Weighted aggregation with brief caching.
//! - [`QualityGatesCoordinator`] — The 10-step cycle and its checkpoints.

/// The 10-step cycle and gate decisions.
pub mod gates;
/// Named scoring rules and their default implementations.
pub mod rules;
/// Weighted aggregation into quality reports.
pub mod validator;

pub use gates::{
    CheckResult, GateConfig, GateDecision, GateOutcome, QualityGatesCoordinator, StepResult,
    TrendDirection,
};
pub use rules::{default_rules, RuleScore, ScoringRule};
pub use validator::{QualityReport, QualityValidator, ValidatorConfig};
