use crate::validator::{QualityReport, QualityValidator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use swell_core::{SwellError, SwellResult};
use tracing::{info, warn};

/// The named steps of the validation cycle, in execution order.
pub const VALIDATION_STEPS: [&str; 10] = [
    "context_loading",
    "requirement_analysis",
    "design_review",
    "integration_validation",
    "implementation_check",
    "test_execution",
    "regression_scan",
    "pre_completion",
    "documentation_sync",
    "final_signoff",
];

// Trend history bounds: capped at 100, bulk-truncated to the newest 50.
const TREND_CAP: usize = 100;
const TREND_KEEP: usize = 50;
const WARNING_ISSUE_LIMIT: usize = 3;

/// Per-checkpoint gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum overall score required to pass.
    pub min_score: f64,
    /// Dimensions that force FAIL when under `min_score`.
    pub critical_dimensions: Vec<String>,
    /// Advisory validation time budget in milliseconds.
    pub timeout_ms: u64,
}

/// Outcome of one quality-gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Scores met the bar cleanly.
    Pass,
    /// Scores met the bar with a notable issue count.
    PassWithWarnings,
    /// Scores missed the bar or a critical dimension failed.
    Fail,
    /// The step carries no gate.
    Skip,
}

impl GateOutcome {
    /// Whether the outcome lets the cycle proceed.
    pub fn is_passing(self) -> bool {
        matches!(
            self,
            GateOutcome::Pass | GateOutcome::PassWithWarnings | GateOutcome::Skip
        )
    }
}

/// One gate evaluation, appended to the per-step trend history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    /// Step the decision belongs to.
    pub step: String,
    /// The outcome.
    pub outcome: GateOutcome,
    /// The contributing quality report.
    pub report: QualityReport,
    /// Critical dimensions that scored under the checkpoint minimum.
    pub critical_failures: Vec<String>,
    /// Non-fatal notes (unscored critical dimensions, time overruns).
    pub warnings: Vec<String>,
    /// When the decision was made.
    pub decided_at: DateTime<Utc>,
}

/// One named structural check within a standard step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check name.
    pub name: String,
    /// Whether it passed.
    pub passed: bool,
    /// Failure detail, empty when passed.
    pub detail: String,
}

/// The combined result of executing one step of the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name.
    pub step: String,
    /// The step's structural checks.
    pub checks: Vec<CheckResult>,
    /// Whether every structural check passed.
    pub standard_passed: bool,
    /// Gate decision, present only at checkpoint steps.
    pub gate: Option<GateDecision>,
    /// Overall success: standard checks pass and the gate outcome is
    /// passing (SKIP for non-gate steps).
    pub success: bool,
}

/// Direction of the recent score trend for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Scores are rising.
    Improving,
    /// Scores are falling.
    Declining,
    /// Scores are flat.
    Stable,
    /// Fewer than three recorded scores.
    InsufficientData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrendPoint {
    score: f64,
    at: DateTime<Utc>,
}

/// Drives the 10-step validation cycle and its two quality-gate
/// checkpoints.
pub struct QualityGatesCoordinator {
    validator: QualityValidator,
    gate_configs: HashMap<String, GateConfig>,
    trends: HashMap<String, Vec<TrendPoint>>,
}

impl QualityGatesCoordinator {
    /// Creates a coordinator with the default checkpoint placement:
    /// `integration_validation` and `pre_completion`.
    pub fn new(validator: QualityValidator) -> Self {
        let gate_configs = HashMap::from([
            (
                "integration_validation".to_string(),
                GateConfig {
                    min_score: 0.7,
                    critical_dimensions: vec!["security".to_string()],
                    timeout_ms: 2_000,
                },
            ),
            (
                "pre_completion".to_string(),
                GateConfig {
                    min_score: 0.75,
                    critical_dimensions: vec!["security".to_string(), "code_quality".to_string()],
                    timeout_ms: 2_000,
                },
            ),
        ]);
        Self {
            validator,
            gate_configs,
            trends: HashMap::new(),
        }
    }

    /// Replaces the checkpoint configuration.
    pub fn with_gate_configs(mut self, configs: HashMap<String, GateConfig>) -> Self {
        self.gate_configs = configs;
        self
    }

    /// Executes one named step of the cycle against the given content.
    ///
    /// Unknown step names are lookup errors; everything else degrades
    /// into the step result instead of failing.
    pub fn execute_step(
        &mut self,
        step: &str,
        content: &str,
        context: &str,
    ) -> SwellResult<StepResult> {
        if !VALIDATION_STEPS.contains(&step) {
            return Err(SwellError::Quality(format!("unknown validation step: {step}")));
        }

        let checks = standard_checks(step, content);
        let standard_passed = checks.iter().all(|c| c.passed);

        let gate = self
            .gate_configs
            .get(step)
            .cloned()
            .map(|config| self.evaluate_gate(step, content, context, &config));

        let gate_passing = gate
            .as_ref()
            .map(|d| d.outcome.is_passing())
            .unwrap_or(true); // non-gate steps are SKIP by construction

        let score = gate
            .as_ref()
            .map(|d| d.report.overall_score)
            .unwrap_or_else(|| {
                let passed = checks.iter().filter(|c| c.passed).count();
                passed as f64 / checks.len().max(1) as f64
            });
        self.record_trend(step, score);

        let success = standard_passed && gate_passing;
        info!(step, success, standard_passed, "Validation step executed");
        Ok(StepResult {
            step: step.to_string(),
            checks,
            standard_passed,
            gate,
            success,
        })
    }

    fn evaluate_gate(
        &self,
        step: &str,
        content: &str,
        context: &str,
        config: &GateConfig,
    ) -> GateDecision {
        let report = self.validator.validate_quality_gate(step, content, context);

        let mut warnings = Vec::new();
        let mut critical_failures = Vec::new();
        for dimension in &config.critical_dimensions {
            match report.dimension_scores.get(dimension) {
                Some(score) if *score < config.min_score => {
                    critical_failures.push(format!(
                        "critical dimension '{dimension}' scored {score:.2}, below {:.2}",
                        config.min_score
                    ));
                }
                Some(_) => {}
                None => {
                    // Configured critical dimension never got scored:
                    // surfaced, not silently skipped and not fatal.
                    warnings.push(format!("critical dimension '{dimension}' not scored"));
                }
            }
        }
        if report.duration_ms > config.timeout_ms as f64 {
            warnings.push(format!(
                "validation took {:.0}ms, over the {}ms budget",
                report.duration_ms, config.timeout_ms
            ));
        }

        let outcome = if !critical_failures.is_empty() {
            GateOutcome::Fail
        } else if report.overall_score >= config.min_score {
            if report.issues.len() > WARNING_ISSUE_LIMIT {
                GateOutcome::PassWithWarnings
            } else {
                GateOutcome::Pass
            }
        } else {
            GateOutcome::Fail
        };

        if outcome == GateOutcome::Fail {
            warn!(
                step,
                score = report.overall_score,
                critical = critical_failures.len(),
                "Quality gate failed"
            );
        }

        GateDecision {
            step: step.to_string(),
            outcome,
            report,
            critical_failures,
            warnings,
            decided_at: Utc::now(),
        }
    }

    fn record_trend(&mut self, step: &str, score: f64) {
        let history = self.trends.entry(step.to_string()).or_default();
        history.push(TrendPoint {
            score,
            at: Utc::now(),
        });
        if history.len() > TREND_CAP {
            // Bulk truncation: drop the oldest half in one move.
            let start = history.len() - TREND_KEEP;
            history.drain(..start);
        }
    }

    /// Scores recorded for one step, oldest first.
    pub fn trend_scores(&self, step: &str) -> Vec<f64> {
        self.trends
            .get(step)
            .map(|h| h.iter().map(|p| p.score).collect())
            .unwrap_or_default()
    }

    /// Trend direction from the slope of the last five scores.
    pub fn trend_direction(&self, step: &str) -> TrendDirection {
        let scores = self.trend_scores(step);
        if scores.len() < 3 {
            return TrendDirection::InsufficientData;
        }
        let recent: Vec<f64> = scores.iter().rev().take(5).rev().copied().collect();
        let slope = (recent[recent.len() - 1] - recent[0]) / (recent.len() - 1) as f64;
        if slope > 0.01 {
            TrendDirection::Improving
        } else if slope < -0.01 {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }
}

/// Fixed named structural checks per step.
fn standard_checks(step: &str, content: &str) -> Vec<CheckResult> {
    let mut checks = vec![
        check(
            "content_present",
            !content.trim().is_empty(),
            "step content is empty",
        ),
        check(
            "content_within_bounds",
            content.len() <= 200_000,
            "step content exceeds 200k characters",
        ),
    ];
    match step {
        "test_execution" => checks.push(check(
            "mentions_tests",
            content.contains("test") || content.contains("assert"),
            "no test evidence in content",
        )),
        "documentation_sync" => checks.push(check(
            "mentions_documentation",
            content.contains("///") || content.contains("# ") || content.contains("doc"),
            "no documentation evidence in content",
        )),
        _ => {}
    }
    checks
}

fn check(name: &str, passed: bool, fail_detail: &str) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        passed,
        detail: if passed {
            String::new()
        } else {
            fail_detail.to_string()
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::validator::ValidatorConfig;

    fn coordinator() -> QualityGatesCoordinator {
        QualityGatesCoordinator::new(QualityValidator::new(ValidatorConfig::default()).unwrap())
    }

    const GOOD_CONTENT: &str = r#"/// Resolves the routing table for a classified event.
fn resolve(context: &EventContext) -> Result<Route, RouteError> {
    // explicit rules first, hint fallback second
    rules().get(&context.kind).cloned().ok_or(RouteError::NoRule)
}

#[test]
fn resolve_falls_back() { assert!(resolve(&ctx()).is_ok()); }
"#;

    #[test]
    fn test_non_gate_step_runs_standard_checks_only() {
        let mut coordinator = coordinator();
        let result = coordinator
            .execute_step("context_loading", "some step content", "")
            .unwrap();
        assert!(result.standard_passed);
        assert!(result.gate.is_none());
        assert!(result.success);
    }

    #[test]
    fn test_empty_content_fails_standard_checks() {
        let mut coordinator = coordinator();
        let result = coordinator.execute_step("context_loading", "  ", "").unwrap();
        assert!(!result.standard_passed);
        assert!(!result.success);
        assert_eq!(result.checks[0].name, "content_present");
        assert!(!result.checks[0].passed);
    }

    #[test]
    fn test_unknown_step_is_lookup_error() {
        let mut coordinator = coordinator();
        assert!(coordinator.execute_step("not_a_step", "content", "").is_err());
    }

    #[test]
    fn test_gate_step_passes_good_content() {
        let mut coordinator = coordinator();
        let result = coordinator
            .execute_step("integration_validation", GOOD_CONTENT, "")
            .unwrap();
        let gate = result.gate.unwrap();
        assert!(gate.outcome.is_passing());
        assert!(gate.critical_failures.is_empty());
        assert!(result.success);
    }

    #[test]
    fn test_critical_dimension_forces_fail() {
        let mut coordinator = coordinator();
        // eval() tanks security, a critical dimension at this checkpoint,
        // even though structure scores well.
        let content = "fn run(input: &str) -> Result<String, Error> {\n    Ok(eval(input))\n}";
        let result = coordinator
            .execute_step("integration_validation", content, "")
            .unwrap();
        let gate = result.gate.unwrap();
        assert_eq!(gate.outcome, GateOutcome::Fail);
        assert!(gate.critical_failures[0].contains("security"));
        assert!(!result.success);
    }

    #[test]
    fn test_unscored_critical_dimension_warns() {
        let validator = QualityValidator::new(ValidatorConfig::default()).unwrap();
        let mut coordinator = QualityGatesCoordinator::new(validator).with_gate_configs(
            HashMap::from([(
                "integration_validation".to_string(),
                GateConfig {
                    min_score: 0.5,
                    critical_dimensions: vec!["nonexistent".to_string()],
                    timeout_ms: 2_000,
                },
            )]),
        );
        let result = coordinator
            .execute_step("integration_validation", GOOD_CONTENT, "")
            .unwrap();
        let gate = result.gate.unwrap();
        assert!(gate.outcome.is_passing());
        assert!(gate.warnings[0].contains("not scored"));
    }

    #[test]
    fn test_trend_history_bounded() {
        let mut coordinator = coordinator();
        for _ in 0..150 {
            coordinator
                .execute_step("context_loading", "repeated content", "")
                .unwrap();
        }
        let scores = coordinator.trend_scores("context_loading");
        assert!(scores.len() <= TREND_CAP);
        // Bulk truncation leaves at least the keep window.
        assert!(scores.len() >= TREND_KEEP);
    }

    #[test]
    fn test_trend_direction() {
        let mut coordinator = coordinator();
        for score in [0.5, 0.6, 0.7, 0.8, 0.9] {
            coordinator.record_trend("design_review", score);
        }
        assert_eq!(
            coordinator.trend_direction("design_review"),
            TrendDirection::Improving
        );

        for score in [0.9, 0.7, 0.5, 0.3, 0.1] {
            coordinator.record_trend("regression_scan", score);
        }
        assert_eq!(
            coordinator.trend_direction("regression_scan"),
            TrendDirection::Declining
        );

        coordinator.record_trend("final_signoff", 0.8);
        assert_eq!(
            coordinator.trend_direction("final_signoff"),
            TrendDirection::InsufficientData
        );

        for _ in 0..5 {
            coordinator.record_trend("context_loading", 0.8);
        }
        assert_eq!(
            coordinator.trend_direction("context_loading"),
            TrendDirection::Stable
        );
    }

    #[test]
    fn test_full_cycle_runs_every_step() {
        let mut coordinator = coordinator();
        for step in VALIDATION_STEPS {
            let result = coordinator.execute_step(step, GOOD_CONTENT, "cycle").unwrap();
            assert!(result.success, "step {step} failed");
        }
        // Gates fired only at the two checkpoints.
        assert_eq!(coordinator.trend_scores("integration_validation").len(), 1);
    }
}
