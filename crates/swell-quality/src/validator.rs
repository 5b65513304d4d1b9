use crate::rules::{default_rules, dimensions, ScoringRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use swell_core::{cache::hash_key, QualityTier, SwellResult, TtlCache};
use tracing::{debug, warn};

// Score a dimension falls back to when its rule errors out.
const NEUTRAL_SCORE: f64 = 0.5;
const PASS_THRESHOLD: f64 = 0.7;

/// Validator configuration: dimension weights and report shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Weight per dimension; missing dimensions are skipped and the
    /// remaining weights renormalized.
    #[serde(default = "default_weights")]
    pub weights: HashMap<String, f64>,
    /// Issues and recommendations retained per report.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Report cache TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_weights() -> HashMap<String, f64> {
    HashMap::from([
        (dimensions::CODE_QUALITY.to_string(), 0.25),
        (dimensions::SECURITY.to_string(), 0.20),
        (dimensions::PERFORMANCE.to_string(), 0.20),
        (dimensions::MAINTAINABILITY.to_string(), 0.20),
        (dimensions::DOCUMENTATION.to_string(), 0.10),
        (dimensions::TEST_COVERAGE.to_string(), 0.05),
    ])
}
fn default_top_n() -> usize {
    5
}
fn default_cache_ttl_secs() -> u64 {
    60
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            top_n: default_top_n(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// The aggregated quality verdict for one piece of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// The validation step the report was produced for.
    pub step: String,
    /// Score per dimension, sorted by dimension name.
    pub dimension_scores: BTreeMap<String, f64>,
    /// Weighted overall score in `[0, 1]`.
    pub overall_score: f64,
    /// Tier derived from the overall score.
    pub tier: QualityTier,
    /// Whether the overall score met the pass threshold.
    pub passed: bool,
    /// Top issues, worst dimensions first.
    pub issues: Vec<String>,
    /// Top recommendations.
    pub recommendations: Vec<String>,
    /// How long validation took, in milliseconds.
    pub duration_ms: f64,
    /// When the report was produced.
    pub produced_at: DateTime<Utc>,
}

/// Scores content along pluggable dimensions and combines them with
/// fixed weights.
///
/// A rule failure degrades its dimension to a neutral score instead of
/// aborting the gate; reports are cached briefly by a hash of
/// `(step, content, context)`.
pub struct QualityValidator {
    rules: Vec<Box<dyn ScoringRule>>,
    config: ValidatorConfig,
    cache: TtlCache<QualityReport>,
}

impl QualityValidator {
    /// Creates a validator with the shipped rule set.
    pub fn new(config: ValidatorConfig) -> SwellResult<Self> {
        let cache = TtlCache::new(Duration::from_secs(config.cache_ttl_secs));
        Ok(Self {
            rules: default_rules()?,
            config,
            cache,
        })
    }

    /// Adds a rule; several rules may contribute to one dimension, in
    /// which case their scores are averaged.
    pub fn register_rule(&mut self, rule: Box<dyn ScoringRule>) {
        self.rules.push(rule);
    }

    /// Scores `content` for the given step and context.
    pub fn validate_quality_gate(
        &self,
        step: &str,
        content: &str,
        context: &str,
    ) -> QualityReport {
        let key = hash_key(&[step, content, context]);
        if let Some(report) = self.cache.get(&key) {
            debug!(step, "Quality report served from cache");
            return report;
        }

        let start = Instant::now();
        let mut per_dimension: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut scored_issues: Vec<(f64, String)> = Vec::new();
        let mut recommendations: Vec<String> = Vec::new();

        for rule in &self.rules {
            let outcome = rule.score(content);
            let rule_score = match outcome {
                Ok(rule_score) => rule_score,
                Err(e) => {
                    warn!(rule = rule.name(), error = %e, "Scoring rule failed; using neutral score");
                    crate::rules::RuleScore {
                        value: NEUTRAL_SCORE,
                        issues: vec![format!("rule '{}' failed to run", rule.name())],
                        recommendations: Vec::new(),
                    }
                }
            };
            per_dimension
                .entry(rule.dimension().to_string())
                .or_default()
                .push(rule_score.value);
            for issue in rule_score.issues {
                scored_issues.push((rule_score.value, issue));
            }
            recommendations.extend(rule_score.recommendations);
        }

        let dimension_scores: BTreeMap<String, f64> = per_dimension
            .into_iter()
            .map(|(dimension, values)| {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                (dimension, mean)
            })
            .collect();

        let mut weighted = 0.0;
        let mut weight_total = 0.0;
        for (dimension, score) in &dimension_scores {
            if let Some(weight) = self.config.weights.get(dimension) {
                weighted += weight * score;
                weight_total += weight;
            }
        }
        let overall_score = if weight_total > 0.0 {
            (weighted / weight_total).clamp(0.0, 1.0)
        } else {
            NEUTRAL_SCORE
        };

        // Worst-scoring findings first.
        scored_issues.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let issues: Vec<String> = scored_issues
            .into_iter()
            .map(|(_, issue)| issue)
            .take(self.config.top_n)
            .collect();
        recommendations.truncate(self.config.top_n);

        let report = QualityReport {
            step: step.to_string(),
            dimension_scores,
            overall_score,
            tier: QualityTier::from_score(overall_score),
            passed: overall_score >= PASS_THRESHOLD,
            issues,
            recommendations,
            duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            produced_at: Utc::now(),
        };
        self.cache.insert(key, report.clone());
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::rules::RuleScore;
    use swell_core::SwellError;

    fn validator() -> QualityValidator {
        QualityValidator::new(ValidatorConfig::default()).unwrap()
    }

    const CLEAN_CONTENT: &str = r#"/// Parses the config file.
fn parse(input: &str) -> Result<Config, Error> {
    // keep the happy path flat
    input.parse().map_err(Into::into)
}

#[test]
fn parse_round_trips() { assert!(parse("a=1").is_ok()); }
"#;

    #[test]
    fn test_clean_content_passes() {
        let report = validator().validate_quality_gate("design_review", CLEAN_CONTENT, "");
        assert!(report.passed, "overall {}", report.overall_score);
        assert!(report.overall_score >= 0.7);
        assert_eq!(report.dimension_scores.len(), 6);
        assert!((0.0..=1.0).contains(&report.overall_score));
    }

    #[test]
    fn test_eval_without_docs_fails_overall() {
        // Security drops sharply and the binary proxies score zero, so
        // the gate fails even though structure alone looks fine.
        let content = "fn run(input: &str) -> Result<String, Error> {\n    let out = eval(input);\n    Ok(out)\n}";
        let report = validator().validate_quality_gate("pre_completion", content, "");
        assert!(report.dimension_scores["security"] <= 0.5);
        assert!(report.overall_score < 0.7);
        assert!(!report.passed);
        assert!(report.issues.iter().any(|i| i.contains("eval")));
    }

    #[test]
    fn test_report_cached_by_step_content_context() {
        let validator = validator();
        let a = validator.validate_quality_gate("step", "fn f() {}", "ctx");
        let b = validator.validate_quality_gate("step", "fn f() {}", "ctx");
        assert_eq!(a.produced_at, b.produced_at); // same cached report

        let c = validator.validate_quality_gate("step", "fn f() {}", "other-ctx");
        assert_ne!(a.produced_at, c.produced_at);
    }

    struct FailingRule;
    impl ScoringRule for FailingRule {
        fn name(&self) -> &str {
            "broken"
        }
        fn dimension(&self) -> &str {
            "reliability"
        }
        fn score(&self, _content: &str) -> swell_core::SwellResult<RuleScore> {
            Err(SwellError::Quality("synthetic failure".into()))
        }
    }

    #[test]
    fn test_failing_rule_degrades_to_neutral() {
        let mut validator = QualityValidator::new(ValidatorConfig {
            weights: HashMap::from([("reliability".to_string(), 1.0)]),
            ..ValidatorConfig::default()
        })
        .unwrap();
        validator.rules.clear();
        validator.register_rule(Box::new(FailingRule));

        let report = validator.validate_quality_gate("step", "anything", "");
        assert_eq!(report.dimension_scores["reliability"], 0.5);
        assert!(!report.passed);
        assert!(report.issues[0].contains("broken"));
    }

    #[test]
    fn test_unweighted_dimensions_are_skipped() {
        // Only security weighted: clean content scores a perfect 1.0.
        let validator = QualityValidator::new(ValidatorConfig {
            weights: HashMap::from([("security".to_string(), 1.0)]),
            ..ValidatorConfig::default()
        })
        .unwrap();
        let report = validator.validate_quality_gate("step", "fn f(a: u32) -> u32 { a }", "");
        assert_eq!(report.overall_score, 1.0);
    }
}
