use regex::Regex;
use swell_core::{SwellError, SwellResult};

/// Dimension names used by the shipped rules and the default weights.
pub mod dimensions {
    /// Structural code quality.
    pub const CODE_QUALITY: &str = "code_quality";
    /// Security-risk pattern matching.
    pub const SECURITY: &str = "security";
    /// Performance-risk pattern matching.
    pub const PERFORMANCE: &str = "performance";
    /// Maintainability heuristics.
    pub const MAINTAINABILITY: &str = "maintainability";
    /// Documentation presence proxy.
    pub const DOCUMENTATION: &str = "documentation";
    /// Test-coverage presence proxy.
    pub const TEST_COVERAGE: &str = "test_coverage";
}

/// Output of one scoring rule.
#[derive(Debug, Clone)]
pub struct RuleScore {
    /// Score in `[0, 1]`.
    pub value: f64,
    /// Issues found, worst first.
    pub issues: Vec<String>,
    /// Suggested remediations.
    pub recommendations: Vec<String>,
}

impl RuleScore {
    /// A clean score with no findings.
    pub fn clean(value: f64) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// One named, independently testable scoring dimension.
///
/// Rules can be swapped, added, and weighted without touching the
/// aggregator.
pub trait ScoringRule: Send + Sync {
    /// Rule name, unique within a validator.
    fn name(&self) -> &str;
    /// Dimension this rule contributes to.
    fn dimension(&self) -> &str;
    /// Scores the content. A failing rule degrades its dimension to a
    /// neutral value at the aggregator instead of aborting the gate.
    fn score(&self, content: &str) -> SwellResult<RuleScore>;
}

fn pattern(name: &str, re: &str) -> SwellResult<Regex> {
    Regex::new(re).map_err(|e| SwellError::Quality(format!("{name} pattern: {e}")))
}

// --- Structural code quality ---

/// Additive scoring over structural signals: typed signatures and error
/// handling raise the score, oversized units lower it.
pub struct StructureRule {
    typed_signature: Regex,
    error_handling: Regex,
}

impl StructureRule {
    /// Builds the rule's patterns.
    pub fn new() -> SwellResult<Self> {
        Ok(Self {
            typed_signature: pattern("typed-signature", r"fn\s+\w+\s*\([^)]*:\s*[\w&<>]|->\s*[\w<>]|:\s*[A-Z]\w+")?,
            error_handling: pattern("error-handling", r"Result<|\?;|\.map_err|match\s+|try\s*\{|except\s")?,
        })
    }
}

impl ScoringRule for StructureRule {
    fn name(&self) -> &str {
        "structure"
    }

    fn dimension(&self) -> &str {
        dimensions::CODE_QUALITY
    }

    fn score(&self, content: &str) -> SwellResult<RuleScore> {
        let mut score: f64 = 0.7;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if self.typed_signature.is_match(content) {
            score += 0.15;
        } else {
            recommendations.push("add type annotations to public signatures".to_string());
        }
        if self.error_handling.is_match(content) {
            score += 0.15;
        } else {
            recommendations.push("handle error paths explicitly".to_string());
        }
        let line_count = content.lines().count();
        if line_count > 400 {
            score -= 0.2;
            issues.push(format!("unit is very large ({line_count} lines)"));
            recommendations.push("split the unit into smaller modules".to_string());
        }

        Ok(RuleScore {
            value: score.clamp(0.0, 1.0),
            issues,
            recommendations,
        })
    }
}

// --- Security-risk patterns ---

/// Subtractive scoring over dangerous-call and leaked-secret patterns.
pub struct SecurityRule {
    dangerous_call: Regex,
    shell_injection: Regex,
    hardcoded_secret: Regex,
}

impl SecurityRule {
    /// Builds the rule's patterns.
    pub fn new() -> SwellResult<Self> {
        Ok(Self {
            dangerous_call: pattern("dangerous-call", r"\beval\s*\(|\bexec\s*\(|os\.system\s*\(")?,
            shell_injection: pattern(
                "shell-injection",
                r"shell\s*=\s*True|Command::new\([^)]*\bsh\b|rm\s+-rf",
            )?,
            hardcoded_secret: pattern(
                "hardcoded-secret",
                r#"(?i)(password|api_key|secret|token)\s*[:=]\s*["'][^"']{4,}"#,
            )?,
        })
    }
}

impl ScoringRule for SecurityRule {
    fn name(&self) -> &str {
        "security_patterns"
    }

    fn dimension(&self) -> &str {
        dimensions::SECURITY
    }

    fn score(&self, content: &str) -> SwellResult<RuleScore> {
        let mut score: f64 = 1.0;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if self.dangerous_call.is_match(content) {
            score -= 0.5;
            issues.push("dynamic code execution call (eval/exec/system)".to_string());
            recommendations.push("replace dynamic execution with explicit dispatch".to_string());
        }
        if self.shell_injection.is_match(content) {
            score -= 0.3;
            issues.push("shell execution pattern with injection risk".to_string());
            recommendations.push("pass arguments without going through a shell".to_string());
        }
        if self.hardcoded_secret.is_match(content) {
            score -= 0.3;
            issues.push("credential-looking literal in content".to_string());
            recommendations.push("move secrets into configuration".to_string());
        }

        Ok(RuleScore {
            value: score.clamp(0.0, 1.0),
            issues,
            recommendations,
        })
    }
}

// --- Performance-risk patterns ---

/// Subtractive scoring over patterns that tend to cost at runtime.
pub struct PerformanceRule {
    nested_loop: Regex,
    sleep_in_loop: Regex,
    unbounded_select: Regex,
}

impl PerformanceRule {
    /// Builds the rule's patterns.
    pub fn new() -> SwellResult<Self> {
        Ok(Self {
            nested_loop: pattern("nested-loop", r"(?s)for\s.{0,200}?\bfor\s")?,
            sleep_in_loop: pattern("sleep-in-loop", r"(?s)(for|while|loop)\s.{0,120}?sleep")?,
            unbounded_select: pattern("unbounded-select", r"(?i)select\s+\*\s+from")?,
        })
    }
}

impl ScoringRule for PerformanceRule {
    fn name(&self) -> &str {
        "performance_patterns"
    }

    fn dimension(&self) -> &str {
        dimensions::PERFORMANCE
    }

    fn score(&self, content: &str) -> SwellResult<RuleScore> {
        let mut score: f64 = 0.9;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if self.nested_loop.is_match(content) {
            score -= 0.15;
            issues.push("nested iteration detected".to_string());
            recommendations.push("check the nested loop's complexity against input sizes".to_string());
        }
        if self.sleep_in_loop.is_match(content) {
            score -= 0.2;
            issues.push("sleep inside a loop".to_string());
            recommendations.push("replace polling sleeps with notification or backoff".to_string());
        }
        if self.unbounded_select.is_match(content) {
            score -= 0.1;
            issues.push("unbounded select-star query".to_string());
        }

        Ok(RuleScore {
            value: score.clamp(0.0, 1.0),
            issues,
            recommendations,
        })
    }
}

// --- Maintainability ---

/// Heuristics for how workable the content stays over time.
pub struct MaintainabilityRule {
    comment_line: Regex,
    debt_marker: Regex,
    deep_nesting: Regex,
}

impl MaintainabilityRule {
    /// Builds the rule's patterns.
    pub fn new() -> SwellResult<Self> {
        Ok(Self {
            comment_line: pattern("comment-line", r"(?m)^\s*(//|#)\s*\S")?,
            debt_marker: pattern("debt-marker", r"TODO|FIXME|HACK|XXX")?,
            deep_nesting: pattern("deep-nesting", r"(?m)^ {20,}\S")?,
        })
    }
}

impl ScoringRule for MaintainabilityRule {
    fn name(&self) -> &str {
        "maintainability"
    }

    fn dimension(&self) -> &str {
        dimensions::MAINTAINABILITY
    }

    fn score(&self, content: &str) -> SwellResult<RuleScore> {
        let mut score: f64 = 0.8;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if self.comment_line.is_match(content) {
            score += 0.1;
        }
        let debt_count = self.debt_marker.find_iter(content).count();
        if debt_count > 3 {
            score -= 0.2;
            issues.push(format!("{debt_count} unresolved debt markers"));
            recommendations.push("resolve or ticket the outstanding TODO items".to_string());
        }
        if self.deep_nesting.is_match(content) {
            score -= 0.1;
            issues.push("deeply nested block".to_string());
            recommendations.push("flatten control flow with early returns".to_string());
        }

        Ok(RuleScore {
            value: score.clamp(0.0, 1.0),
            issues,
            recommendations,
        })
    }
}

// --- Documentation proxy (binary) ---

/// Coarse binary check: does any documentation exist at all?
pub struct DocumentationRule {
    doc_marker: Regex,
}

impl DocumentationRule {
    /// Builds the rule's pattern.
    pub fn new() -> SwellResult<Self> {
        Ok(Self {
            doc_marker: pattern("doc-marker", r#"///|//!|"""|'''|/\*\*"#)?,
        })
    }
}

impl ScoringRule for DocumentationRule {
    fn name(&self) -> &str {
        "documentation"
    }

    fn dimension(&self) -> &str {
        dimensions::DOCUMENTATION
    }

    fn score(&self, content: &str) -> SwellResult<RuleScore> {
        if self.doc_marker.is_match(content) {
            Ok(RuleScore::clean(1.0))
        } else {
            Ok(RuleScore {
                value: 0.0,
                issues: vec!["no documentation present".to_string()],
                recommendations: vec!["document the public surface".to_string()],
            })
        }
    }
}

// --- Test-coverage proxy (binary) ---

/// Coarse binary check: do any test markers exist at all?
pub struct TestCoverageRule {
    test_marker: Regex,
}

impl TestCoverageRule {
    /// Builds the rule's pattern.
    pub fn new() -> SwellResult<Self> {
        Ok(Self {
            test_marker: pattern("test-marker", r"#\[test\]|#\[tokio::test\]|def test_|\bassert")?,
        })
    }
}

impl ScoringRule for TestCoverageRule {
    fn name(&self) -> &str {
        "test_coverage"
    }

    fn dimension(&self) -> &str {
        dimensions::TEST_COVERAGE
    }

    fn score(&self, content: &str) -> SwellResult<RuleScore> {
        if self.test_marker.is_match(content) {
            Ok(RuleScore::clean(1.0))
        } else {
            Ok(RuleScore {
                value: 0.0,
                issues: vec!["no test markers present".to_string()],
                recommendations: vec!["cover the change with tests".to_string()],
            })
        }
    }
}

/// The shipped rule set, one rule per dimension.
pub fn default_rules() -> SwellResult<Vec<Box<dyn ScoringRule>>> {
    Ok(vec![
        Box::new(StructureRule::new()?),
        Box::new(SecurityRule::new()?),
        Box::new(PerformanceRule::new()?),
        Box::new(MaintainabilityRule::new()?),
        Box::new(DocumentationRule::new()?),
        Box::new(TestCoverageRule::new()?),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_security_rule_drops_sharply_on_eval() {
        let rule = SecurityRule::new().unwrap();
        let clean = rule.score("fn add(a: u32, b: u32) -> u32 { a + b }").unwrap();
        assert_eq!(clean.value, 1.0);

        let risky = rule.score("result = eval(user_input)").unwrap();
        assert!(risky.value <= 0.5);
        assert!(risky.issues[0].contains("eval"));
    }

    #[test]
    fn test_security_rule_flags_secrets() {
        let rule = SecurityRule::new().unwrap();
        let scored = rule.score(r#"let api_key = "sk-abcdef123456";"#).unwrap();
        assert!(scored.value < 1.0);
        assert!(scored.issues.iter().any(|i| i.contains("credential")));
    }

    #[test]
    fn test_structure_rule_rewards_types_and_errors() {
        let rule = StructureRule::new().unwrap();
        let typed = rule
            .score("fn parse(input: &str) -> Result<Config, Error> { input.parse().map_err(Into::into) }")
            .unwrap();
        assert!(typed.value >= 0.9);

        let untyped = rule.score("x = compute(y)").unwrap();
        assert!(untyped.value < typed.value);
        assert_eq!(untyped.recommendations.len(), 2);
    }

    #[test]
    fn test_performance_rule_flags_sleep_in_loop() {
        let rule = PerformanceRule::new().unwrap();
        let scored = rule
            .score("loop {\n    check();\n    sleep(Duration::from_millis(100));\n}")
            .unwrap();
        assert!(scored.value < 0.9);
        assert!(scored.issues.iter().any(|i| i.contains("sleep")));
    }

    #[test]
    fn test_maintainability_rule_counts_debt() {
        let rule = MaintainabilityRule::new().unwrap();
        let heavy = rule
            .score("// TODO a\n// TODO b\n// FIXME c\n// HACK d\nfn f() {}")
            .unwrap();
        assert!(heavy.issues.iter().any(|i| i.contains("debt markers")));
    }

    #[test]
    fn test_binary_proxies() {
        let docs = DocumentationRule::new().unwrap();
        assert_eq!(docs.score("/// Documented.\nfn f() {}").unwrap().value, 1.0);
        assert_eq!(docs.score("fn f() {}").unwrap().value, 0.0);

        let tests = TestCoverageRule::new().unwrap();
        assert_eq!(tests.score("#[test]\nfn t() {}").unwrap().value, 1.0);
        assert_eq!(tests.score("fn f() {}").unwrap().value, 0.0);
    }

    #[test]
    fn test_default_rules_cover_all_dimensions() {
        let rules = default_rules().unwrap();
        let dims: std::collections::HashSet<&str> = rules.iter().map(|r| r.dimension()).collect();
        assert_eq!(dims.len(), 6);
    }
}
