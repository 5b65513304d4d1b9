use crate::result::{CollectedResult, ValidationStatus, WaveSummary};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use swell_core::{SwellError, SwellResult};
use tracing::debug;
use uuid::Uuid;

/// Structural and size rules applied to every collected result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Top-level fields every result payload must carry.
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,
    /// Minimum content length in characters.
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,
    /// Maximum content length in characters.
    #[serde(default = "default_max_content_len")]
    pub max_content_len: usize,
    /// Highest wave number considered valid.
    #[serde(default = "default_max_wave")]
    pub max_wave: u32,
}

fn default_required_fields() -> Vec<String> {
    vec!["content".to_string(), "status".to_string()]
}
fn default_min_content_len() -> usize {
    20
}
fn default_max_content_len() -> usize {
    50_000
}
fn default_max_wave() -> u32 {
    100
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            required_fields: default_required_fields(),
            min_content_len: default_min_content_len(),
            max_content_len: default_max_content_len(),
            max_wave: default_max_wave(),
        }
    }
}

// Fixed score penalties per violation class.
const PENALTY_MISSING_FIELD: f64 = 0.3;
const PENALTY_CONTENT_LENGTH: f64 = 0.6;
const PENALTY_WAVE_RANGE: f64 = 0.2;
const VALIDATION_MINIMUM: f64 = 0.7;

/// Validates, scores, and indexes agent results.
///
/// Callers own the surrounding lock; the collector itself is a plain
/// `&mut self` store like the rest of the pipeline's owned state.
pub struct ResultCollector {
    rules: ValidationRules,
    by_id: HashMap<Uuid, CollectedResult>,
    by_wave: HashMap<u32, Vec<Uuid>>,
    by_type: HashMap<String, Vec<Uuid>>,
    wave_re: Regex,
    type_re: Regex,
}

impl ResultCollector {
    /// Creates a collector with the given rules.
    pub fn new(rules: ValidationRules) -> SwellResult<Self> {
        let wave_re = Regex::new(r"(?i)\bwave[ _-]?(\d+)\b")
            .map_err(|e| SwellError::Collector(format!("wave pattern: {e}")))?;
        let type_re = Regex::new(
            r"(?i)\b(researcher|analyst|architect|coder|implementer|tester|reviewer|optimizer)\b",
        )
        .map_err(|e| SwellError::Collector(format!("type pattern: {e}")))?;
        Ok(Self {
            rules,
            by_id: HashMap::new(),
            by_wave: HashMap::new(),
            by_type: HashMap::new(),
            wave_re,
            type_re,
        })
    }

    /// Validates and stores one agent result, returning the stored record.
    ///
    /// Never fails on malformed payloads: every violation becomes a score
    /// penalty and an issue string on the record.
    pub fn collect(&mut self, agent_id: &str, result_data: serde_json::Value) -> CollectedResult {
        let mut issues = Vec::new();
        let mut score = 1.0f64;
        let mut missing_required = false;

        let object = result_data.as_object();

        // Wave and agent type: explicit fields first, then free text,
        // then the agent id itself.
        let text = content_text(&result_data);
        let wave = object
            .and_then(|o| o.get("wave"))
            .and_then(|v| v.as_u64())
            .map(|w| w as u32)
            .or_else(|| self.extract_wave(&text))
            .or_else(|| self.extract_wave(agent_id))
            .unwrap_or(0);
        let agent_type = object
            .and_then(|o| o.get("agent_type"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_lowercase())
            .or_else(|| self.extract_type(&text))
            .or_else(|| self.extract_type(agent_id))
            .unwrap_or_else(|| "unknown".to_string());

        for field in &self.rules.required_fields {
            if object.map(|o| !o.contains_key(field)).unwrap_or(true) {
                issues.push(format!("missing required field '{field}'"));
                score -= PENALTY_MISSING_FIELD;
                missing_required = true;
            }
        }

        if text.trim().is_empty() {
            issues.push("empty payload".to_string());
            score -= PENALTY_CONTENT_LENGTH;
        } else if text.len() < self.rules.min_content_len {
            issues.push(format!(
                "content length {} below minimum {}",
                text.len(),
                self.rules.min_content_len
            ));
            score -= PENALTY_CONTENT_LENGTH;
        } else if text.len() > self.rules.max_content_len {
            issues.push(format!(
                "content length {} above maximum {}",
                text.len(),
                self.rules.max_content_len
            ));
            score -= PENALTY_CONTENT_LENGTH;
        }

        if wave == 0 || wave > self.rules.max_wave {
            issues.push(format!("wave {wave} outside valid range"));
            score -= PENALTY_WAVE_RANGE;
        }

        let score = score.clamp(0.0, 1.0);
        let status = if score >= VALIDATION_MINIMUM && !missing_required {
            ValidationStatus::Validated
        } else {
            ValidationStatus::Failed
        };

        let record = CollectedResult {
            id: Uuid::new_v4(),
            agent_id: agent_id.to_string(),
            agent_type: agent_type.clone(),
            wave,
            collected_at: Utc::now(),
            status,
            score,
            payload: result_data,
            issues,
        };
        debug!(
            agent = agent_id,
            wave,
            score,
            status = ?status,
            "Collected result"
        );

        self.by_wave.entry(wave).or_default().push(record.id);
        self.by_type.entry(agent_type).or_default().push(record.id);
        self.by_id.insert(record.id, record.clone());
        record
    }

    fn extract_wave(&self, text: &str) -> Option<u32> {
        self.wave_re
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn extract_type(&self, text: &str) -> Option<String> {
        self.type_re
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
    }

    /// Results for one wave in collection order, optionally including
    /// those that failed validation.
    pub fn get_wave_results(&self, wave: u32, include_invalid: bool) -> Vec<&CollectedResult> {
        let ids = match self.by_wave.get(&wave) {
            Some(ids) => ids,
            None => return Vec::new(),
        };
        ids.iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|r| include_invalid || r.status == ValidationStatus::Validated)
            .collect()
    }

    /// Aggregate statistics for one wave across all its results.
    pub fn get_result_summary(&self, wave: u32) -> WaveSummary {
        let results = self.get_wave_results(wave, true);
        let total = results.len();
        let valid = results
            .iter()
            .filter(|r| r.status == ValidationStatus::Validated)
            .count();
        let mut agent_types: Vec<String> = results
            .iter()
            .map(|r| r.agent_type.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        agent_types.sort();
        WaveSummary {
            wave,
            total_results: total,
            valid_results: valid,
            success_rate: if total == 0 {
                0.0
            } else {
                valid as f64 / total as f64
            },
            average_score: if total == 0 {
                0.0
            } else {
                results.iter().map(|r| r.score).sum::<f64>() / total as f64
            },
            agent_types,
            first_collected: results.iter().map(|r| r.collected_at).min(),
            last_collected: results.iter().map(|r| r.collected_at).max(),
        }
    }

    /// Looks up one result by id.
    pub fn get(&self, id: Uuid) -> Option<&CollectedResult> {
        self.by_id.get(&id)
    }

    /// Removes results older than `max_age` from all three indices.
    /// Returns how many were removed.
    pub fn cleanup_old_results(&mut self, max_age: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::zero());
        let expired: Vec<Uuid> = self
            .by_id
            .values()
            .filter(|r| r.collected_at <= cutoff)
            .map(|r| r.id)
            .collect();
        for id in &expired {
            self.by_id.remove(id);
        }
        for ids in self.by_wave.values_mut() {
            ids.retain(|id| !expired.contains(id));
        }
        self.by_wave.retain(|_, ids| !ids.is_empty());
        for ids in self.by_type.values_mut() {
            ids.retain(|id| !expired.contains(id));
        }
        self.by_type.retain(|_, ids| !ids.is_empty());
        expired.len()
    }

    /// Total stored results.
    pub fn result_count(&self) -> usize {
        self.by_id.len()
    }

    /// Stored result counts per agent type.
    pub fn type_counts(&self) -> HashMap<String, usize> {
        self.by_type
            .iter()
            .map(|(t, ids)| (t.clone(), ids.len()))
            .collect()
    }
}

fn content_text(value: &serde_json::Value) -> String {
    match value.get("content") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collector() -> ResultCollector {
        ResultCollector::new(ValidationRules::default()).unwrap()
    }

    fn good_payload(wave: u32, agent_type: &str) -> serde_json::Value {
        json!({
            "wave": wave,
            "agent_type": agent_type,
            "status": "complete",
            "content": "Scanned the target module and catalogued its public API surface in detail.",
        })
    }

    #[test]
    fn test_valid_result_scores_full() {
        let mut collector = collector();
        let record = collector.collect("wave1-researcher-1", good_payload(1, "researcher"));
        assert_eq!(record.status, ValidationStatus::Validated);
        assert_eq!(record.score, 1.0);
        assert_eq!(record.wave, 1);
        assert_eq!(record.agent_type, "researcher");
        assert!(record.issues.is_empty());
    }

    #[test]
    fn test_missing_required_field_never_validated() {
        let mut collector = collector();
        // Long enough content, but no "status" field.
        let record = collector.collect(
            "wave1-coder-1",
            json!({
                "wave": 1,
                "agent_type": "coder",
                "content": "Implemented the requested changes and verified them against the checklist.",
            }),
        );
        assert_eq!(record.status, ValidationStatus::Failed);
        assert!(record.score >= 0.0 && record.score <= 1.0);
        assert!(record.issues[0].contains("status"));
    }

    #[test]
    fn test_short_content_penalty() {
        let mut collector = collector();
        let record = collector.collect(
            "wave1-tester-1",
            json!({"wave": 1, "agent_type": "tester", "status": "ok", "content": "short"}),
        );
        assert_eq!(record.status, ValidationStatus::Failed);
        assert!((record.score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_metadata_extracted_from_free_text() {
        let mut collector = collector();
        let record = collector.collect(
            "agent-7",
            json!({
                "status": "done",
                "content": "As the reviewer for wave 3, I checked the proposed interfaces end to end.",
            }),
        );
        assert_eq!(record.wave, 3);
        assert_eq!(record.agent_type, "reviewer");
    }

    #[test]
    fn test_metadata_falls_back_to_agent_id() {
        let mut collector = collector();
        let record = collector.collect(
            "wave2-analyst-17",
            json!({"status": "done", "content": "Numbers tallied across the full sample set without anomalies."}),
        );
        assert_eq!(record.wave, 2);
        assert_eq!(record.agent_type, "analyst");
    }

    #[test]
    fn test_wave_summary_scenario() {
        // Three agents in wave 1; the last fails the minimum-size check.
        let mut collector = collector();
        collector.collect("wave1-researcher-1", good_payload(1, "researcher"));
        collector.collect("wave1-analyst-1", good_payload(1, "analyst"));
        collector.collect(
            "wave1-tester-1",
            json!({"wave": 1, "agent_type": "tester", "status": "ok", "content": "tiny"}),
        );

        let summary = collector.get_result_summary(1);
        assert_eq!(summary.total_results, 3);
        assert_eq!(summary.valid_results, 2);
        assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(summary.agent_types, vec!["analyst", "researcher", "tester"]);
        assert!(summary.first_collected.is_some());
    }

    #[test]
    fn test_get_wave_results_filters_invalid() {
        let mut collector = collector();
        collector.collect("wave1-researcher-1", good_payload(1, "researcher"));
        collector.collect(
            "wave1-tester-1",
            json!({"wave": 1, "agent_type": "tester", "status": "ok", "content": "tiny"}),
        );
        assert_eq!(collector.get_wave_results(1, false).len(), 1);
        assert_eq!(collector.get_wave_results(1, true).len(), 2);
        assert!(collector.get_wave_results(9, true).is_empty());
    }

    #[test]
    fn test_reads_idempotent() {
        let mut collector = collector();
        collector.collect("wave1-researcher-1", good_payload(1, "researcher"));
        let a = collector.get_result_summary(1);
        let b = collector.get_result_summary(1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cleanup_consistent_across_indices() {
        let mut collector = collector();
        collector.collect("wave1-researcher-1", good_payload(1, "researcher"));
        collector.collect("wave2-coder-1", good_payload(2, "coder"));
        assert_eq!(collector.result_count(), 2);

        let removed = collector.cleanup_old_results(Duration::ZERO);
        assert_eq!(removed, 2);
        assert_eq!(collector.result_count(), 0);
        assert!(collector.get_wave_results(1, true).is_empty());
        assert!(collector.type_counts().is_empty());
    }

    #[test]
    fn test_cleanup_keeps_fresh_results() {
        let mut collector = collector();
        collector.collect("wave1-researcher-1", good_payload(1, "researcher"));
        let removed = collector.cleanup_old_results(Duration::from_secs(3600));
        assert_eq!(removed, 0);
        assert_eq!(collector.result_count(), 1);
    }

    #[test]
    fn test_non_object_payload_degrades_gracefully() {
        let mut collector = collector();
        let record = collector.collect("agent-x", json!("just a bare string"));
        assert_eq!(record.status, ValidationStatus::Failed);
        assert!(record.score >= 0.0);
        assert!(!record.issues.is_empty());
    }
}
