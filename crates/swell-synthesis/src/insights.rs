use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use swell_results::CollectedResult;

/// A short text fragment extracted from one agent's result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    /// Agent type the fragment came from.
    pub agent_type: String,
    /// The fragment itself.
    pub text: String,
    /// Validation score of the source result, used for ranking.
    pub source_score: f64,
}

// Fragments shorter than this are noise; longer ones are paragraphs,
// not insights.
const MIN_FRAGMENT_LEN: usize = 15;
const MAX_FRAGMENT_LEN: usize = 240;

/// Extracts ranked insights from a slice of collected results.
///
/// Structured fields (`insights`, `key_findings`, `summary`) are
/// preferred; free text is sentence-split as a fallback. Output is
/// capped per agent and in total, best source scores first.
pub fn extract_key_insights(
    results: &[&CollectedResult],
    per_agent_cap: usize,
    total_cap: usize,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    let mut per_agent: HashMap<&str, usize> = HashMap::new();

    let mut ranked: Vec<&&CollectedResult> = results.iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for result in ranked {
        let taken = per_agent.entry(result.agent_id.as_str()).or_insert(0);
        for fragment in fragments_of(&result.payload) {
            if *taken >= per_agent_cap || insights.len() >= total_cap {
                break;
            }
            insights.push(Insight {
                agent_type: result.agent_type.clone(),
                text: fragment,
                source_score: result.score,
            });
            *taken += 1;
        }
        if insights.len() >= total_cap {
            break;
        }
    }
    insights
}

fn fragments_of(payload: &serde_json::Value) -> Vec<String> {
    // Structured fields first.
    for field in ["insights", "key_findings"] {
        if let Some(items) = payload.get(field).and_then(|v| v.as_array()) {
            let fragments: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| usable(s))
                .collect();
            if !fragments.is_empty() {
                return fragments;
            }
        }
    }
    if let Some(summary) = payload.get("summary").and_then(|v| v.as_str()) {
        if usable(summary.trim()) {
            return vec![summary.trim().to_string()];
        }
    }

    // Fallback: sentence-split the free-text content.
    let content = payload
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    content
        .split_inclusive(['.', '!', '?'])
        .map(|s| s.trim().trim_end_matches(['.', '!', '?']).to_string())
        .filter(|s| usable(s))
        .collect()
}

fn usable(fragment: &str) -> bool {
    (MIN_FRAGMENT_LEN..=MAX_FRAGMENT_LEN).contains(&fragment.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use swell_results::ValidationStatus;
    use uuid::Uuid;

    fn result(agent_id: &str, agent_type: &str, score: f64, payload: serde_json::Value) -> CollectedResult {
        CollectedResult {
            id: Uuid::new_v4(),
            agent_id: agent_id.to_string(),
            agent_type: agent_type.to_string(),
            wave: 1,
            collected_at: Utc::now(),
            status: ValidationStatus::Validated,
            score,
            payload,
            issues: vec![],
        }
    }

    #[test]
    fn test_structured_insights_preferred() {
        let r = result(
            "a1",
            "researcher",
            0.9,
            json!({
                "insights": ["The cache layer is the throughput bottleneck", "Retries mask the real failure"],
                "content": "Lots of prose that should be ignored. It goes on and on."
            }),
        );
        let insights = extract_key_insights(&[&r], 5, 20);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].agent_type, "researcher");
        assert!(insights[0].text.contains("cache layer"));
    }

    #[test]
    fn test_sentence_split_fallback() {
        let r = result(
            "a1",
            "analyst",
            0.8,
            json!({
                "content": "The first finding stands on its own. ok. The second finding is also substantial enough to keep."
            }),
        );
        let insights = extract_key_insights(&[&r], 5, 20);
        assert_eq!(insights.len(), 2);
        assert!(insights[1].text.contains("second finding"));
    }

    #[test]
    fn test_per_agent_cap() {
        let r = result(
            "a1",
            "analyst",
            0.8,
            json!({
                "insights": [
                    "First insight of suitable length here",
                    "Second insight of suitable length here",
                    "Third insight of suitable length here",
                ]
            }),
        );
        let insights = extract_key_insights(&[&r], 2, 20);
        assert_eq!(insights.len(), 2);
    }

    #[test]
    fn test_total_cap_and_score_ranking() {
        let low = result("low", "coder", 0.5, json!({"insights": ["Low-score agent insight text"]}));
        let high = result("high", "coder", 0.95, json!({"insights": ["High-score agent insight text"]}));
        let insights = extract_key_insights(&[&low, &high], 5, 1);
        assert_eq!(insights.len(), 1);
        assert!(insights[0].text.starts_with("High-score"));
    }
}
