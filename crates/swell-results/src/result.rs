use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of validating one agent result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Structure and score requirements were met.
    Validated,
    /// The result was stored but did not meet requirements.
    Failed,
}

/// One collected agent output with its validation verdict.
///
/// Immutable after collection apart from index removal during cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedResult {
    /// Unique id of this collection record.
    pub id: Uuid,
    /// Id of the agent that produced the payload.
    pub agent_id: String,
    /// Agent type, from explicit fields or free-text inference.
    pub agent_type: String,
    /// Wave the result belongs to.
    pub wave: u32,
    /// When the result was collected.
    pub collected_at: DateTime<Utc>,
    /// Validation verdict.
    pub status: ValidationStatus,
    /// Validation score in `[0, 1]`.
    pub score: f64,
    /// The raw payload as delivered by the agent.
    pub payload: serde_json::Value,
    /// Validation issues, empty for a clean result.
    pub issues: Vec<String>,
}

/// Aggregate statistics for one wave's collected results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveSummary {
    /// Wave number.
    pub wave: u32,
    /// Results collected for the wave.
    pub total_results: usize,
    /// Results that passed validation.
    pub valid_results: usize,
    /// `valid_results / total_results`, zero for an empty wave.
    pub success_rate: f64,
    /// Mean validation score across all results.
    pub average_score: f64,
    /// Distinct agent types, sorted.
    pub agent_types: Vec<String>,
    /// Earliest collection time.
    pub first_collected: Option<DateTime<Utc>>,
    /// Latest collection time.
    pub last_collected: Option<DateTime<Utc>>,
}
