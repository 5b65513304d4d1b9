//! Core types and error definitions for the Swell orchestration pipeline.
//!
//! This crate provides the foundational types shared across all Swell crates:
//! the unified error enum, the uniform result envelope every pipeline entry
//! point returns, inbound event types, and the TTL cache abstraction used by
//! the synthesis and quality subsystems.
//!
//! # Main types
//!
//! - [`SwellError`] — Unified error enum for all Swell subsystems.
//! - [`SwellResult`] — Convenience alias for `Result<T, SwellError>`.
//! - [`Envelope`] — The `{success, result, metrics, errors}` return shape.
//! - [`Event`] — An inbound tool-use event.
//! - [`EventContext`] — The classified, immutable view of an [`Event`].

/// TTL cache with eviction-on-read.
pub mod cache;
/// Inbound event and classified event-context types.
pub mod event;

pub use cache::{hash_key, TtlCache};
pub use event::{Event, EventContext, EventKind};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- Error types ---

/// Top-level error type for the Swell pipeline.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Debug, thiserror::Error)]
pub enum SwellError {
    /// An error from the event dispatcher or a capability-service call.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// An error from the component registry (lookup, invocation, discovery).
    #[error("Registry error: {0}")]
    Registry(String),

    /// An error from the agent manager or an agent worker.
    #[error("Agent error: {0}")]
    Agent(String),

    /// An error from the result collector.
    #[error("Collector error: {0}")]
    Collector(String),

    /// An error from the synthesis engine or the wave-context store.
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// An error from the quality validator or gates coordinator.
    #[error("Quality error: {0}")]
    Quality(String),

    /// An error from the token optimizer.
    #[error("Compression error: {0}")]
    Compression(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`SwellError`].
pub type SwellResult<T> = Result<T, SwellError>;

// --- Quality tiers ---

/// Quality tier shared by synthesis summaries and quality reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Overall score below 0.5.
    Poor,
    /// Overall score in `[0.5, 0.7)`.
    NeedsImprovement,
    /// Overall score in `[0.7, 0.8)`.
    Acceptable,
    /// Overall score in `[0.8, 0.9)`.
    Good,
    /// Overall score of 0.9 or above.
    Excellent,
}

impl QualityTier {
    /// Maps a score in `[0, 1]` to its tier via descending thresholds.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            QualityTier::Excellent
        } else if score >= 0.8 {
            QualityTier::Good
        } else if score >= 0.7 {
            QualityTier::Acceptable
        } else if score >= 0.5 {
            QualityTier::NeedsImprovement
        } else {
            QualityTier::Poor
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityTier::Excellent => write!(f, "excellent"),
            QualityTier::Good => write!(f, "good"),
            QualityTier::Acceptable => write!(f, "acceptable"),
            QualityTier::NeedsImprovement => write!(f, "needs_improvement"),
            QualityTier::Poor => write!(f, "poor"),
        }
    }
}

// --- Envelope ---

/// The uniform return shape of every pipeline entry point.
///
/// Callers always receive a well-formed envelope: failures inside a
/// component are converted at the component boundary instead of
/// propagating upward as errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Structured result payload.
    #[serde(default)]
    pub result: HashMap<String, serde_json::Value>,
    /// Per-call metrics (latency, counts, scores).
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
    /// Human-readable error messages, empty on success.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl Envelope {
    /// Creates a successful envelope with an empty result map.
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Creates a failed envelope carrying a single error message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![message.into()],
            ..Self::default()
        }
    }

    /// Attaches a result entry.
    pub fn with_result(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.result.insert(key.into(), value);
        self
    }

    /// Attaches a metric entry.
    pub fn with_metric(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    /// Appends an error message without flipping `success`.
    ///
    /// Used for degraded-but-successful outcomes (partial batches,
    /// skipped gates).
    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_ok() {
        let env = Envelope::ok().with_result("answer", serde_json::json!(42));
        assert!(env.success);
        assert!(env.errors.is_empty());
        assert_eq!(env.result["answer"], 42);
    }

    #[test]
    fn test_envelope_fail() {
        let env = Envelope::fail("component not found");
        assert!(!env.success);
        assert_eq!(env.errors, vec!["component not found".to_string()]);
    }

    #[test]
    fn test_envelope_warning_keeps_success() {
        let env = Envelope::ok().with_warning("gate skipped");
        assert!(env.success);
        assert_eq!(env.errors.len(), 1);
    }

    #[test]
    fn test_envelope_serialization_round_trip() {
        let env = Envelope::ok()
            .with_result("waves", serde_json::json!(3))
            .with_metric("duration_ms", serde_json::json!(12));
        let json = serde_json::to_string(&env).unwrap();
        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.metrics["duration_ms"], 12);
    }

    #[test]
    fn test_error_display() {
        let err = SwellError::Registry("unknown component: foo".into());
        assert_eq!(err.to_string(), "Registry error: unknown component: foo");
    }

    #[test]
    fn test_quality_tier_thresholds() {
        assert_eq!(QualityTier::from_score(0.95), QualityTier::Excellent);
        assert_eq!(QualityTier::from_score(0.9), QualityTier::Excellent);
        assert_eq!(QualityTier::from_score(0.85), QualityTier::Good);
        assert_eq!(QualityTier::from_score(0.7), QualityTier::Acceptable);
        assert_eq!(QualityTier::from_score(0.5), QualityTier::NeedsImprovement);
        assert_eq!(QualityTier::from_score(0.1), QualityTier::Poor);
    }
}
