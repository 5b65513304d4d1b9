use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use swell_core::{Envelope, SwellResult};

/// The uniform invocation contract every pluggable component exposes.
///
/// A component takes an `action` string plus keyword parameters and
/// returns the standard envelope; the registry requires nothing more to
/// invoke it.
#[async_trait]
pub trait Component: Send + Sync {
    /// Handles one action. Errors are converted into failure envelopes
    /// at the registry boundary, so implementations may use `?` freely.
    async fn handle(
        &self,
        action: &str,
        params: HashMap<String, serde_json::Value>,
    ) -> SwellResult<Envelope>;
}

/// Declared category of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Registries, pools, queues, caches.
    Infrastructure,
    /// Domain features.
    Feature,
    /// Quality and structural validation.
    Validation,
    /// Metrics and health observation.
    Monitoring,
}

impl ComponentKind {
    /// Default latency target applied when a component declares none.
    pub fn default_latency_target_ms(self) -> u64 {
        match self {
            ComponentKind::Infrastructure => 50,
            ComponentKind::Feature => 200,
            ComponentKind::Validation => 100,
            ComponentKind::Monitoring => 25,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Infrastructure => write!(f, "infrastructure"),
            ComponentKind::Feature => write!(f, "feature"),
            ComponentKind::Validation => write!(f, "validation"),
            ComponentKind::Monitoring => write!(f, "monitoring"),
        }
    }
}

/// Running statistics mutated after every invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentStats {
    /// Total invocations.
    pub execution_count: u64,
    /// Invocations that ended in failure.
    pub error_count: u64,
    /// Exponentially-weighted average latency (alpha = 0.2).
    pub avg_latency_ms: f64,
    /// When the component last executed.
    pub last_execution: Option<DateTime<Utc>>,
}

impl ComponentStats {
    /// Folds one invocation into the running statistics.
    pub fn record(&mut self, latency_ms: f64, success: bool) {
        self.execution_count += 1;
        if !success {
            self.error_count += 1;
        }
        self.avg_latency_ms = if self.execution_count == 1 {
            latency_ms
        } else {
            0.8 * self.avg_latency_ms + 0.2 * latency_ms
        };
        self.last_execution = Some(Utc::now());
    }

    /// Fraction of invocations that failed, zero when never invoked.
    pub fn error_rate(&self) -> f64 {
        if self.execution_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.execution_count as f64
        }
    }
}

/// Everything the registry knows about one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMetadata {
    /// Unique component name.
    pub name: String,
    /// Declared category.
    pub kind: ComponentKind,
    /// Name of the entry-point function.
    pub entry_point: String,
    /// Short human description.
    pub description: String,
    /// Declared latency target in milliseconds.
    pub latency_target_ms: u64,
    /// Names of other components this one depends on.
    pub dependencies: Vec<String>,
    /// Running invocation statistics.
    #[serde(default)]
    pub stats: ComponentStats,
}
