use crate::component::{Component, ComponentKind, ComponentMetadata, ComponentStats};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use swell_core::{Envelope, SwellError, SwellResult};
use swell_monitor::PerformanceMonitor;
use tracing::{info, warn};

/// A manifest entry: metadata plus the handler to invoke.
pub struct ComponentSpec {
    /// Unique component name.
    pub name: String,
    /// Declared category.
    pub kind: ComponentKind,
    /// Short human description.
    pub description: String,
    /// Latency target override; the kind default applies when `None`.
    pub latency_target_ms: Option<u64>,
    /// Names of other components this one depends on.
    pub dependencies: Vec<String>,
    /// The invocation handler.
    pub handler: Arc<dyn Component>,
}

struct Registered {
    metadata: ComponentMetadata,
    handler: Option<Arc<dyn Component>>,
}

/// Health verdict for one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name.
    pub name: String,
    /// Whether every health rule passed.
    pub healthy: bool,
    /// Failed health rules, empty when healthy.
    pub issues: Vec<String>,
}

/// Point-in-time view of the whole registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStatus {
    /// Number of registered components.
    pub total_components: usize,
    /// Per-component metadata keyed by name (sorted for stable output).
    pub components: BTreeMap<String, ComponentMetadata>,
}

/// Central registry for all pluggable pipeline components.
///
/// Invocation goes through [`ComponentRegistry::execute`], which updates
/// per-component statistics on success and failure and reports timing to
/// the performance monitor. Unknown names produce explicit not-found
/// failure envelopes, never panics.
pub struct ComponentRegistry {
    components: tokio::sync::RwLock<HashMap<String, Registered>>,
    monitor: Arc<PerformanceMonitor>,
}

impl ComponentRegistry {
    /// Creates an empty registry reporting timings to `monitor`.
    pub fn new(monitor: Arc<PerformanceMonitor>) -> Self {
        Self {
            components: tokio::sync::RwLock::new(HashMap::new()),
            monitor,
        }
    }

    /// Registers a component from an explicit manifest entry.
    pub async fn register(&self, spec: ComponentSpec) {
        let metadata = ComponentMetadata {
            name: spec.name.clone(),
            kind: spec.kind,
            entry_point: "handle".to_string(),
            description: spec.description,
            latency_target_ms: spec
                .latency_target_ms
                .unwrap_or_else(|| spec.kind.default_latency_target_ms()),
            dependencies: spec.dependencies,
            stats: ComponentStats::default(),
        };
        info!(component = %spec.name, kind = %spec.kind.to_string(), "Registered component");
        let mut components = self.components.write().await;
        components.insert(
            spec.name,
            Registered {
                metadata,
                handler: Some(spec.handler),
            },
        );
    }

    /// Merges discovered metadata into the manifest.
    ///
    /// An already-registered component keeps its handler and fills any
    /// empty metadata fields from the discovered unit; an unknown name is
    /// inserted handler-less and will fail execution until a handler is
    /// registered for it.
    pub async fn register_discovered(&self, discovered: ComponentMetadata) {
        let mut components = self.components.write().await;
        match components.get_mut(&discovered.name) {
            Some(existing) => {
                if existing.metadata.description.is_empty() {
                    existing.metadata.description = discovered.description;
                }
                if existing.metadata.dependencies.is_empty() {
                    existing.metadata.dependencies = discovered.dependencies;
                }
            }
            None => {
                warn!(
                    component = %discovered.name,
                    "Discovered component has no registered handler"
                );
                components.insert(
                    discovered.name.clone(),
                    Registered {
                        metadata: discovered,
                        handler: None,
                    },
                );
            }
        }
    }

    /// Invokes a component by name and action.
    ///
    /// Always returns an envelope: unknown names, handler-less entries,
    /// handler errors, and handler panics all become failure envelopes.
    pub async fn execute(
        &self,
        name: &str,
        action: &str,
        params: HashMap<String, serde_json::Value>,
    ) -> Envelope {
        let handler = {
            let components = self.components.read().await;
            match components.get(name) {
                None => return Envelope::fail(format!("component not found: {name}")),
                Some(registered) => match &registered.handler {
                    None => {
                        return Envelope::fail(format!(
                            "component '{name}' was discovered but has no registered handler"
                        ))
                    }
                    Some(handler) => Arc::clone(handler),
                },
            }
        };

        let start = Instant::now();
        let action_owned = action.to_string();
        // Run the handler on its own task so a panic inside it is
        // contained at the component boundary instead of unwinding
        // through the registry.
        let joined =
            tokio::spawn(async move { handler.handle(&action_owned, params).await }).await;

        let elapsed = start.elapsed();
        let mut envelope = match joined {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(e)) => {
                warn!(component = name, action, error = %e, "Component returned an error");
                Envelope::fail(e.to_string())
            }
            Err(join_err) => {
                warn!(component = name, action, error = %join_err, "Component panicked");
                Envelope::fail(format!("component '{name}' panicked: {join_err}"))
            }
        };

        envelope.metrics.insert(
            "duration_ms".to_string(),
            serde_json::json!(elapsed.as_secs_f64() * 1_000.0),
        );

        {
            let mut components = self.components.write().await;
            if let Some(registered) = components.get_mut(name) {
                registered
                    .metadata
                    .stats
                    .record(elapsed.as_secs_f64() * 1_000.0, envelope.success);
            }
        }
        self.monitor
            .record_timing(&format!("component.{name}"), elapsed);

        envelope
    }

    /// Evaluates the health rules for one component.
    ///
    /// Unhealthy when the weighted-average latency exceeds twice the
    /// target, when the error rate exceeds 10% after at least 10
    /// invocations, or when no handler can be resolved.
    pub async fn validate_health(&self, name: &str) -> SwellResult<ComponentHealth> {
        let components = self.components.read().await;
        let registered = components
            .get(name)
            .ok_or_else(|| SwellError::Registry(format!("component not found: {name}")))?;
        let mut issues = health_issues(&registered.metadata);
        if registered.handler.is_none() {
            issues.push("entry point cannot be resolved".to_string());
        }
        Ok(ComponentHealth {
            name: name.to_string(),
            healthy: issues.is_empty(),
            issues,
        })
    }

    /// Snapshot of every registered component and its statistics.
    pub async fn get_registry_status(&self) -> RegistryStatus {
        let components = self.components.read().await;
        let map: BTreeMap<String, ComponentMetadata> = components
            .iter()
            .map(|(name, registered)| (name.clone(), registered.metadata.clone()))
            .collect();
        RegistryStatus {
            total_components: map.len(),
            components: map,
        }
    }

    /// Number of registered components.
    pub async fn component_count(&self) -> usize {
        self.components.read().await.len()
    }
}

/// The statistics-based health rules, shared with tests.
fn health_issues(metadata: &ComponentMetadata) -> Vec<String> {
    let mut issues = Vec::new();
    let stats = &metadata.stats;
    let target = metadata.latency_target_ms as f64;
    if stats.execution_count > 0 && stats.avg_latency_ms > 2.0 * target {
        issues.push(format!(
            "average latency {:.1}ms exceeds 2x target {}ms",
            stats.avg_latency_ms, metadata.latency_target_ms
        ));
    }
    if stats.execution_count >= 10 && stats.error_rate() > 0.10 {
        issues.push(format!(
            "error rate {:.0}% exceeds 10%",
            stats.error_rate() * 100.0
        ));
    }
    issues
}
