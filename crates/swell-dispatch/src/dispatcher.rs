use crate::classify::EventClassifier;
use crate::routes::{RoutePlan, Router};
use crate::services::ServiceRegistry;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use swell_core::{Envelope, Event, EventContext};
use swell_monitor::PerformanceMonitor;
use tracing::{info, warn};

/// Dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Overall latency budget for one dispatch, in milliseconds.
    #[serde(default = "default_latency_budget_ms")]
    pub latency_budget_ms: u64,
    /// Per-service-call timeout in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_latency_budget_ms() -> u64 {
    500
}
fn default_call_timeout_ms() -> u64 {
    200
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            latency_budget_ms: default_latency_budget_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

/// Classifies, routes, and executes one tool-use event end to end.
///
/// Synchronous calls run first in rule order, then the concurrent batch
/// with per-call timeouts; each call's failure is isolated from its
/// siblings, and the whole dispatch is timed against the latency budget
/// (overruns are logged, not failed).
pub struct EventDispatcher {
    classifier: EventClassifier,
    router: Router,
    services: Arc<ServiceRegistry>,
    monitor: Arc<PerformanceMonitor>,
    config: DispatcherConfig,
}

impl EventDispatcher {
    /// Creates a dispatcher over the given services.
    pub fn new(
        services: Arc<ServiceRegistry>,
        monitor: Arc<PerformanceMonitor>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            classifier: EventClassifier::new(),
            router: Router::new(),
            services,
            monitor,
            config,
        }
    }

    /// Replaces the router (for custom rule tables).
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Classifies an event without dispatching it.
    pub fn classify(&self, event: &Event) -> EventContext {
        self.classifier.classify(event)
    }

    /// Resolves the route plan for a classified event.
    pub fn route(&self, event: &Event, context: &EventContext) -> RoutePlan {
        self.router.route(&event.tool_name, context)
    }

    /// Dispatches one event: classify, route, execute, aggregate.
    ///
    /// Always returns a well-formed envelope. The envelope fails only
    /// when every routed service failed; partial failures degrade into
    /// warnings.
    pub async fn dispatch(&self, event: &Event) -> Envelope {
        let start = Instant::now();
        let context = self.classifier.classify(event);
        let plan = self.router.route(&event.tool_name, &context);
        let call_timeout = Duration::from_millis(self.config.call_timeout_ms);

        let payload = serde_json::json!({
            "tool": event.tool_name,
            "arguments": event.arguments,
            "query": event.query,
            "classification": {
                "kind": context.kind,
                "complexity": context.complexity,
                "hints": context.domain_hints,
            },
        });

        let mut responses: Vec<(String, serde_json::Value)> = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        // Synchronous calls first, in rule order.
        for name in &plan.sync_services {
            match self.services.call(name, payload.clone(), call_timeout).await {
                Ok(value) => responses.push((name.clone(), value)),
                Err(e) => failures.push(format!("{name}: {e}")),
            }
        }

        // Then the concurrent batch; each failure stays isolated.
        let concurrent = plan.concurrent_services.iter().map(|name| {
            let payload = payload.clone();
            async move {
                let outcome = self.services.call(name, payload, call_timeout).await;
                (name.clone(), outcome)
            }
        });
        for (name, outcome) in join_all(concurrent).await {
            match outcome {
                Ok(value) => responses.push((name, value)),
                Err(e) => failures.push(format!("{name}: {e}")),
            }
        }

        let elapsed = start.elapsed();
        self.monitor.record_timing("dispatcher.dispatch", elapsed);
        self.monitor.record_counter("dispatcher.events", 1);

        let attempted = plan.sync_services.len() + plan.concurrent_services.len();
        let total_failure = attempted > 0 && responses.is_empty();

        let mut envelope = if total_failure {
            Envelope::fail(format!(
                "all {attempted} routed services failed for tool '{}'",
                event.tool_name
            ))
        } else {
            Envelope::ok()
        };
        for failure in &failures {
            if !total_failure {
                envelope = envelope.with_warning(format!("degraded: {failure}"));
            } else {
                envelope.errors.push(failure.clone());
            }
        }

        let service_results: serde_json::Map<String, serde_json::Value> =
            responses.into_iter().collect();
        envelope = envelope
            .with_result("services", serde_json::Value::Object(service_results))
            .with_result("event_id", serde_json::json!(context.id))
            .with_metric("complexity", serde_json::json!(context.complexity))
            .with_metric("services_attempted", serde_json::json!(attempted))
            .with_metric("services_failed", serde_json::json!(failures.len()))
            .with_metric(
                "duration_ms",
                serde_json::json!(elapsed.as_secs_f64() * 1_000.0),
            );

        let budget = Duration::from_millis(self.config.latency_budget_ms);
        if elapsed > budget {
            warn!(
                tool = %event.tool_name,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.config.latency_budget_ms,
                "Dispatch exceeded its latency budget"
            );
            envelope = envelope.with_warning(format!(
                "dispatch took {}ms, over the {}ms budget",
                elapsed.as_millis(),
                self.config.latency_budget_ms
            ));
        }

        info!(
            tool = %event.tool_name,
            complexity = context.complexity,
            attempted,
            failed = failures.len(),
            "Dispatched event"
        );
        envelope
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::service_names;
    use crate::services::CapabilityService;
    use async_trait::async_trait;
    use swell_core::{SwellError, SwellResult};

    struct EchoService {
        name: String,
    }

    #[async_trait]
    impl CapabilityService for EchoService {
        fn name(&self) -> &str {
            &self.name
        }

        async fn call(&self, payload: serde_json::Value) -> SwellResult<serde_json::Value> {
            Ok(serde_json::json!({"echoed_tool": payload["tool"]}))
        }
    }

    struct DownService;

    #[async_trait]
    impl CapabilityService for DownService {
        fn name(&self) -> &str {
            service_names::CONTEXT_STORAGE
        }

        async fn call(&self, _payload: serde_json::Value) -> SwellResult<serde_json::Value> {
            Err(SwellError::Dispatch("connection refused".into()))
        }
    }

    fn full_registry() -> Arc<ServiceRegistry> {
        let mut registry = ServiceRegistry::new();
        for name in [
            service_names::DOCS_LOOKUP,
            service_names::UI_GENERATION,
            service_names::BROWSER_AUTOMATION,
            service_names::REASONING,
            service_names::TELEMETRY,
            service_names::CONTEXT_STORAGE,
        ] {
            registry.register(Arc::new(EchoService {
                name: name.to_string(),
            }));
        }
        Arc::new(registry)
    }

    fn dispatcher(registry: Arc<ServiceRegistry>) -> EventDispatcher {
        EventDispatcher::new(
            registry,
            Arc::new(PerformanceMonitor::default()),
            DispatcherConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_read_dispatches_to_context_storage_only() {
        let dispatcher = dispatcher(full_registry());
        let event = Event::new("Read").with_arg("file_path", serde_json::json!("/src/lib.rs"));
        let envelope = dispatcher.dispatch(&event).await;
        assert!(envelope.success);

        let services = envelope.result["services"].as_object().unwrap();
        assert!(services.contains_key(service_names::CONTEXT_STORAGE));
        // Complexity under 0.5: telemetry was not added.
        assert!(!services.contains_key(service_names::TELEMETRY));
        assert!(envelope.metrics["complexity"].as_f64().unwrap() < 0.5);
    }

    #[tokio::test]
    async fn test_high_complexity_task_fans_out() {
        let dispatcher = dispatcher(full_registry());
        let event = Event::new("Task").with_query("analyze the security posture in depth");
        let envelope = dispatcher.dispatch(&event).await;
        assert!(envelope.success);

        let services = envelope.result["services"].as_object().unwrap();
        assert!(services.contains_key(service_names::REASONING));
        assert!(services.contains_key(service_names::TELEMETRY));
        assert!(services.contains_key(service_names::CONTEXT_STORAGE));
    }

    #[tokio::test]
    async fn test_partial_failure_degrades_not_fails() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(DownService));
        registry.register(Arc::new(EchoService {
            name: service_names::DOCS_LOOKUP.to_string(),
        }));
        let dispatcher = dispatcher(Arc::new(registry));

        // Edit routes to context_storage (down) and docs_lookup (up).
        let event = Event::new("Edit").with_arg("file_path", serde_json::json!("/a.rs"));
        let envelope = dispatcher.dispatch(&event).await;
        assert!(envelope.success);
        assert_eq!(envelope.metrics["services_failed"], 1);
        assert!(envelope.errors[0].contains("degraded"));
    }

    #[tokio::test]
    async fn test_total_failure_fails_envelope() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(DownService));
        let dispatcher = dispatcher(Arc::new(registry));

        let event = Event::new("Read").with_arg("file_path", serde_json::json!("/a.rs"));
        let envelope = dispatcher.dispatch(&event).await;
        assert!(!envelope.success);
        assert!(envelope.errors[0].contains("routed services failed"));
    }

    #[tokio::test]
    async fn test_unrouted_event_still_succeeds() {
        let dispatcher = dispatcher(full_registry());
        let envelope = dispatcher.dispatch(&Event::new("Mystery")).await;
        assert!(envelope.success);
        assert_eq!(envelope.metrics["services_attempted"], 0);
    }
}
