use crate::service_names;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use swell_core::EventContext;

/// How a rule's services are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One after another, in rule order.
    Sync,
    /// Together, bounded by the dispatcher's pool.
    Concurrent,
}

/// Rule priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work.
    Low,
    /// The default.
    Normal,
    /// Always also routed to telemetry and context storage.
    High,
}

/// A static per-tool routing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Services to call, in order.
    pub services: Vec<String>,
    /// How to call them.
    pub mode: ExecutionMode,
    /// Rule priority.
    pub priority: Priority,
}

/// The resolved plan for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Services called synchronously, in order.
    pub sync_services: Vec<String>,
    /// Services called concurrently after the synchronous batch.
    pub concurrent_services: Vec<String>,
    /// Effective priority.
    pub priority: Priority,
}

impl RoutePlan {
    /// Every planned service, sync first.
    pub fn all_services(&self) -> Vec<&str> {
        self.sync_services
            .iter()
            .chain(self.concurrent_services.iter())
            .map(String::as_str)
            .collect()
    }
}

// Complexity at or above this always brings the observability services
// along.
const HIGH_COMPLEXITY: f64 = 0.7;

/// Static per-tool routing with a hint-based fallback.
pub struct Router {
    rules: HashMap<String, RoutingRule>,
    hint_defaults: HashMap<&'static str, &'static str>,
}

impl Router {
    /// Creates a router with the built-in rule table.
    pub fn new() -> Self {
        let rules = HashMap::from([
            (
                "Read".to_string(),
                RoutingRule {
                    services: vec![service_names::CONTEXT_STORAGE.to_string()],
                    mode: ExecutionMode::Sync,
                    priority: Priority::Normal,
                },
            ),
            (
                "Write".to_string(),
                RoutingRule {
                    services: vec![service_names::CONTEXT_STORAGE.to_string()],
                    mode: ExecutionMode::Sync,
                    priority: Priority::Normal,
                },
            ),
            (
                "Edit".to_string(),
                RoutingRule {
                    services: vec![
                        service_names::CONTEXT_STORAGE.to_string(),
                        service_names::DOCS_LOOKUP.to_string(),
                    ],
                    mode: ExecutionMode::Sync,
                    priority: Priority::Normal,
                },
            ),
            (
                "Bash".to_string(),
                RoutingRule {
                    services: vec![
                        service_names::TELEMETRY.to_string(),
                        service_names::CONTEXT_STORAGE.to_string(),
                    ],
                    mode: ExecutionMode::Concurrent,
                    priority: Priority::Normal,
                },
            ),
            (
                "Task".to_string(),
                RoutingRule {
                    services: vec![
                        service_names::REASONING.to_string(),
                        service_names::CONTEXT_STORAGE.to_string(),
                    ],
                    mode: ExecutionMode::Concurrent,
                    priority: Priority::High,
                },
            ),
            (
                "WebSearch".to_string(),
                RoutingRule {
                    services: vec![
                        service_names::DOCS_LOOKUP.to_string(),
                        service_names::BROWSER_AUTOMATION.to_string(),
                    ],
                    mode: ExecutionMode::Concurrent,
                    priority: Priority::Normal,
                },
            ),
        ]);
        let hint_defaults = HashMap::from([
            ("analysis", service_names::REASONING),
            ("security", service_names::REASONING),
            ("performance", service_names::TELEMETRY),
            ("files", service_names::CONTEXT_STORAGE),
            ("search", service_names::DOCS_LOOKUP),
            ("documentation", service_names::DOCS_LOOKUP),
            ("execution", service_names::TELEMETRY),
            ("ui", service_names::UI_GENERATION),
            ("browser", service_names::BROWSER_AUTOMATION),
        ]);
        Self {
            rules,
            hint_defaults,
        }
    }

    /// Adds or replaces a per-tool rule.
    pub fn set_rule(&mut self, tool: impl Into<String>, rule: RoutingRule) {
        self.rules.insert(tool.into(), rule);
    }

    /// Resolves the plan for a classified event.
    ///
    /// A matching tool rule wins; otherwise each domain hint maps to its
    /// default service, called synchronously. High complexity or high
    /// priority additionally routes to telemetry and context storage.
    pub fn route(&self, tool_name: &str, context: &EventContext) -> RoutePlan {
        let (mut sync_services, mut concurrent_services, priority) =
            match self.rules.get(tool_name) {
                Some(rule) => match rule.mode {
                    ExecutionMode::Sync => (rule.services.clone(), Vec::new(), rule.priority),
                    ExecutionMode::Concurrent => {
                        (Vec::new(), rule.services.clone(), rule.priority)
                    }
                },
                None => {
                    // Hint fallback, preserving first-seen order.
                    let mut services = Vec::new();
                    for hint in &context.domain_hints {
                        if let Some(service) = self.hint_defaults.get(hint.as_str()) {
                            let service = (*service).to_string();
                            if !services.contains(&service) {
                                services.push(service);
                            }
                        }
                    }
                    (services, Vec::new(), Priority::Normal)
                }
            };

        if context.complexity >= HIGH_COMPLEXITY || priority == Priority::High {
            for service in [service_names::TELEMETRY, service_names::CONTEXT_STORAGE] {
                let service = service.to_string();
                if !sync_services.contains(&service) && !concurrent_services.contains(&service) {
                    concurrent_services.push(service);
                }
            }
        }

        RoutePlan {
            sync_services,
            concurrent_services,
            priority,
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use swell_core::EventKind;

    fn context(complexity: f64, hints: &[&str]) -> EventContext {
        EventContext::new(
            EventKind::General,
            complexity,
            hints.iter().map(|h| (*h).to_string()).collect(),
        )
    }

    #[test]
    fn test_read_routes_to_context_storage_sync_only() {
        let router = Router::new();
        let plan = router.route("Read", &context(0.25, &["files"]));
        assert_eq!(plan.sync_services, vec![service_names::CONTEXT_STORAGE]);
        assert!(plan.concurrent_services.is_empty());
        assert!(!plan
            .all_services()
            .contains(&service_names::TELEMETRY));
    }

    #[test]
    fn test_high_complexity_adds_observability_services() {
        let router = Router::new();
        let plan = router.route("Read", &context(0.9, &["files"]));
        assert_eq!(plan.sync_services, vec![service_names::CONTEXT_STORAGE]);
        assert!(plan.concurrent_services.contains(&service_names::TELEMETRY.to_string()));
        // Context storage already routed synchronously; not duplicated.
        assert_eq!(
            plan.all_services()
                .iter()
                .filter(|s| **s == service_names::CONTEXT_STORAGE)
                .count(),
            1
        );
    }

    #[test]
    fn test_high_priority_rule_adds_observability() {
        let router = Router::new();
        let plan = router.route("Task", &context(0.5, &[]));
        assert!(plan.concurrent_services.contains(&service_names::TELEMETRY.to_string()));
        assert_eq!(plan.priority, Priority::High);
    }

    #[test]
    fn test_hint_fallback_for_unknown_tool() {
        let router = Router::new();
        let plan = router.route("Mystery", &context(0.3, &["documentation", "files"]));
        assert_eq!(
            plan.sync_services,
            vec![service_names::DOCS_LOOKUP, service_names::CONTEXT_STORAGE]
        );
        assert_eq!(plan.priority, Priority::Normal);
    }

    #[test]
    fn test_unroutable_event_gets_empty_plan() {
        let router = Router::new();
        let plan = router.route("Mystery", &context(0.3, &["unmapped-hint"]));
        assert!(plan.sync_services.is_empty());
        assert!(plan.concurrent_services.is_empty());
    }
}
