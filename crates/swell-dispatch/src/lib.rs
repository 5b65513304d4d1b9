//! Event classification, routing, and dispatch.
//!
//! Classifies incoming tool-use events into complexity scores and domain
//! hints, decides which external capability services to invoke and how
//! (synchronously or concurrently), executes the calls under a latency
//! budget with per-call timeouts, and aggregates everything into the
//! standard envelope. Per-service circuit breakers suppress calls to
//! integrations that keep failing.
//!
//! # Main types
//!
//! - [`EventDispatcher`] — classify → route → execute → aggregate.
//! - [`EventClassifier`] — Keyword- and weight-based classification.
//! - [`Router`] — Static per-tool rules with hint fallback.
//! - [`CapabilityService`] — The external-integration seam.

/// Event classification.
pub mod classify;
/// The dispatcher.
pub mod dispatcher;
/// Routing rules.
pub mod routes;
/// Capability services and circuit breaking.
pub mod services;

pub use classify::EventClassifier;
pub use dispatcher::{DispatcherConfig, EventDispatcher};
pub use routes::{ExecutionMode, Priority, RoutePlan, Router, RoutingRule};
pub use services::{CapabilityService, ServiceRegistry};

/// Well-known capability-service names.
pub mod service_names {
    /// Documentation lookup.
    pub const DOCS_LOOKUP: &str = "docs_lookup";
    /// UI generation.
    pub const UI_GENERATION: &str = "ui_generation";
    /// Browser automation.
    pub const BROWSER_AUTOMATION: &str = "browser_automation";
    /// Reasoning assistance.
    pub const REASONING: &str = "reasoning";
    /// Telemetry / monitoring sink.
    pub const TELEMETRY: &str = "telemetry";
    /// Context accumulation and storage.
    pub const CONTEXT_STORAGE: &str = "context_storage";
}
