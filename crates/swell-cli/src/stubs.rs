//! In-process stand-ins for the external capability services.
//!
//! The real integrations live out of process; these stubs satisfy the
//! [`CapabilityService`] seam so the pipeline can run end to end from
//! the CLI without any of them deployed.

use async_trait::async_trait;
use serde_json::json;
use swell_core::SwellResult;
use swell_dispatch::{service_names, CapabilityService, ServiceRegistry};

struct AckService {
    name: &'static str,
}

#[async_trait]
impl CapabilityService for AckService {
    fn name(&self) -> &str {
        self.name
    }

    async fn call(&self, payload: serde_json::Value) -> SwellResult<serde_json::Value> {
        Ok(json!({
            "service": self.name,
            "acknowledged": true,
            "tool": payload.get("tool").cloned().unwrap_or(serde_json::Value::Null),
        }))
    }
}

/// A service registry populated with one acknowledging stub per
/// well-known service name.
pub fn stub_service_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    for name in [
        service_names::DOCS_LOOKUP,
        service_names::UI_GENERATION,
        service_names::BROWSER_AUTOMATION,
        service_names::REASONING,
        service_names::TELEMETRY,
        service_names::CONTEXT_STORAGE,
    ] {
        registry.register(std::sync::Arc::new(AckService { name }));
    }
    registry
}
