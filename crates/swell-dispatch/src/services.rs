use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use swell_core::{SwellError, SwellResult};
use tracing::{info, warn};

/// An external capability integration, addressed by name.
///
/// The services themselves (documentation lookup, UI generation,
/// browser automation, reasoning assistance, ...) live out of process;
/// this trait is the seam the dispatcher calls through.
#[async_trait]
pub trait CapabilityService: Send + Sync {
    /// Service name.
    fn name(&self) -> &str;
    /// One call: structured payload in, structured payload or error out.
    async fn call(&self, payload: serde_json::Value) -> SwellResult<serde_json::Value>;
}

// Consecutive failures before an integration is cut off.
const FAILURE_THRESHOLD: u32 = 5;

/// Failure-count circuit breaker; once open it stays open until
/// explicitly reset. There is no automatic half-open probing.
struct CircuitBreaker {
    consecutive_failures: AtomicU32,
    open: AtomicBool,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            open: AtomicBool::new(false),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self, name: &str) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= FAILURE_THRESHOLD && !self.open.swap(true, Ordering::Relaxed) {
            warn!(
                service = name,
                failures, "Circuit breaker opened; further calls suppressed until reset"
            );
        }
    }

    fn reset(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.open.store(false, Ordering::Relaxed);
    }
}

struct ServiceHandle {
    service: Arc<dyn CapabilityService>,
    breaker: CircuitBreaker,
}

/// Holds every registered capability service and its circuit breaker.
pub struct ServiceRegistry {
    services: HashMap<String, ServiceHandle>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Registers a service under its own name.
    pub fn register(&mut self, service: Arc<dyn CapabilityService>) {
        let name = service.name().to_string();
        info!(service = %name, "Registered capability service");
        self.services.insert(
            name,
            ServiceHandle {
                service,
                breaker: CircuitBreaker::new(),
            },
        );
    }

    /// Calls a service by name with a per-call timeout.
    ///
    /// Unknown names, open breakers, call errors, and timeouts are all
    /// explicit errors; failures feed the breaker, successes reset it.
    pub async fn call(
        &self,
        name: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> SwellResult<serde_json::Value> {
        let handle = self
            .services
            .get(name)
            .ok_or_else(|| SwellError::Dispatch(format!("unknown service: {name}")))?;
        if handle.breaker.is_open() {
            return Err(SwellError::Dispatch(format!(
                "service '{name}' is unavailable (circuit open)"
            )));
        }

        match tokio::time::timeout(timeout, handle.service.call(payload)).await {
            Ok(Ok(value)) => {
                handle.breaker.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                handle.breaker.record_failure(name);
                Err(e)
            }
            Err(_) => {
                handle.breaker.record_failure(name);
                Err(SwellError::Dispatch(format!(
                    "service '{name}' timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Whether a service's breaker is currently open.
    pub fn is_suppressed(&self, name: &str) -> bool {
        self.services
            .get(name)
            .map(|h| h.breaker.is_open())
            .unwrap_or(false)
    }

    /// Resets a service's breaker, re-enabling calls.
    pub fn reset(&self, name: &str) {
        if let Some(handle) = self.services.get(name) {
            handle.breaker.reset();
            info!(service = name, "Circuit breaker reset");
        }
    }

    /// Names of all registered services, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
