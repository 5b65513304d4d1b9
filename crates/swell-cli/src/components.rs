//! Component-contract adapters for the pipeline subsystems.
//!
//! Each adapter wraps one subsystem behind the registry's uniform
//! `handle(action, params)` contract so every pipeline capability is
//! reachable by name through [`swell_registry::ComponentRegistry`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use swell_compress::{determine_strategy, CompressionContext, TokenOptimizer};
use swell_core::{Envelope, SwellError, SwellResult};
use swell_quality::QualityValidator;
use swell_registry::Component;
use swell_synthesis::{SynthesisEngine, WaveContextStore};

fn str_param<'p>(
    params: &'p HashMap<String, serde_json::Value>,
    key: &str,
) -> SwellResult<&'p str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| SwellError::Registry(format!("missing string parameter '{key}'")))
}

/// Exposes the quality validator as a registry component.
pub struct QualityComponent {
    validator: Arc<QualityValidator>,
}

impl QualityComponent {
    /// Wraps a shared validator.
    pub fn new(validator: Arc<QualityValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Component for QualityComponent {
    async fn handle(
        &self,
        action: &str,
        params: HashMap<String, serde_json::Value>,
    ) -> SwellResult<Envelope> {
        match action {
            "validate" => {
                let step = str_param(&params, "step")?;
                let content = str_param(&params, "content")?;
                let context = params
                    .get("context")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let report = self.validator.validate_quality_gate(step, content, context);
                Ok(Envelope::ok().with_result("report", serde_json::to_value(&report)?))
            }
            other => Err(SwellError::Registry(format!(
                "quality component has no action '{other}'"
            ))),
        }
    }
}

/// Exposes the token optimizer as a registry component.
pub struct CompressionComponent {
    optimizer: Arc<TokenOptimizer>,
}

impl CompressionComponent {
    /// Wraps a shared optimizer.
    pub fn new(optimizer: Arc<TokenOptimizer>) -> Self {
        Self { optimizer }
    }
}

#[async_trait]
impl Component for CompressionComponent {
    async fn handle(
        &self,
        action: &str,
        params: HashMap<String, serde_json::Value>,
    ) -> SwellResult<Envelope> {
        match action {
            "compress" => {
                let content = str_param(&params, "content")?;
                let context: CompressionContext = params
                    .get("context")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()?
                    .unwrap_or_default();
                let strategy = determine_strategy(&context);
                let result = self.optimizer.apply_compression(content, strategy, &context);
                Ok(Envelope::ok().with_result("compression", serde_json::to_value(&result)?))
            }
            other => Err(SwellError::Registry(format!(
                "compression component has no action '{other}'"
            ))),
        }
    }
}

/// Exposes the synthesis engine (compound intelligence) as a registry
/// component backed by the wave-context store.
pub struct SynthesisComponent {
    engine: Arc<SynthesisEngine>,
    store: Arc<dyn WaveContextStore>,
}

impl SynthesisComponent {
    /// Wraps a shared engine and store.
    pub fn new(engine: Arc<SynthesisEngine>, store: Arc<dyn WaveContextStore>) -> Self {
        Self { engine, store }
    }
}

#[async_trait]
impl Component for SynthesisComponent {
    async fn handle(
        &self,
        action: &str,
        params: HashMap<String, serde_json::Value>,
    ) -> SwellResult<Envelope> {
        match action {
            "compound" => {
                let context = self.store.load().await?;
                let compound = self.engine.build_compound_intelligence(&context);
                Ok(Envelope::ok()
                    .with_result("compound", serde_json::json!(compound))
                    .with_result("waves", serde_json::json!(context.len())))
            }
            "enhance" => {
                let target_wave = params
                    .get("target_wave")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1) as u32;
                let task = params
                    .get("task")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let context = self.store.load().await?;
                let compound = self.engine.build_compound_intelligence(&context);
                let enhanced = self.engine.enhance_for_injection(&compound, target_wave, task);
                Ok(Envelope::ok().with_result("enhanced", serde_json::json!(enhanced)))
            }
            other => Err(SwellError::Registry(format!(
                "synthesis component has no action '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use swell_quality::ValidatorConfig;

    #[tokio::test]
    async fn test_quality_component_validates() {
        let component = QualityComponent::new(Arc::new(
            QualityValidator::new(ValidatorConfig::default()).unwrap(),
        ));
        let params = HashMap::from([
            ("step".to_string(), serde_json::json!("design_review")),
            ("content".to_string(), serde_json::json!("/// doc\nfn f(a: u32) -> u32 { a }")),
        ]);
        let envelope = component.handle("validate", params).await.unwrap();
        assert!(envelope.success);
        assert!(envelope.result["report"]["overall_score"].is_number());
    }

    #[tokio::test]
    async fn test_unknown_action_is_error() {
        let component = CompressionComponent::new(Arc::new(
            TokenOptimizer::new(swell_compress::OptimizerConfig::default()).unwrap(),
        ));
        let err = component.handle("explode", HashMap::new()).await.unwrap_err();
        assert!(err.to_string().contains("no action"));
    }
}
