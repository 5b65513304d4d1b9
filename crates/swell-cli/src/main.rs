//! `swell` — operational CLI for the Swell orchestration pipeline.
//!
//! Constructs every pipeline component once at startup and passes the
//! references explicitly; there are no global singletons.

mod components;
mod stubs;

use clap::{Parser, Subcommand};
use components::{CompressionComponent, QualityComponent, SynthesisComponent};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stubs::stub_service_registry;
use swell_agents::AgentManagerConfig;
use swell_compress::{OptimizerConfig, TokenOptimizer};
use swell_core::Event;
use swell_dispatch::{DispatcherConfig, EventDispatcher};
use swell_monitor::{MonitorConfig, PerformanceMonitor};
use swell_quality::{QualityValidator, ValidatorConfig};
use swell_registry::{ComponentDiscoverer, ComponentKind, ComponentRegistry, ComponentSpec};
use swell_synthesis::{FileWaveContextStore, SynthesisConfig, SynthesisEngine};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swell", about = "Swell — wave-based multi-agent orchestration pipeline")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "swell.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch one event (JSON file) through the pipeline
    Dispatch {
        /// Path to the event JSON file
        event: PathBuf,
    },
    /// Invoke a registered component by name and action
    Invoke {
        /// Component name
        component: String,
        /// Action string
        action: String,
        /// JSON object of keyword parameters
        #[arg(long)]
        params: Option<String>,
    },
    /// Run the fallback discoverer over a component directory
    Discover {
        /// Directory to scan (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print registry and monitor status
    Status,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SwellConfig {
    monitor: MonitorConfig,
    agents: AgentManagerConfig,
    synthesis: SynthesisConfig,
    validator: ValidatorConfig,
    compression: OptimizerConfig,
    dispatcher: DispatcherConfig,
    components_dir: Option<PathBuf>,
    wave_context_path: PathBuf,
}

impl SwellConfig {
    fn wave_context_path_or_default(&self) -> PathBuf {
        if self.wave_context_path.as_os_str().is_empty() {
            PathBuf::from("./data/wave_context.json")
        } else {
            self.wave_context_path.clone()
        }
    }
}

/// Event shape accepted on disk; looser than the internal type so a
/// hand-written file needs only a tool name.
#[derive(Debug, Deserialize)]
struct EventFile {
    tool_name: String,
    #[serde(default)]
    arguments: HashMap<String, serde_json::Value>,
    query: Option<String>,
    session_id: Option<uuid::Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    match cli.command {
        Commands::Dispatch { event } => dispatch(&config, &event).await,
        Commands::Invoke {
            component,
            action,
            params,
        } => invoke(&config, &component, &action, params.as_deref()).await,
        Commands::Discover { dir } => discover(&config, dir).await,
        Commands::Status => status(&config).await,
    }
}

async fn load_config(path: &Path) -> anyhow::Result<SwellConfig> {
    if !path.exists() {
        info!(path = %path.display(), "No config file found, using defaults");
        return Ok(SwellConfig::default());
    }
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse config {}: {e}", path.display()))
}

/// Builds the component registry with every pipeline adapter registered
/// and, when configured, discovery metadata merged in.
async fn build_registry(
    config: &SwellConfig,
    monitor: Arc<PerformanceMonitor>,
) -> anyhow::Result<ComponentRegistry> {
    let registry = ComponentRegistry::new(monitor);

    let validator = Arc::new(QualityValidator::new(config.validator.clone())?);
    registry
        .register(ComponentSpec {
            name: "quality".to_string(),
            kind: ComponentKind::Validation,
            description: "Quality scoring over pluggable dimensions".to_string(),
            latency_target_ms: None,
            dependencies: vec![],
            handler: Arc::new(QualityComponent::new(validator)),
        })
        .await;

    let optimizer = Arc::new(TokenOptimizer::new(config.compression.clone())?);
    registry
        .register(ComponentSpec {
            name: "compression".to_string(),
            kind: ComponentKind::Feature,
            description: "Budget-adaptive output compression".to_string(),
            latency_target_ms: None,
            dependencies: vec![],
            handler: Arc::new(CompressionComponent::new(optimizer)),
        })
        .await;

    let engine = Arc::new(SynthesisEngine::new(config.synthesis.clone()));
    let store = Arc::new(FileWaveContextStore::new(
        config.wave_context_path_or_default(),
    ));
    registry
        .register(ComponentSpec {
            name: "synthesis".to_string(),
            kind: ComponentKind::Feature,
            description: "Cross-wave compound-intelligence synthesis".to_string(),
            latency_target_ms: None,
            dependencies: vec!["quality".to_string()],
            handler: Arc::new(SynthesisComponent::new(engine, store)),
        })
        .await;

    if let Some(dir) = &config.components_dir {
        let discoverer = ComponentDiscoverer::new(dir.clone())?;
        let known: Vec<String> = registry
            .get_registry_status()
            .await
            .components
            .keys()
            .cloned()
            .collect();
        match discoverer.discover(&known) {
            Ok(discovered) => {
                for metadata in discovered {
                    registry.register_discovered(metadata).await;
                }
            }
            Err(e) => warn!(error = %e, "Component discovery failed, continuing with manifest only"),
        }
    }

    Ok(registry)
}

async fn dispatch(config: &SwellConfig, event_path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(event_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read event {}: {e}", event_path.display()))?;
    let file: EventFile = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse event {}: {e}", event_path.display()))?;

    let mut event = Event::new(file.tool_name);
    event.arguments = file.arguments;
    event.query = file.query;
    event.session_id = file.session_id;

    let monitor = Arc::new(PerformanceMonitor::new(config.monitor.clone()));
    let services = Arc::new(stub_service_registry());
    let dispatcher = EventDispatcher::new(services, Arc::clone(&monitor), config.dispatcher.clone());

    let envelope = dispatcher.dispatch(&event).await;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

async fn invoke(
    config: &SwellConfig,
    component: &str,
    action: &str,
    params: Option<&str>,
) -> anyhow::Result<()> {
    let params: HashMap<String, serde_json::Value> = match params {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("failed to parse --params as a JSON object: {e}"))?,
        None => HashMap::new(),
    };
    let monitor = Arc::new(PerformanceMonitor::new(config.monitor.clone()));
    let registry = build_registry(config, Arc::clone(&monitor)).await?;

    let envelope = registry.execute(component, action, params).await;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

async fn discover(config: &SwellConfig, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = dir
        .or_else(|| config.components_dir.clone())
        .ok_or_else(|| anyhow::anyhow!("no component directory given (--dir or components_dir)"))?;
    let discoverer = ComponentDiscoverer::new(dir)?;
    let discovered = discoverer.discover(&[])?;
    println!("{}", serde_json::to_string_pretty(&discovered)?);
    Ok(())
}

async fn status(config: &SwellConfig) -> anyhow::Result<()> {
    let monitor = Arc::new(PerformanceMonitor::new(config.monitor.clone()));
    let registry = build_registry(config, Arc::clone(&monitor)).await?;

    // The agent manager participates in status output even when idle so
    // operators can see the configured pool.
    let agents = swell_agents::AgentManager::new(config.agents.clone(), Arc::clone(&monitor));

    let status = serde_json::json!({
        "registry": registry.get_registry_status().await,
        "metrics": monitor.get_metrics(),
        "active_agents": agents.active_count().await,
        "pool_capacity": config.agents.pool_capacity,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
