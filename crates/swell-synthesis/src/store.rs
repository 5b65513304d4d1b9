use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use swell_core::{SwellError, SwellResult};

/// Per-wave record inside the persisted wave context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveRecord {
    /// The wave's synthesized summary.
    #[serde(default)]
    pub summary: String,
    /// Number of agents that contributed.
    #[serde(default)]
    pub agent_count: usize,
    /// Per-agent payloads keyed by agent id.
    #[serde(default)]
    pub agents: HashMap<String, serde_json::Value>,
    /// When the wave's synthesis completed.
    pub completed_at: Option<DateTime<Utc>>,
}

/// The wave-context map keyed by wave number.
///
/// Ordered so compound intelligence always walks waves oldest-first.
pub type WaveContext = BTreeMap<u32, WaveRecord>;

/// Persistence seam for the wave context.
///
/// The context is owned by external collaborators; this pipeline only
/// reads and writes it as a JSON-shaped map.
#[async_trait]
pub trait WaveContextStore: Send + Sync {
    /// Loads the full context; an absent store yields an empty map.
    async fn load(&self) -> SwellResult<WaveContext>;
    /// Persists the full context.
    async fn save(&self, context: &WaveContext) -> SwellResult<()>;
}

/// JSON-file wave-context store.
pub struct FileWaveContextStore {
    path: PathBuf,
}

impl FileWaveContextStore {
    /// Creates a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WaveContextStore for FileWaveContextStore {
    async fn load(&self) -> SwellResult<WaveContext> {
        if !self.path.exists() {
            return Ok(WaveContext::new());
        }
        let data = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&data)
            .map_err(|e| SwellError::Synthesis(format!("failed to parse wave context: {e}")))
    }

    async fn save(&self, context: &WaveContext) -> SwellResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(context)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWaveContextStore::new(dir.path().join("context.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWaveContextStore::new(dir.path().join("context.json"));

        let mut context = WaveContext::new();
        context.insert(
            1,
            WaveRecord {
                summary: "Wave one went fine".to_string(),
                agent_count: 3,
                agents: HashMap::new(),
                completed_at: Some(Utc::now()),
            },
        );
        store.save(&context).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[&1].summary, "Wave one went fine");
        assert_eq!(loaded[&1].agent_count, 3);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_synthesis_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let store = FileWaveContextStore::new(path);
        assert!(matches!(
            store.load().await,
            Err(SwellError::Synthesis(_))
        ));
    }
}
