use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An inbound tool-use event entering the pipeline.
///
/// Immutable once created; classification derives an [`EventContext`]
/// instead of mutating the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Name of the tool that was invoked (e.g. `"Read"`, `"Bash"`).
    pub tool_name: String,
    /// Arguments the tool was invoked with.
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
    /// UTC timestamp of when the event was created.
    pub timestamp: DateTime<Utc>,
    /// Session the event belongs to, when known.
    pub session_id: Option<Uuid>,
    /// Free-text user query accompanying the tool use, when available.
    pub query: Option<String>,
}

impl Event {
    /// Creates a new event for the given tool with no arguments.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
            timestamp: Utc::now(),
            session_id: None,
            query: None,
        }
    }

    /// Adds a single argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    /// Attaches the originating session.
    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Attaches the free-text user query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Broad category assigned to an event during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Reading or writing files.
    FileOperation,
    /// Producing or editing code.
    CodeGeneration,
    /// Searching across files or content.
    Search,
    /// Running commands or scripts.
    Execution,
    /// Analysis, review, or investigation work.
    Analysis,
    /// Anything that matched no specific category.
    General,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::FileOperation => write!(f, "file_operation"),
            EventKind::CodeGeneration => write!(f, "code_generation"),
            EventKind::Search => write!(f, "search"),
            EventKind::Execution => write!(f, "execution"),
            EventKind::Analysis => write!(f, "analysis"),
            EventKind::General => write!(f, "general"),
        }
    }
}

/// The classified, immutable view of an [`Event`].
///
/// Created once per event by the dispatcher's classifier; never mutated
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    /// Unique id for this classification.
    pub id: Uuid,
    /// Broad event category.
    pub kind: EventKind,
    /// Complexity score, clamped to `[0, 1]`.
    pub complexity: f64,
    /// Domain hint tags (e.g. `"security"`, `"performance"`).
    pub domain_hints: Vec<String>,
}

impl EventContext {
    /// Creates a classified context, clamping complexity into `[0, 1]`
    /// and de-duplicating hints while preserving first-seen order.
    pub fn new(kind: EventKind, complexity: f64, mut domain_hints: Vec<String>) -> Self {
        let mut seen = std::collections::HashSet::new();
        domain_hints.retain(|h| seen.insert(h.clone()));
        Self {
            id: Uuid::new_v4(),
            kind,
            complexity: complexity.clamp(0.0, 1.0),
            domain_hints,
        }
    }

    /// Whether the context carries the given hint tag.
    pub fn has_hint(&self, hint: &str) -> bool {
        self.domain_hints.iter().any(|h| h == hint)
    }
}
