use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Recorded but not yet holding a pool permit.
    Initializing,
    /// Executing its work.
    Running,
    /// Work finished with a result payload.
    Completed,
    /// Work finished with an error.
    Failed,
    /// Work exceeded its per-agent time limit.
    TimedOut,
    /// Marked for removal during shutdown.
    Cleanup,
}

impl AgentState {
    /// Whether the state will never change again.
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Whether the agent is still doing (or about to do) work.
    pub fn is_active(self) -> bool {
        matches!(self, AgentState::Initializing | AgentState::Running)
    }
}

/// A unit of delegated work tracked through the lifecycle state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Id derived from wave number, agent type, and creation time.
    pub id: String,
    /// The wave this agent belongs to.
    pub wave: u32,
    /// Declared type of the agent (e.g. `"researcher"`).
    pub agent_type: String,
    /// Name of the task the agent is working on.
    pub task_name: String,
    /// Current lifecycle state.
    pub state: AgentState,
    /// When the agent was spawned.
    pub started_at: DateTime<Utc>,
    /// When the agent reached a terminal state; written at most once.
    pub completed_at: Option<DateTime<Utc>>,
    /// Result payload, present after COMPLETED.
    pub result: Option<serde_json::Value>,
    /// Error text, present after FAILED or TIMEOUT.
    pub error: Option<String>,
}

impl Agent {
    /// Creates a new agent in the INITIALIZING state.
    pub fn new(agent_type: impl Into<String>, wave: u32, task_name: impl Into<String>) -> Self {
        let agent_type = agent_type.into();
        let now = Utc::now();
        // Millis plus a uuid fragment keeps ids unique when a wave
        // spawns several agents of the same type in the same instant.
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!(
            "wave{wave}-{agent_type}-{}-{}",
            now.timestamp_millis(),
            &suffix[..8]
        );
        Self {
            id,
            wave,
            agent_type,
            task_name: task_name.into(),
            state: AgentState::Initializing,
            started_at: now,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Transitions into a terminal state, setting the completion time
    /// exactly once. A second terminal transition is ignored.
    pub fn finish(&mut self, state: AgentState, result: Option<serde_json::Value>, error: Option<String>) {
        debug_assert!(state.is_terminal());
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        self.result = result;
        self.error = error;
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_encodes_wave_and_type() {
        let agent = Agent::new("researcher", 2, "scan docs");
        assert!(agent.id.starts_with("wave2-researcher-"));
        assert_eq!(agent.state, AgentState::Initializing);
        assert!(agent.completed_at.is_none());
    }

    #[test]
    fn test_ids_unique_for_same_type_and_wave() {
        let a = Agent::new("coder", 1, "t");
        let b = Agent::new("coder", 1, "t");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_completion_time_set_once() {
        let mut agent = Agent::new("coder", 1, "t");
        agent.finish(AgentState::Completed, Some(serde_json::json!("done")), None);
        let first = agent.completed_at;
        assert!(first.is_some());

        // A later terminal transition must not move the completion time
        // or overwrite the outcome.
        agent.finish(AgentState::Failed, None, Some("late error".into()));
        assert_eq!(agent.completed_at, first);
        assert_eq!(agent.state, AgentState::Completed);
        assert!(agent.error.is_none());
    }

    #[test]
    fn test_state_predicates() {
        assert!(AgentState::Initializing.is_active());
        assert!(AgentState::Running.is_active());
        assert!(AgentState::Completed.is_terminal());
        assert!(AgentState::TimedOut.is_terminal());
        assert!(AgentState::Cleanup.is_terminal());
    }
}
