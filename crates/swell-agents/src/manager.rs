use crate::agent::{Agent, AgentState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use swell_core::SwellResult;
use swell_monitor::PerformanceMonitor;
use tokio::sync::{Notify, RwLock, Semaphore};
use tracing::{info, warn};

/// Agent manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentManagerConfig {
    /// Maximum number of concurrently executing agents.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    /// Per-agent execution time limit in seconds; `None` disables it.
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout_secs: Option<u64>,
}

fn default_pool_capacity() -> usize {
    10
}
fn default_agent_timeout_secs() -> Option<u64> {
    Some(300)
}

impl Default for AgentManagerConfig {
    fn default() -> Self {
        Self {
            pool_capacity: default_pool_capacity(),
            agent_timeout_secs: default_agent_timeout_secs(),
        }
    }
}

/// Result of waiting for a wave: terminal agents split by outcome, plus
/// whether the wait gave up before every agent finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveOutcome {
    /// Agents that completed with a result.
    pub completed: Vec<Agent>,
    /// Agents that failed or timed out.
    pub failed: Vec<Agent>,
    /// True when the wait deadline passed with agents still active.
    pub timed_out: bool,
}

/// Owns the bounded agent pool and every agent's lifecycle record.
///
/// Shared state is two maps behind one lock each (active agents,
/// per-wave history); no lock is ever held across an await of agent
/// work, and completion times are written once under the same lock
/// readers use.
pub struct AgentManager {
    active: Arc<RwLock<HashMap<String, Agent>>>,
    history: Arc<RwLock<HashMap<u32, Vec<Agent>>>>,
    permits: Arc<Semaphore>,
    changed: Arc<Notify>,
    monitor: Arc<PerformanceMonitor>,
    config: AgentManagerConfig,
}

impl AgentManager {
    /// Creates a manager with the given pool configuration.
    pub fn new(config: AgentManagerConfig, monitor: Arc<PerformanceMonitor>) -> Self {
        Self {
            active: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(HashMap::new())),
            permits: Arc::new(Semaphore::new(config.pool_capacity.max(1))),
            changed: Arc::new(Notify::new()),
            monitor,
            config,
        }
    }

    /// Spawns an agent executing the caller-supplied work future.
    ///
    /// The agent is recorded INITIALIZING immediately, transitions to
    /// RUNNING once it holds a pool permit, and finishes COMPLETED,
    /// FAILED, or TIMEOUT depending on the work's outcome. Returns the
    /// synthesized agent id.
    pub async fn spawn<F>(
        &self,
        agent_type: &str,
        wave: u32,
        task_name: &str,
        work: F,
    ) -> SwellResult<String>
    where
        F: Future<Output = SwellResult<serde_json::Value>> + Send + 'static,
    {
        let agent = Agent::new(agent_type, wave, task_name);
        let id = agent.id.clone();
        info!(agent = %id, wave, "Spawning agent");
        {
            let mut active = self.active.write().await;
            active.insert(id.clone(), agent);
        }

        let active = Arc::clone(&self.active);
        let permits = Arc::clone(&self.permits);
        let changed = Arc::clone(&self.changed);
        let monitor = Arc::clone(&self.monitor);
        let agent_timeout = self.config.agent_timeout_secs.map(Duration::from_secs);
        let task_id = id.clone();

        tokio::spawn(async move {
            let permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // Pool closed during shutdown before this agent ran.
                    let mut agents = active.write().await;
                    if let Some(agent) = agents.get_mut(&task_id) {
                        agent.finish(
                            AgentState::Failed,
                            None,
                            Some("pool closed before execution".to_string()),
                        );
                    }
                    changed.notify_waiters();
                    return;
                }
            };

            {
                let mut agents = active.write().await;
                if let Some(agent) = agents.get_mut(&task_id) {
                    if agent.state != AgentState::Initializing {
                        // Shutdown marked it CLEANUP while queued.
                        drop(permit);
                        changed.notify_waiters();
                        return;
                    }
                    agent.state = AgentState::Running;
                }
            }
            changed.notify_waiters();

            let start = Instant::now();
            let outcome = match agent_timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(result) => result.map_err(|e| (AgentState::Failed, e.to_string())),
                    Err(_) => Err((
                        AgentState::TimedOut,
                        format!("agent exceeded its {}s time limit", limit.as_secs()),
                    )),
                },
                None => work
                    .await
                    .map_err(|e| (AgentState::Failed, e.to_string())),
            };
            let elapsed = start.elapsed();
            drop(permit);

            {
                let mut agents = active.write().await;
                match agents.get_mut(&task_id) {
                    Some(agent) => match outcome {
                        Ok(result) => agent.finish(AgentState::Completed, Some(result), None),
                        Err((state, error)) => agent.finish(state, None, Some(error)),
                    },
                    None => {
                        warn!(agent = %task_id, "Agent record vanished before completion");
                    }
                }
            }
            monitor.record_timing("agent.execution", elapsed);
            changed.notify_waiters();
        });

        self.monitor
            .record_gauge("agent_pool.available", self.permits.available_permits() as f64);
        Ok(id)
    }

    /// Waits until every agent in the wave reaches a terminal state or
    /// the timeout elapses, whichever comes first.
    ///
    /// Wave membership is recomputed on every wakeup, so agents spawned
    /// into the wave mid-wait are covered and no lock is held while
    /// sleeping. On timeout the partial completed/failed lists are
    /// returned with `timed_out` set; still-active agents keep running.
    pub async fn wait_for_wave_completion(&self, wave: u32, timeout: Duration) -> WaveOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before inspecting state so a transition
            // between the check and the await cannot be missed.
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let still_active = {
                let active = self.active.read().await;
                active
                    .values()
                    .any(|a| a.wave == wave && a.state.is_active())
            };
            if !still_active {
                return self.wave_outcome(wave, false).await;
            }
            if Instant::now() >= deadline {
                warn!(wave, "Wave wait timed out with agents still active");
                return self.wave_outcome(wave, true).await;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(tokio::time::Instant::now() + remaining(deadline)) => {}
            }
        }
    }

    async fn wave_outcome(&self, wave: u32, timed_out: bool) -> WaveOutcome {
        let mut completed = Vec::new();
        let mut failed = Vec::new();
        {
            let active = self.active.read().await;
            for agent in active.values().filter(|a| a.wave == wave) {
                match agent.state {
                    AgentState::Completed => completed.push(agent.clone()),
                    AgentState::Failed | AgentState::TimedOut | AgentState::Cleanup => {
                        failed.push(agent.clone());
                    }
                    _ => {}
                }
            }
        }
        {
            let history = self.history.read().await;
            if let Some(archived) = history.get(&wave) {
                for agent in archived {
                    match agent.state {
                        AgentState::Completed => completed.push(agent.clone()),
                        _ => failed.push(agent.clone()),
                    }
                }
            }
        }
        completed.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        failed.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        WaveOutcome {
            completed,
            failed,
            timed_out,
        }
    }

    /// Looks up one agent by id, active or archived.
    pub async fn get_agent(&self, id: &str) -> Option<Agent> {
        if let Some(agent) = self.active.read().await.get(id) {
            return Some(agent.clone());
        }
        let history = self.history.read().await;
        history
            .values()
            .flatten()
            .find(|a| a.id == id)
            .cloned()
    }

    /// Every agent known for a wave, active and archived.
    pub async fn wave_agents(&self, wave: u32) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self
            .active
            .read()
            .await
            .values()
            .filter(|a| a.wave == wave)
            .cloned()
            .collect();
        if let Some(archived) = self.history.read().await.get(&wave) {
            agents.extend(archived.iter().cloned());
        }
        agents.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        agents
    }

    /// Archives terminal agents older than `max_age` into per-wave
    /// history and removes them from the active map. Returns how many
    /// were archived.
    pub async fn cleanup_completed_agents(&self, max_age: Duration) -> usize {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::zero());
        let mut archived = 0;
        let mut active = self.active.write().await;
        let mut history = self.history.write().await;
        active.retain(|_, agent| {
            let expired = agent.state.is_terminal()
                && agent.completed_at.map(|t| t <= cutoff).unwrap_or(false);
            if expired {
                history.entry(agent.wave).or_default().push(agent.clone());
                archived += 1;
            }
            !expired
        });
        if archived > 0 {
            info!(archived, "Archived finished agents");
        }
        archived
    }

    /// Marks in-flight agents CLEANUP, closes the pool, and archives
    /// everything with a zero-age cleanup.
    pub async fn shutdown_all_agents(&self) {
        {
            let mut active = self.active.write().await;
            for agent in active.values_mut() {
                if agent.state.is_active() {
                    agent.finish(AgentState::Cleanup, None, Some("shutdown".to_string()));
                }
            }
        }
        self.permits.close();
        self.changed.notify_waiters();
        self.cleanup_completed_agents(Duration::ZERO).await;
        info!("Agent manager shut down");
    }

    /// Number of agents currently in the active map.
    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use swell_core::SwellError;

    fn manager() -> AgentManager {
        AgentManager::new(
            AgentManagerConfig::default(),
            Arc::new(PerformanceMonitor::default()),
        )
    }

    #[tokio::test]
    async fn test_spawn_and_complete() {
        let mgr = manager();
        let id = mgr
            .spawn("researcher", 1, "scan", async {
                Ok(serde_json::json!({"found": 3}))
            })
            .await
            .unwrap();

        let outcome = mgr
            .wait_for_wave_completion(1, Duration::from_secs(5))
            .await;
        assert!(!outcome.timed_out);
        assert_eq!(outcome.completed.len(), 1);
        assert!(outcome.failed.is_empty());

        let agent = mgr.get_agent(&id).await.unwrap();
        assert_eq!(agent.state, AgentState::Completed);
        assert!(agent.completed_at.is_some());
        assert_eq!(agent.result, Some(serde_json::json!({"found": 3})));
    }

    #[tokio::test]
    async fn test_failed_agent_reported_separately() {
        let mgr = manager();
        mgr.spawn("coder", 1, "ok", async { Ok(serde_json::json!("fine")) })
            .await
            .unwrap();
        mgr.spawn("coder", 1, "bad", async {
            Err(SwellError::Agent("exploded".into()))
        })
        .await
        .unwrap();

        let outcome = mgr
            .wait_for_wave_completion(1, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].state, AgentState::Failed);
        assert_eq!(outcome.failed[0].error.as_deref(), Some("Agent error: exploded"));
    }

    #[tokio::test]
    async fn test_wait_returns_promptly_on_timeout() {
        let mgr = manager();
        mgr.spawn("sleeper", 1, "nap", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(serde_json::json!(null))
        })
        .await
        .unwrap();

        let start = Instant::now();
        let outcome = mgr
            .wait_for_wave_completion(1, Duration::from_millis(100))
            .await;
        assert!(outcome.timed_out);
        assert!(outcome.completed.is_empty());
        // Bounded return: well within timeout plus scheduling slack.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_wave_membership_isolated() {
        let mgr = manager();
        mgr.spawn("a", 1, "t", async { Ok(serde_json::json!(1)) })
            .await
            .unwrap();
        mgr.spawn("b", 2, "t", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(serde_json::json!(2))
        })
        .await
        .unwrap();

        // Wave 1 finishes even though wave 2 never does.
        let outcome = mgr
            .wait_for_wave_completion(1, Duration::from_secs(5))
            .await;
        assert!(!outcome.timed_out);
        assert_eq!(outcome.completed.len(), 1);
    }

    #[tokio::test]
    async fn test_agent_timeout_marks_timed_out() {
        let mgr = AgentManager::new(
            AgentManagerConfig {
                pool_capacity: 2,
                agent_timeout_secs: Some(0),
            },
            Arc::new(PerformanceMonitor::default()),
        );
        let id = mgr
            .spawn("slow", 1, "t", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(serde_json::json!(null))
            })
            .await
            .unwrap();
        let outcome = mgr
            .wait_for_wave_completion(1, Duration::from_secs(5))
            .await;
        assert!(!outcome.timed_out);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(mgr.get_agent(&id).await.unwrap().state, AgentState::TimedOut);
    }

    #[tokio::test]
    async fn test_cleanup_archives_into_history() {
        let mgr = manager();
        let id = mgr
            .spawn("a", 3, "t", async { Ok(serde_json::json!(1)) })
            .await
            .unwrap();
        mgr.wait_for_wave_completion(3, Duration::from_secs(5))
            .await;

        let archived = mgr.cleanup_completed_agents(Duration::ZERO).await;
        assert_eq!(archived, 1);
        assert_eq!(mgr.active_count().await, 0);

        // Still reachable through history.
        let agent = mgr.get_agent(&id).await.unwrap();
        assert_eq!(agent.state, AgentState::Completed);
        assert_eq!(mgr.wave_agents(3).await.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_respects_max_age() {
        let mgr = manager();
        mgr.spawn("a", 1, "t", async { Ok(serde_json::json!(1)) })
            .await
            .unwrap();
        mgr.wait_for_wave_completion(1, Duration::from_secs(5))
            .await;

        // Fresh agents survive an hour-long age threshold.
        let archived = mgr.cleanup_completed_agents(Duration::from_secs(3600)).await;
        assert_eq!(archived, 0);
        assert_eq!(mgr.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_marks_and_archives() {
        let mgr = manager();
        mgr.spawn("slow", 1, "t", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(serde_json::json!(null))
        })
        .await
        .unwrap();
        // Give the worker a chance to reach RUNNING.
        tokio::time::sleep(Duration::from_millis(20)).await;

        mgr.shutdown_all_agents().await;
        assert_eq!(mgr.active_count().await, 0);
        let agents = mgr.wave_agents(1).await;
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].state, AgentState::Cleanup);
        assert!(agents[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let mgr = AgentManager::new(
            AgentManagerConfig {
                pool_capacity: 1,
                agent_timeout_secs: None,
            },
            Arc::new(PerformanceMonitor::default()),
        );
        // Two agents, capacity one: both still finish.
        mgr.spawn("a", 1, "t", async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(serde_json::json!(1))
        })
        .await
        .unwrap();
        mgr.spawn("b", 1, "t", async { Ok(serde_json::json!(2)) })
            .await
            .unwrap();

        let outcome = mgr
            .wait_for_wave_completion(1, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.completed.len(), 2);
    }
}
