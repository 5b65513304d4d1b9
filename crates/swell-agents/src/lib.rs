//! Agent lifecycle management for the Swell pipeline.
//!
//! Owns a bounded worker pool, spawns agent tasks for a given wave,
//! tracks each agent through its lifecycle state machine, exposes a
//! wave-completion wait with timeout and partial results, and performs
//! time-based cleanup of finished agents into per-wave history.
//!
//! # Main types
//!
//! - [`AgentManager`] — Spawn, wait, cleanup, shutdown.
//! - [`Agent`] — One tracked unit of delegated work.
//! - [`AgentState`] — INITIALIZING → RUNNING → {COMPLETED, FAILED, TIMEOUT} → CLEANUP.

/// Agent record and lifecycle state machine.
pub mod agent;
/// The bounded-pool agent manager.
pub mod manager;

pub use agent::{Agent, AgentState};
pub use manager::{AgentManager, AgentManagerConfig, WaveOutcome};
