//! Cross-agent and cross-wave synthesis.
//!
//! Extracts key insights from a wave's validated results, merges them
//! into a bounded-length summary with a quality tier and confidence
//! score, and accumulates a length-bounded "compound intelligence"
//! string across waves for injection into later waves.
//!
//! # Main types
//!
//! - [`SynthesisEngine`] — Insight extraction, wave synthesis, compound accumulation.
//! - [`Synthesis`] — One wave's synthesized output.
//! - [`WaveContextStore`] — Persistence seam for the wave-context map.

/// Wave synthesis and compound-intelligence accumulation.
pub mod engine;
/// Insight extraction from collected results.
pub mod insights;
/// Wave-context persistence.
pub mod store;

pub use engine::{Synthesis, SynthesisConfig, SynthesisEngine};
pub use insights::Insight;
pub use store::{FileWaveContextStore, WaveContext, WaveContextStore, WaveRecord};
