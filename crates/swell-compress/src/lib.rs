//! Adaptive compression of pipeline output against a token budget.
//!
//! Maps token-budget utilization and situational context (persona, task
//! complexity, content type, user familiarity) to one of five ordered
//! compression strategies, then applies symbol substitution, term
//! abbreviation, structural tightening, and filler removal while
//! estimating how much information survived.
//!
//! # Main types
//!
//! - [`CompressionStrategy`] — The five-step strategy ladder.
//! - [`CompressionContext`] — Situational inputs to strategy selection.
//! - [`TokenOptimizer`] — Strategy selection and application.

/// The token optimizer and its passes.
pub mod optimizer;
/// Strategy ladder, personas, and selection context.
pub mod strategy;

pub use optimizer::{CompressionResult, OptimizerConfig, TokenOptimizer};
pub use strategy::{
    determine_strategy, CompressionContext, CompressionStrategy, CompressionTolerance,
    ContentType, Familiarity, PersonaProfile, TaskComplexity,
};
