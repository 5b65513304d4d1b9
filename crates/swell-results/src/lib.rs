//! Collection and validation of raw agent outputs.
//!
//! Each agent result is validated against structural and size rules,
//! scored, indexed per wave, and summarized. Validation failures are
//! score penalties and issue strings, never errors thrown past the
//! collector.
//!
//! # Main types
//!
//! - [`ResultCollector`] — Collect, query, summarize, clean up.
//! - [`CollectedResult`] — One validated (or rejected) agent output.
//! - [`ValidationRules`] — Required fields, length window, wave range.

/// The collector and its validation rules.
pub mod collector;
/// Collected-result and summary types.
pub mod result;

pub use collector::{ResultCollector, ValidationRules};
pub use result::{CollectedResult, ValidationStatus, WaveSummary};
