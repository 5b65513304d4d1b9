//! Performance monitoring for every Swell pipeline operation.
//!
//! Records timing, counter, and gauge samples, compares timings against
//! per-operation thresholds, raises alerts after consecutive violations,
//! and derives a rolling health score. Recording is infallible and never
//! blocks: every method takes `&self`, uses a short critical section, and
//! returns nothing — a broken monitor must never take a component down
//! with it.
//!
//! # Main types
//!
//! - [`PerformanceMonitor`] — The recording and query surface.
//! - [`MonitorConfig`] — Thresholds, violation limit, buffer capacities.
//! - [`PerformanceAlert`] — One threshold-breach alert.

/// Alert types and the bounded alert buffer.
pub mod alerts;
/// The monitor itself.
pub mod monitor;

pub use alerts::{AlertSeverity, PerformanceAlert};
pub use monitor::{MetricsSnapshot, MonitorConfig, OperationStatistics, PerformanceMonitor, ThresholdPair};
