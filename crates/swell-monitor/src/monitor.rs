use crate::alerts::{AlertBuffer, AlertSeverity, PerformanceAlert};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::warn;

/// A per-operation (warning, critical) latency threshold pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdPair {
    /// Durations above this are warning-level violations.
    pub warning_ms: u64,
    /// Durations above this are critical-level violations.
    pub critical_ms: u64,
}

impl Default for ThresholdPair {
    fn default() -> Self {
        Self {
            warning_ms: 200,
            critical_ms: 1_000,
        }
    }
}

/// Monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Thresholds applied to operations without an explicit entry.
    #[serde(default)]
    pub default_thresholds: ThresholdPair,
    /// Per-operation threshold overrides.
    #[serde(default)]
    pub thresholds: HashMap<String, ThresholdPair>,
    /// Consecutive violations required before an alert fires.
    #[serde(default = "default_violation_limit")]
    pub violation_limit: u32,
    /// Capacity of the alert ring buffer.
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,
    /// Timing samples retained per operation.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
}

fn default_violation_limit() -> u32 {
    3
}
fn default_alert_capacity() -> usize {
    100
}
fn default_window_capacity() -> usize {
    256
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            default_thresholds: ThresholdPair::default(),
            thresholds: HashMap::new(),
            violation_limit: default_violation_limit(),
            alert_capacity: default_alert_capacity(),
            window_capacity: default_window_capacity(),
        }
    }
}

/// Summary statistics over an operation's retained timing samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationStatistics {
    /// Samples currently retained in the window.
    pub sample_count: usize,
    /// Total samples ever recorded.
    pub total_count: u64,
    /// Minimum duration in the window, milliseconds.
    pub min_ms: f64,
    /// Mean duration in the window, milliseconds.
    pub avg_ms: f64,
    /// Maximum duration in the window, milliseconds.
    pub max_ms: f64,
    /// Current consecutive-violation streak.
    pub consecutive_violations: u32,
}

/// A point-in-time snapshot of every metric the monitor holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Per-operation timing statistics.
    pub operations: HashMap<String, OperationStatistics>,
    /// Named counters.
    pub counters: HashMap<String, u64>,
    /// Named gauges.
    pub gauges: HashMap<String, f64>,
    /// Rolling health score in `[0, 1]`.
    pub health_score: f64,
}

struct OperationTrack {
    samples: VecDeque<f64>, // milliseconds
    total_count: u64,
    consecutive_violations: u32,
}

impl OperationTrack {
    fn new() -> Self {
        Self {
            samples: VecDeque::new(),
            total_count: 0,
            consecutive_violations: 0,
        }
    }

    fn statistics(&self) -> OperationStatistics {
        let (mut min, mut max, mut sum) = (f64::MAX, 0.0f64, 0.0f64);
        for &ms in &self.samples {
            min = min.min(ms);
            max = max.max(ms);
            sum += ms;
        }
        let count = self.samples.len();
        OperationStatistics {
            sample_count: count,
            total_count: self.total_count,
            min_ms: if count == 0 { 0.0 } else { min },
            avg_ms: if count == 0 { 0.0 } else { sum / count as f64 },
            max_ms: max,
            consecutive_violations: self.consecutive_violations,
        }
    }
}

struct MonitorInner {
    operations: HashMap<String, OperationTrack>,
    counters: HashMap<String, u64>,
    gauges: HashMap<String, f64>,
    alerts: AlertBuffer,
}

/// Records timing, counter, and gauge samples for every pipeline
/// operation and raises [`PerformanceAlert`]s on sustained threshold
/// breaches.
///
/// All recording methods are infallible: the monitor observes the
/// pipeline, it never fails it.
pub struct PerformanceMonitor {
    inner: Mutex<MonitorInner>,
    config: MonitorConfig,
}

impl PerformanceMonitor {
    /// Creates a monitor with the given configuration.
    pub fn new(config: MonitorConfig) -> Self {
        let alerts = AlertBuffer::new(config.alert_capacity.max(1));
        Self {
            inner: Mutex::new(MonitorInner {
                operations: HashMap::new(),
                counters: HashMap::new(),
                gauges: HashMap::new(),
                alerts,
            }),
            config,
        }
    }

    fn thresholds_for(&self, operation: &str) -> ThresholdPair {
        self.config
            .thresholds
            .get(operation)
            .copied()
            .unwrap_or(self.config.default_thresholds)
    }

    /// Records one timing sample and evaluates it against the
    /// operation's thresholds.
    ///
    /// Violation streaks are tracked per operation: an in-bounds sample
    /// resets only its own operation's streak, and a streak reaching the
    /// configured limit emits an alert and resets.
    pub fn record_timing(&self, operation: &str, duration: Duration) {
        let observed_ms = duration.as_secs_f64() * 1_000.0;
        let thresholds = self.thresholds_for(operation);

        let mut inner = self.inner.lock();
        let track = inner
            .operations
            .entry(operation.to_string())
            .or_insert_with(OperationTrack::new);

        track.total_count += 1;
        if track.samples.len() == self.config.window_capacity {
            track.samples.pop_front();
        }
        track.samples.push_back(observed_ms);

        let severity = if observed_ms > thresholds.critical_ms as f64 {
            Some(AlertSeverity::Critical)
        } else if observed_ms > thresholds.warning_ms as f64 {
            Some(AlertSeverity::Warning)
        } else {
            None
        };

        match severity {
            None => {
                track.consecutive_violations = 0;
            }
            Some(severity) => {
                track.consecutive_violations += 1;
                if track.consecutive_violations >= self.config.violation_limit {
                    let consecutive = track.consecutive_violations;
                    track.consecutive_violations = 0;
                    let threshold_ms = match severity {
                        AlertSeverity::Critical => thresholds.critical_ms,
                        AlertSeverity::Warning => thresholds.warning_ms,
                    } as f64;
                    let alert = PerformanceAlert {
                        operation: operation.to_string(),
                        severity,
                        message: format!(
                            "{operation} exceeded its {}ms threshold on {consecutive} consecutive samples",
                            threshold_ms as u64
                        ),
                        observed_ms,
                        threshold_ms,
                        consecutive,
                        raised_at: Utc::now(),
                    };
                    warn!(
                        operation,
                        observed_ms, threshold_ms, consecutive, "performance alert raised"
                    );
                    inner.alerts.push(alert);
                }
            }
        }
    }

    /// Increments a named counter.
    pub fn record_counter(&self, name: &str, delta: u64) {
        let mut inner = self.inner.lock();
        *inner.counters.entry(name.to_string()).or_insert(0) += delta;
    }

    /// Sets a named gauge to the given value.
    pub fn record_gauge(&self, name: &str, value: f64) {
        let mut inner = self.inner.lock();
        inner.gauges.insert(name.to_string(), value);
    }

    /// Snapshot of all metrics plus the current health score.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        let operations: HashMap<String, OperationStatistics> = inner
            .operations
            .iter()
            .map(|(name, track)| (name.clone(), track.statistics()))
            .collect();
        let health_score = self.health_score_locked(&inner);
        MetricsSnapshot {
            operations,
            counters: inner.counters.clone(),
            gauges: inner.gauges.clone(),
            health_score,
        }
    }

    /// The most recent `count` alerts, newest first.
    pub fn get_alerts(&self, count: usize) -> Vec<PerformanceAlert> {
        self.inner.lock().alerts.recent(count)
    }

    /// Statistics over the last `window` samples of one operation, or
    /// `None` if the operation has never been recorded.
    pub fn get_operation_statistics(
        &self,
        operation: &str,
        window: usize,
    ) -> Option<OperationStatistics> {
        let inner = self.inner.lock();
        let track = inner.operations.get(operation)?;
        let windowed: Vec<f64> = track.samples.iter().rev().take(window).copied().collect();
        let count = windowed.len();
        if count == 0 {
            return Some(OperationStatistics {
                sample_count: 0,
                total_count: track.total_count,
                min_ms: 0.0,
                avg_ms: 0.0,
                max_ms: 0.0,
                consecutive_violations: track.consecutive_violations,
            });
        }
        let sum: f64 = windowed.iter().sum();
        Some(OperationStatistics {
            sample_count: count,
            total_count: track.total_count,
            min_ms: windowed.iter().copied().fold(f64::MAX, f64::min),
            avg_ms: sum / count as f64,
            max_ms: windowed.iter().copied().fold(0.0, f64::max),
            consecutive_violations: track.consecutive_violations,
        })
    }

    /// Rolling health score in `[0, 1]`.
    ///
    /// Averages each operation's bucketed performance (1.0 under warning,
    /// 0.7 under critical, 0.3 otherwise) and subtracts a penalty
    /// proportional to buffered alert counts, critical weighted above
    /// warning. An idle monitor scores 1.0.
    pub fn health_score(&self) -> f64 {
        let inner = self.inner.lock();
        self.health_score_locked(&inner)
    }

    fn health_score_locked(&self, inner: &MonitorInner) -> f64 {
        if inner.operations.is_empty() {
            return 1.0;
        }
        let mut bucket_sum = 0.0;
        for (name, track) in &inner.operations {
            let stats = track.statistics();
            let thresholds = self.thresholds_for(name);
            bucket_sum += if stats.avg_ms <= thresholds.warning_ms as f64 {
                1.0
            } else if stats.avg_ms <= thresholds.critical_ms as f64 {
                0.7
            } else {
                0.3
            };
        }
        let base = bucket_sum / inner.operations.len() as f64;
        let warning_count = inner.alerts.count_by_severity(AlertSeverity::Warning) as f64;
        let critical_count = inner.alerts.count_by_severity(AlertSeverity::Critical) as f64;
        let penalty = (0.02 * warning_count + 0.05 * critical_count).min(0.5);
        (base - penalty).clamp(0.0, 1.0)
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
