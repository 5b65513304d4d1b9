use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Severity of a threshold breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Duration exceeded the warning threshold.
    Warning,
    /// Duration exceeded the critical threshold.
    Critical,
}

/// An alert raised after an operation breached its latency threshold on
/// consecutive samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAlert {
    /// Operation the alert refers to.
    pub operation: String,
    /// Breach severity.
    pub severity: AlertSeverity,
    /// Human-readable description.
    pub message: String,
    /// Observed duration in milliseconds.
    pub observed_ms: f64,
    /// The threshold that was breached, in milliseconds.
    pub threshold_ms: f64,
    /// How many consecutive samples violated the threshold.
    pub consecutive: u32,
    /// When the alert was raised.
    pub raised_at: DateTime<Utc>,
}

/// Fixed-capacity alert buffer; the oldest alert is evicted on overflow.
#[derive(Debug)]
pub struct AlertBuffer {
    alerts: VecDeque<PerformanceAlert>,
    capacity: usize,
}

impl AlertBuffer {
    /// Creates a buffer holding at most `capacity` alerts.
    pub fn new(capacity: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an alert, evicting the oldest when full.
    pub fn push(&mut self, alert: PerformanceAlert) {
        if self.alerts.len() == self.capacity {
            self.alerts.pop_front();
        }
        self.alerts.push_back(alert);
    }

    /// The most recent `count` alerts, newest first.
    pub fn recent(&self, count: usize) -> Vec<PerformanceAlert> {
        self.alerts.iter().rev().take(count).cloned().collect()
    }

    /// Counts buffered alerts of the given severity.
    pub fn count_by_severity(&self, severity: AlertSeverity) -> usize {
        self.alerts.iter().filter(|a| a.severity == severity).count()
    }

    /// Number of buffered alerts.
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn alert(op: &str, severity: AlertSeverity) -> PerformanceAlert {
        PerformanceAlert {
            operation: op.to_string(),
            severity,
            message: format!("{op} over threshold"),
            observed_ms: 120.0,
            threshold_ms: 100.0,
            consecutive: 3,
            raised_at: Utc::now(),
        }
    }

    #[test]
    fn test_buffer_bounded() {
        let mut buffer = AlertBuffer::new(3);
        for i in 0..10 {
            buffer.push(alert(&format!("op_{i}"), AlertSeverity::Warning));
        }
        assert_eq!(buffer.len(), 3);
        // Oldest were evicted: only op_7..op_9 remain.
        let recent = buffer.recent(3);
        assert_eq!(recent[0].operation, "op_9");
        assert_eq!(recent[2].operation, "op_7");
    }

    #[test]
    fn test_recent_newest_first() {
        let mut buffer = AlertBuffer::new(10);
        buffer.push(alert("first", AlertSeverity::Warning));
        buffer.push(alert("second", AlertSeverity::Critical));
        let recent = buffer.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].operation, "second");
    }

    #[test]
    fn test_count_by_severity() {
        let mut buffer = AlertBuffer::new(10);
        buffer.push(alert("a", AlertSeverity::Warning));
        buffer.push(alert("b", AlertSeverity::Critical));
        buffer.push(alert("c", AlertSeverity::Critical));
        assert_eq!(buffer.count_by_severity(AlertSeverity::Warning), 1);
        assert_eq!(buffer.count_by_severity(AlertSeverity::Critical), 2);
    }
}
