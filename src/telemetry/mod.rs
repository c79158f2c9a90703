//! Session telemetry collector and helpers.
//!
//! The collector fans calibration, staircase and trial events out to any
//! subscribers through a broadcast channel and keeps a bounded history for
//! CLI reporting. Publishing never blocks the frame loop and needs no
//! runtime.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

use crate::calibration::CalibrationTarget;
use crate::staircase::SequenceName;

pub mod events;

pub use events::ExperimentEvent;

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<ExperimentEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of events.
pub struct TelemetryCollector {
    tx: broadcast::Sender<ExperimentEvent>,
    history: Mutex<VecDeque<ExperimentEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: ExperimentEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            if self.history_capacity > 0 {
                if history.len() == self.history_capacity {
                    history.pop_front();
                    self.dropped_history.fetch_add(1, Ordering::Relaxed);
                }
                history.push_back(event.clone());
            }
        }

        // No subscribers is the normal case outside diagnostics.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExperimentEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Top-level hub with typed recording helpers.
pub struct TelemetryHub {
    collector: TelemetryCollector,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    pub fn record_calibration_round(
        &self,
        target: CalibrationTarget,
        level: usize,
        alpha: f64,
        beta: f64,
    ) {
        self.collector.publish(ExperimentEvent::CalibrationRound {
            target,
            level,
            alpha,
            beta,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_calibration_judgement(&self, target: CalibrationTarget, sweep: usize, approved: bool) {
        self.collector.publish(ExperimentEvent::CalibrationJudgement {
            target,
            sweep,
            approved,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_staircase_step(
        &self,
        sequence: SequenceName,
        alpha: f64,
        detected: bool,
        next_alpha: f64,
    ) {
        self.collector.publish(ExperimentEvent::StaircaseStep {
            sequence,
            alpha,
            detected,
            next_alpha,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_staircase_converged(&self, threshold: f64, steps: usize) {
        self.collector.publish(ExperimentEvent::StaircaseConverged {
            threshold,
            steps,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_trial(&self, block: &str, trial_id: &str, terminated_by: &str) {
        self.collector.publish(ExperimentEvent::TrialCompleted {
            block: block.to_string(),
            trial_id: trial_id.to_string(),
            terminated_by: terminated_by.to_string(),
            timestamp_ms: now_timestamp_ms(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 128)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converged(threshold: f64) -> ExperimentEvent {
        ExperimentEvent::StaircaseConverged {
            threshold,
            steps: 10,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(converged(0.1));
        collector.publish(converged(0.2));
        collector.publish(ExperimentEvent::TrialCompleted {
            block: "b".to_string(),
            trial_id: "t".to_string(),
            terminated_by: "time_out".to_string(),
            timestamp_ms: 0,
        });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert_eq!(snapshot.recent[0], converged(0.1));
        assert!(matches!(
            snapshot.recent[2],
            ExperimentEvent::TrialCompleted { .. }
        ));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        collector.publish(converged(0.1));
        collector.publish(converged(0.2));
        collector.publish(converged(0.3));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.recent[0], converged(0.2));
    }

    #[test]
    fn collector_without_history_counts_no_drops() {
        let collector = TelemetryCollector::new(8, 0);
        collector.publish(converged(0.1));
        collector.publish(converged(0.2));

        let snapshot = collector.snapshot();
        assert!(snapshot.recent.is_empty());
        assert_eq!(snapshot.dropped_events, 0);
        assert_eq!(snapshot.total_events, 2);
    }

    #[test]
    fn subscribers_receive_published_events() {
        let hub = TelemetryHub::new(8, 8);
        let mut rx = hub.collector().subscribe();
        hub.record_staircase_step(SequenceName::Dutch, 0.29, true, 0.29 + 1.0 / 255.0);

        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            ExperimentEvent::StaircaseStep {
                sequence: SequenceName::Dutch,
                detected: true,
                ..
            }
        ));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let hub = TelemetryHub::new(4, 4);
        hub.record_calibration_judgement(CalibrationTarget::Background, 2, false);
        let json = serde_json::to_value(&hub.snapshot().recent[0]).unwrap();
        assert_eq!(json["type"], "calibration_judgement");
        assert_eq!(json["payload"]["target"], "background");
    }
}
