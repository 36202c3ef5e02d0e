use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

const MAX_EVENTS: usize = 10_000;

/// Bounded event log shared by the registry, player and sequencer.
#[derive(Debug)]
pub struct TelemetryRecorder {
    buffer: Mutex<VecDeque<TelemetryEvent>>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(MAX_EVENTS)),
        }
    }

    pub fn record(&self, event: TelemetryEvent) {
        let mut buffer = self.lock();
        if buffer.len() >= MAX_EVENTS {
            buffer.pop_front();
        }
        buffer.push_back(event);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.lock())
    }

    /// Copy of the raw events, oldest first.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TelemetryEvent>> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}
