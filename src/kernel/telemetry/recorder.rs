use std::collections::VecDeque;

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};

const DEFAULT_CAPACITY: usize = 4_096;

/// Fixed-size log of kernel events. Once full, each new event displaces the
/// oldest one, so memory use stays flat over long sessions.
#[derive(Debug)]
pub struct TelemetryRecorder {
    log: VecDeque<TelemetryEvent>,
    capacity: usize,
    dropped: u64,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            log: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        if self.log.len() == self.capacity {
            self.log.pop_front();
            self.dropped += 1;
        }
        self.log.push_back(event);
    }

    /// Counters over the events still held.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.log)
    }

    pub fn events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.log.iter()
    }

    /// Events displaced since construction or the last `clear`.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn clear(&mut self) {
        self.log.clear();
        self.dropped = 0;
    }
}
