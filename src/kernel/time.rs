use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick {
    pub frame: u64,
}

pub const TICK_MS: u64 = 100;

/// Shortest step the kernel integrates over. Guards rate terms against a zero dt.
pub const MIN_DT_SECS: f32 = 0.001;

impl Tick {
    pub fn new() -> Self {
        Tick { frame: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { frame: self.frame + 1 }
    }
}

/// Measures wall time between decision ticks.
/// Ticks are not assumed to be evenly spaced.
#[derive(Debug)]
pub struct TickClock {
    last: Option<Instant>,
}

impl TickClock {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Seconds since the previous call. The first call reports `nominal_secs`.
    pub fn lap(&mut self, nominal_secs: f32) -> f32 {
        let now = Instant::now();
        let dt = match self.last {
            Some(prev) => now.duration_since(prev).as_secs_f32(),
            None => nominal_secs,
        };
        self.last = Some(now);
        sanitize_dt(dt)
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-finite or negative steps collapse to zero elapsed time.
pub fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        0.0
    }
}
