use ringbuf::traits::{Consumer, RingBuffer};
use ringbuf::HeapRb;
use tracing::{debug, warn};

use super::channels::{
    angle_error, complexity_cost, distance_error, gaze_error, modulate_precision, spread,
    velocity_error, weighted_free_energy, Channel, ChannelVector, CHANNEL_COUNT,
};
use crate::kernel::config::FreeEnergyConfig;
use crate::kernel::slots::{AgentId, SlotRegistry, MAX_SLOTS};
use crate::kernel::time::{sanitize_dt, MIN_DT_SECS};

/// Outcome of binding an agent. `evicted` is set when capacity forced a reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub slot: usize,
    pub evicted: Option<AgentId>,
}

pub struct FreeEnergyEngine {
    config: FreeEnergyConfig,
    registry: SlotRegistry,
    errors: [ChannelVector; MAX_SLOTS],
    // Recent speeds per slot. Allocated once, overwritten in place.
    speeds: [HeapRb<f32>; MAX_SLOTS],
    slot_energy: [f32; MAX_SLOTS],
    precision: ChannelVector,
    aggregate: f32,
    previous_aggregate: f32,
    trend: f32,
    peak: f32,
}

impl FreeEnergyEngine {
    pub fn new(config: FreeEnergyConfig) -> Self {
        let window = config.behavior_window.max(1);
        let precision = modulate_precision(0.0, &config);
        Self {
            registry: SlotRegistry::new(),
            errors: [[0.0; CHANNEL_COUNT]; MAX_SLOTS],
            speeds: std::array::from_fn(|_| HeapRb::new(window)),
            slot_energy: [0.0; MAX_SLOTS],
            precision,
            aggregate: 0.0,
            previous_aggregate: 0.0,
            trend: 0.0,
            peak: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &FreeEnergyConfig {
        &self.config
    }

    /// Binds the agent, evicting the least concerning slot when full.
    pub fn register(&mut self, agent: AgentId) -> Registration {
        if let Some(slot) = self.registry.find(agent) {
            return Registration { slot, evicted: None };
        }
        let energy = self.slot_energy;
        let (slot, evicted) = self.registry.allocate_or_evict(agent, |s| energy[s]);
        if let Some(old) = evicted {
            warn!(%old, %agent, slot, "slot capacity reached, evicting lowest free energy agent");
        }
        self.clear_slot(slot);
        Registration { slot, evicted }
    }

    pub fn unregister(&mut self, agent: AgentId) -> Option<usize> {
        let slot = self.registry.release(agent)?;
        self.clear_slot(slot);
        Some(slot)
    }

    pub fn find(&self, agent: AgentId) -> Option<usize> {
        self.registry.find(agent)
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// Recomputes every channel for `slot` from the latest observation.
    /// Unbound slots are ignored.
    pub fn set_observations(
        &mut self,
        slot: usize,
        distance: f32,
        closing_speed: f32,
        trajectory_angle: f32,
        gaze_alignment: f32,
        speed: f32,
    ) {
        if !self.registry.is_active(slot) {
            return;
        }
        let cfg = &self.config;

        let window = &mut self.speeds[slot];
        if speed.is_finite() {
            window.push_overwrite(speed.max(0.0));
        }
        let (head, tail) = window.as_slices();
        let behavior = spread(head.iter().chain(tail.iter()).copied());

        let errors = &mut self.errors[slot];
        errors[Channel::Distance.index()] = distance_error(distance, cfg);
        errors[Channel::Velocity.index()] = velocity_error(closing_speed, cfg);
        errors[Channel::Angle.index()] = angle_error(trajectory_angle, cfg);
        errors[Channel::Gaze.index()] = gaze_error(gaze_alignment);
        errors[Channel::Behavior.index()] = behavior;
    }

    /// The per-tick driver: precision from trust, per-slot and aggregate
    /// free energy, then trend and peak over `dt` seconds.
    pub fn compute_all(&mut self, trust: f32, dt: f32) {
        self.precision = modulate_precision(trust, &self.config);
        let cost = complexity_cost(trust, &self.config);

        let mut aggregate = 0.0;
        for slot in 0..MAX_SLOTS {
            let f = if self.registry.is_active(slot) {
                weighted_free_energy(&self.errors[slot], &self.precision, cost)
            } else {
                0.0
            };
            self.slot_energy[slot] = f;
            aggregate += f;
        }
        self.aggregate = aggregate;

        // A tick with no measurable elapsed time carries no rate information.
        // The trend holds and the change is folded into the next real step.
        let dt = sanitize_dt(dt);
        if dt > 0.0 {
            let alpha = self.config.trend_alpha.clamp(0.0, 1.0);
            let rate = (aggregate - self.previous_aggregate) / dt.max(MIN_DT_SECS);
            self.trend = self.trend * (1.0 - alpha) + rate * alpha;
            if !self.trend.is_finite() {
                self.trend = 0.0;
            }
            self.previous_aggregate = aggregate;
        }

        let retained = (1.0 - self.config.peak_decay * dt).clamp(0.0, 1.0);
        self.peak = aggregate.max(self.peak * retained);

        debug!(
            aggregate,
            trend = self.trend,
            peak = self.peak,
            trust,
            "free energy computed"
        );
    }

    pub fn free_energy(&self, slot: usize) -> f32 {
        if self.registry.is_active(slot) {
            self.slot_energy[slot]
        } else {
            0.0
        }
    }

    pub fn aggregate(&self) -> f32 {
        self.aggregate
    }

    pub fn prediction_error(&self, slot: usize, channel: Channel) -> f32 {
        if self.registry.is_active(slot) {
            self.errors[slot][channel.index()]
        } else {
            0.0
        }
    }

    pub fn prediction_errors(&self, slot: usize) -> ChannelVector {
        if self.registry.is_active(slot) {
            self.errors[slot]
        } else {
            [0.0; CHANNEL_COUNT]
        }
    }

    /// Raw index access for hosts that store channel numbers; 0 when out of range.
    pub fn prediction_error_at(&self, slot: usize, channel: usize) -> f32 {
        Channel::ALL
            .get(channel)
            .map_or(0.0, |c| self.prediction_error(slot, *c))
    }

    /// Precision used by the latest `compute_all`.
    pub fn precision(&self) -> ChannelVector {
        self.precision
    }

    pub fn trend(&self) -> f32 {
        self.trend
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Aggregate free energy scaled into `[0, 1]` by the decaying peak.
    pub fn normalized(&self) -> f32 {
        let scale = self.peak.max(self.config.peak_floor);
        (self.aggregate / scale).clamp(0.0, 1.0)
    }

    /// Slot with the highest free energy; ties go to the lower index.
    pub fn highest_slot(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (slot, _) in self.registry.active_slots() {
            let f = self.slot_energy[slot];
            if best.map_or(true, |(_, b)| f > b) {
                best = Some((slot, f));
            }
        }
        best.map(|(slot, _)| slot)
    }

    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    fn clear_slot(&mut self, slot: usize) {
        self.errors[slot] = [0.0; CHANNEL_COUNT];
        self.slot_energy[slot] = 0.0;
        Consumer::clear(&mut self.speeds[slot]);
    }
}
