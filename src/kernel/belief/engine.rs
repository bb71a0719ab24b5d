use tracing::debug;

use super::types::{argmax, AgentBelief, Intent, Posterior, INTENT_COUNT};
use crate::kernel::config::BeliefConfig;
use crate::kernel::memory::AgentSnapshot;
use crate::kernel::slots::{AgentId, SlotRegistry, MAX_SLOTS};
use crate::kernel::time::sanitize_dt;

/// Mass below which a posterior is treated as degenerate.
const MIN_MASS: f32 = 1e-4;

// Feature clamps applied before likelihood evaluation.
const MAX_DISTANCE: f32 = 1000.0;
const MAX_CLOSING_SPEED: f32 = 100.0;
const MAX_ERRATICNESS: f32 = 100.0;

pub struct BeliefEngine {
    config: BeliefConfig,
    registry: SlotRegistry,
    slots: [AgentBelief; MAX_SLOTS],
    prior: Posterior,
}

impl BeliefEngine {
    pub fn new(config: BeliefConfig) -> Self {
        let prior = normalized_or(config.prior, [1.0 / INTENT_COUNT as f32; INTENT_COUNT]);
        Self {
            config,
            registry: SlotRegistry::new(),
            slots: [AgentBelief::fresh(prior); MAX_SLOTS],
            prior,
        }
    }

    pub fn config(&self) -> &BeliefConfig {
        &self.config
    }

    /// The configured global prior, normalized.
    pub fn prior(&self) -> Posterior {
        self.prior
    }

    /// Binds the agent to a slot. A newly bound slot starts from the prior.
    /// `None` when every slot is taken.
    pub fn register(&mut self, agent: AgentId) -> Option<usize> {
        if let Some(slot) = self.registry.find(agent) {
            return Some(slot);
        }
        let slot = self.registry.allocate(agent)?;
        self.slots[slot] = AgentBelief::fresh(self.prior);
        Some(slot)
    }

    /// Releases the agent and returns what was known about it.
    pub fn unregister(&mut self, agent: AgentId) -> Option<AgentSnapshot> {
        let slot = self.registry.find(agent)?;
        let snapshot = self.snapshot(slot);
        self.registry.release_slot(slot);
        self.slots[slot] = AgentBelief::fresh(self.prior);
        snapshot
    }

    pub fn find(&self, agent: AgentId) -> Option<usize> {
        self.registry.find(agent)
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// One recursive Bayes step for `slot`, followed by trust and kindness
    /// integration over `dt` seconds. Unbound slots are ignored.
    pub fn update(
        &mut self,
        slot: usize,
        distance: f32,
        closing_speed: f32,
        gaze_alignment: f32,
        erraticness: f32,
        dt: f32,
    ) {
        self.revise(slot, distance, closing_speed, gaze_alignment, erraticness);
        self.integrate(slot, dt);
    }

    /// Posterior, dominant intent and surprise from one observation.
    /// Trust and kindness are left alone; see `integrate`.
    pub fn revise(
        &mut self,
        slot: usize,
        distance: f32,
        closing_speed: f32,
        gaze_alignment: f32,
        erraticness: f32,
    ) {
        if !self.registry.is_active(slot) {
            return;
        }
        let features = [
            clamp_feature(distance, 0.0, MAX_DISTANCE),
            clamp_feature(closing_speed, -MAX_CLOSING_SPEED, MAX_CLOSING_SPEED),
            clamp_feature(gaze_alignment, -1.0, 1.0),
            clamp_feature(erraticness, 0.0, MAX_ERRATICNESS),
        ];

        let previous = self.slots[slot].posterior;
        let (fresh, surprise) = self.infer(&previous, &features);

        let s = self.config.smoothing.clamp(0.0, 1.0);
        let mut blended = [0.0; INTENT_COUNT];
        for k in 0..INTENT_COUNT {
            blended[k] = (1.0 - s) * previous[k] + s * fresh[k];
        }
        let posterior = normalized_or(blended, self.prior);
        let dominant = argmax(&posterior);

        let belief = &mut self.slots[slot];
        belief.posterior = posterior;
        belief.dominant = dominant;
        belief.prediction_error = surprise;
        belief.updates += 1;

        debug!(slot, ?dominant, surprise, "belief revised");
    }

    /// Advances trust and kindness of `slot` by `dt` seconds under its
    /// current posterior. Call once per tick per agent, however many
    /// observations were revised in between.
    pub fn integrate(&mut self, slot: usize, dt: f32) {
        if !self.registry.is_active(slot) {
            return;
        }
        let dt = sanitize_dt(dt);
        let cfg = &self.config;
        let belief = &mut self.slots[slot];
        let posterior = belief.posterior;
        let dominant = belief.dominant;

        let mass = posterior[dominant.index()];
        belief.trust = match dominant {
            Intent::Friendly => {
                let step = (cfg.trust_gain_rate * mass * dt).clamp(0.0, 1.0);
                belief.trust + step * (1.0 - belief.trust)
            }
            Intent::Threat => {
                let step = (cfg.trust_loss_rate * mass * dt).clamp(0.0, 1.0);
                belief.trust - step * (1.0 + belief.trust)
            }
            Intent::Approach | Intent::Neutral => {
                let step = (cfg.trust_decay_rate * dt).clamp(0.0, 1.0);
                belief.trust - step * belief.trust
            }
        }
        .clamp(-1.0, 1.0);

        let friendly = posterior[Intent::Friendly.index()];
        if friendly > cfg.kindness_threshold {
            belief.kindness += cfg.kindness_rate * friendly * dt;
        }
        belief.kindness = if belief.kindness.is_finite() {
            belief.kindness.max(0.0)
        } else {
            f32::MAX
        };

        debug!(slot, ?dominant, mass, trust = belief.trust, dt, "trust integrated");
    }

    /// Fresh posterior from the likelihoods and the floored previous
    /// posterior, plus the surprise `-ln Σ_k prior_k·L_k`.
    fn infer(&self, previous: &Posterior, features: &[f32; 4]) -> (Posterior, f32) {
        let mut log_joint = [0.0_f32; INTENT_COUNT];
        for intent in Intent::ALL {
            let profile = self.config.model.profile(intent);
            let log_likelihood = -(profile.distance.z_score(features[0]).powi(2)
                + profile.closing_speed.z_score(features[1]).powi(2)
                + profile.gaze.z_score(features[2]).powi(2)
                + profile.erraticness.z_score(features[3]).powi(2));
            let k = intent.index();
            log_joint[k] = log_likelihood + previous[k].max(self.config.prior_floor).ln();
        }

        let peak = log_joint.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !peak.is_finite() {
            return (self.prior, 0.0);
        }

        let mut fresh = [0.0; INTENT_COUNT];
        let mut mass = 0.0;
        for k in 0..INTENT_COUNT {
            fresh[k] = (log_joint[k] - peak).exp();
            mass += fresh[k];
        }
        if !mass.is_finite() || mass < MIN_MASS {
            return (self.prior, 0.0);
        }
        for p in &mut fresh {
            *p /= mass;
        }

        let surprise = -(peak + mass.ln());
        let surprise = if surprise.is_finite() { surprise.max(0.0) } else { 0.0 };
        (fresh, surprise)
    }

    /// Seeds a slot with previously known trust and kindness.
    pub fn restore(&mut self, slot: usize, trust: f32, kindness: f32) {
        if !self.registry.is_active(slot) {
            return;
        }
        let belief = &mut self.slots[slot];
        belief.trust = if trust.is_finite() { trust.clamp(-1.0, 1.0) } else { 0.0 };
        belief.kindness = if kindness.is_finite() { kindness.max(0.0) } else { 0.0 };
    }

    pub fn snapshot(&self, slot: usize) -> Option<AgentSnapshot> {
        let agent = self.registry.agent_at(slot)?;
        let belief = &self.slots[slot];
        Some(AgentSnapshot {
            agent,
            trust: belief.trust,
            kindness: belief.kindness,
            dominant: belief.dominant,
        })
    }

    fn active(&self, slot: usize) -> Option<&AgentBelief> {
        if self.registry.is_active(slot) {
            Some(&self.slots[slot])
        } else {
            None
        }
    }

    pub fn belief(&self, slot: usize) -> Option<&AgentBelief> {
        self.active(slot)
    }

    /// Posterior for `slot`; the global prior for unbound slots.
    pub fn posterior(&self, slot: usize) -> Posterior {
        self.active(slot).map_or(self.prior, |b| b.posterior)
    }

    pub fn dominant(&self, slot: usize) -> Intent {
        self.active(slot).map_or(Intent::Neutral, |b| b.dominant)
    }

    pub fn trust(&self, slot: usize) -> f32 {
        self.active(slot).map_or(0.0, |b| b.trust)
    }

    pub fn kindness(&self, slot: usize) -> f32 {
        self.active(slot).map_or(0.0, |b| b.kindness)
    }

    pub fn prediction_error(&self, slot: usize) -> f32 {
        self.active(slot).map_or(0.0, |b| b.prediction_error)
    }

    pub fn is_friend(&self, slot: usize) -> bool {
        self.active(slot).is_some_and(|b| {
            b.trust > self.config.friend_trust && b.kindness > self.config.friend_kindness
        })
    }

    /// Mean trust over bound slots, 0 when nobody is around.
    pub fn aggregate_trust(&self) -> f32 {
        let mut sum = 0.0;
        let mut n = 0;
        for (slot, _) in self.registry.active_slots() {
            sum += self.slots[slot].trust;
            n += 1;
        }
        if n == 0 {
            0.0
        } else {
            (sum / n as f32).clamp(-1.0, 1.0)
        }
    }

    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }
}

fn clamp_feature(x: f32, lo: f32, hi: f32) -> f32 {
    if x.is_finite() {
        x.clamp(lo, hi)
    } else {
        0.0_f32.clamp(lo, hi)
    }
}

/// Normalizes `p`, or returns `fallback` when the mass is degenerate.
fn normalized_or(p: Posterior, fallback: Posterior) -> Posterior {
    let mut out = [0.0; INTENT_COUNT];
    let mut mass = 0.0;
    for k in 0..INTENT_COUNT {
        out[k] = if p[k].is_finite() { p[k].max(0.0) } else { 0.0 };
        mass += out[k];
    }
    if !mass.is_finite() || mass < MIN_MASS {
        return fallback;
    }
    for v in &mut out {
        *v /= mass;
    }
    out
}
