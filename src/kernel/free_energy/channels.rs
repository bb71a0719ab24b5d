//! Prediction-error channels and trust-modulated precision.

use serde::{Deserialize, Serialize};

use crate::kernel::config::FreeEnergyConfig;

pub const CHANNEL_COUNT: usize = 5;

/// Upper bound on a single channel's error, keeps the quadratic form finite.
const MAX_CHANNEL_ERROR: f32 = 1.0e3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Deviation from the comfortable distance.
    Distance,
    /// Closing speed in excess of a gentle approach.
    Velocity,
    /// How head-on the trajectory is.
    Angle,
    /// Direct gaze at the NPC.
    Gaze,
    /// Spread of recent speeds.
    Behavior,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Distance,
        Channel::Velocity,
        Channel::Angle,
        Channel::Gaze,
        Channel::Behavior,
    ];

    pub const fn index(self) -> usize {
        match self {
            Channel::Distance => 0,
            Channel::Velocity => 1,
            Channel::Angle => 2,
            Channel::Gaze => 3,
            Channel::Behavior => 4,
        }
    }
}

/// One value per channel, indexed by `Channel::index`.
pub type ChannelVector = [f32; CHANNEL_COUNT];

pub fn distance_error(distance: f32, cfg: &FreeEnergyConfig) -> f32 {
    if !distance.is_finite() {
        return 0.0;
    }
    bounded((distance - cfg.comfortable_distance).abs() / cfg.comfortable_distance)
}

/// Only excess closing speed counts; receding reads as zero.
pub fn velocity_error(closing_speed: f32, cfg: &FreeEnergyConfig) -> f32 {
    if !closing_speed.is_finite() {
        return 0.0;
    }
    bounded((closing_speed - cfg.gentle_speed).max(0.0) / cfg.gentle_speed)
}

pub fn angle_error(trajectory_angle: f32, cfg: &FreeEnergyConfig) -> f32 {
    if !trajectory_angle.is_finite() {
        return 0.0;
    }
    bounded((cfg.head_on_angle - trajectory_angle).max(0.0) / cfg.head_on_angle)
}

/// Looking away is not penalized.
pub fn gaze_error(gaze_alignment: f32) -> f32 {
    if !gaze_alignment.is_finite() {
        return 0.0;
    }
    gaze_alignment.clamp(-1.0, 1.0).max(0.0)
}

/// Population standard deviation of the samples.
pub fn spread<I>(samples: I) -> f32
where
    I: IntoIterator<Item = f32> + Clone,
{
    let mut n = 0usize;
    let mut sum = 0.0;
    for s in samples.clone() {
        sum += s;
        n += 1;
    }
    if n < 2 {
        return 0.0;
    }
    let mean = sum / n as f32;
    let var = samples.into_iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n as f32;
    bounded(var.max(0.0).sqrt())
}

/// Effective precision for the tick.
///
/// Distance and angle relax as trust grows; velocity and behavior sharpen
/// under distrust; gaze sharpens with trust.
pub fn modulate_precision(trust: f32, cfg: &FreeEnergyConfig) -> ChannelVector {
    let t = if trust.is_finite() { trust.clamp(-1.0, 1.0) } else { 0.0 };
    let distrust = (-t).max(0.0);
    let base = &cfg.base_precision;
    let gain = &cfg.trust_gain;

    let raw = [
        base.distance * (1.0 - gain.distance * t),
        base.velocity * (1.0 + gain.velocity * distrust),
        base.angle * (1.0 - gain.angle * t),
        base.gaze * (1.0 + gain.gaze * t),
        base.behavior * (1.0 + gain.behavior * distrust),
    ];
    raw.map(|p| {
        if p.is_finite() {
            p.clamp(cfg.precision_min, cfg.precision_max)
        } else {
            cfg.precision_min
        }
    })
}

/// Surprise the NPC tolerates before it counts; grows with trust.
pub fn complexity_cost(trust: f32, cfg: &FreeEnergyConfig) -> f32 {
    let t = if trust.is_finite() { trust.clamp(-1.0, 1.0) } else { 0.0 };
    cfg.base_cost * (1.0 + t.max(0.0) * cfg.trust_bonus)
}

/// `max(0, Σ_c π_c·e_c² − cost)`
pub fn weighted_free_energy(errors: &ChannelVector, precision: &ChannelVector, cost: f32) -> f32 {
    let energy: f32 = errors
        .iter()
        .zip(precision)
        .map(|(e, p)| p * bounded(*e).powi(2))
        .sum();
    let f = energy - cost;
    if f.is_finite() {
        f.max(0.0)
    } else {
        0.0
    }
}

/// Free energy of an error vector at a given trust, with fresh precision.
pub fn free_energy_at(errors: &ChannelVector, trust: f32, cfg: &FreeEnergyConfig) -> f32 {
    let precision = modulate_precision(trust, cfg);
    weighted_free_energy(errors, &precision, complexity_cost(trust, cfg))
}

fn bounded(e: f32) -> f32 {
    if e.is_finite() {
        e.clamp(0.0, MAX_CHANNEL_ERROR)
    } else {
        0.0
    }
}
