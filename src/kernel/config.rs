//! Tunable coefficients for the kernel.
//!
//! Every coefficient the engines use lives here, so a host can retune a
//! character without touching code. Missing fields fall back to defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::belief::Intent;
use super::time::TICK_MS;

/// Floor applied to every standard deviation before it divides anything.
pub const MIN_STD_DEV: f32 = 1e-3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub belief: BeliefConfig,
    pub free_energy: FreeEnergyConfig,
    pub decision: DecisionConfig,
    pub driver: DriverConfig,
}

impl KernelConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Rejects coefficient sets that would make the engines ill-conditioned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.belief.validate()?;
        self.free_energy.validate()?;
        self.decision.validate()?;

        if self.driver.tick_ms == 0 {
            return Err(ConfigError::Invalid("driver.tick_ms must be positive".into()));
        }
        if self.driver.channel_capacity == 0 {
            return Err(ConfigError::Invalid("driver.channel_capacity must be positive".into()));
        }

        let fe = &self.free_energy;
        let gaze_rise = fe.base_precision.gaze * fe.trust_gain.gaze;
        let discount = fe.base_cost * fe.trust_bonus;
        if gaze_rise > discount {
            warn!(
                gaze_rise,
                discount,
                "gaze precision outgrows the trust discount; trusted agents may read as surprising"
            );
        }
        Ok(())
    }
}

/// Mean and spread of one observation feature under one intent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    pub mean: f32,
    pub std_dev: f32,
}

impl Gaussian {
    pub const fn new(mean: f32, std_dev: f32) -> Self {
        Self { mean, std_dev }
    }

    pub fn z_score(&self, x: f32) -> f32 {
        (x - self.mean) / self.std_dev.max(MIN_STD_DEV)
    }
}

/// What an agent with a given intent is expected to look like.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentProfile {
    pub distance: Gaussian,
    pub closing_speed: Gaussian,
    pub gaze: Gaussian,
    pub erraticness: Gaussian,
}

impl IntentProfile {
    fn gaussians(&self) -> [Gaussian; 4] {
        [self.distance, self.closing_speed, self.gaze, self.erraticness]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentModel {
    pub approach: IntentProfile,
    pub neutral: IntentProfile,
    pub threat: IntentProfile,
    pub friendly: IntentProfile,
}

impl IntentModel {
    pub fn profile(&self, intent: Intent) -> &IntentProfile {
        match intent {
            Intent::Approach => &self.approach,
            Intent::Neutral => &self.neutral,
            Intent::Threat => &self.threat,
            Intent::Friendly => &self.friendly,
        }
    }
}

impl Default for IntentModel {
    fn default() -> Self {
        Self {
            approach: IntentProfile {
                distance: Gaussian::new(3.0, 1.5),
                closing_speed: Gaussian::new(1.5, 0.75),
                gaze: Gaussian::new(0.5, 0.4),
                erraticness: Gaussian::new(0.2, 0.2),
            },
            neutral: IntentProfile {
                distance: Gaussian::new(8.0, 4.0),
                closing_speed: Gaussian::new(0.0, 0.5),
                gaze: Gaussian::new(0.0, 0.5),
                erraticness: Gaussian::new(0.1, 0.2),
            },
            threat: IntentProfile {
                distance: Gaussian::new(1.5, 1.0),
                closing_speed: Gaussian::new(4.0, 1.5),
                gaze: Gaussian::new(0.8, 0.3),
                erraticness: Gaussian::new(1.0, 0.5),
            },
            friendly: IntentProfile {
                distance: Gaussian::new(3.5, 1.5),
                closing_speed: Gaussian::new(0.5, 0.5),
                gaze: Gaussian::new(0.9, 0.25),
                erraticness: Gaussian::new(0.05, 0.15),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeliefConfig {
    pub model: IntentModel,
    /// Global prior in `Intent::ALL` order. Renormalized on use.
    pub prior: [f32; 4],
    /// Floor on the previous posterior before taking its log.
    pub prior_floor: f32,
    /// Weight of the fresh posterior when blending with the previous one.
    pub smoothing: f32,
    /// Trust gained per second under full Friendly mass.
    pub trust_gain_rate: f32,
    /// Trust lost per second under full Threat mass.
    pub trust_loss_rate: f32,
    /// Fraction of trust that relaxes toward zero per second otherwise.
    pub trust_decay_rate: f32,
    pub kindness_threshold: f32,
    pub kindness_rate: f32,
    pub friend_trust: f32,
    pub friend_kindness: f32,
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            model: IntentModel::default(),
            prior: [0.2, 0.5, 0.1, 0.2],
            prior_floor: 1e-4,
            smoothing: 0.3,
            trust_gain_rate: 0.2,
            trust_loss_rate: 0.4,
            trust_decay_rate: 0.02,
            kindness_threshold: 0.5,
            kindness_rate: 1.0,
            friend_trust: 0.5,
            friend_kindness: 10.0,
        }
    }
}

impl BeliefConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for intent in Intent::ALL {
            for g in self.model.profile(intent).gaussians() {
                if !(g.std_dev > 0.0) || !g.mean.is_finite() {
                    return Err(ConfigError::Invalid(format!(
                        "belief.model.{intent:?}: std_dev must be positive and mean finite"
                    )));
                }
            }
        }
        if self.prior.iter().any(|p| !(*p >= 0.0)) || self.prior.iter().sum::<f32>() <= 0.0 {
            return Err(ConfigError::Invalid(
                "belief.prior must be non-negative with positive mass".into(),
            ));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(ConfigError::Invalid("belief.smoothing must lie in (0, 1]".into()));
        }
        if !(self.prior_floor > 0.0) {
            return Err(ConfigError::Invalid("belief.prior_floor must be positive".into()));
        }
        let rates = [
            self.trust_gain_rate,
            self.trust_loss_rate,
            self.trust_decay_rate,
            self.kindness_rate,
        ];
        if rates.iter().any(|r| !(*r >= 0.0)) {
            return Err(ConfigError::Invalid("belief rates must be non-negative".into()));
        }
        Ok(())
    }
}

/// One value per prediction-error channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelParams {
    pub distance: f32,
    pub velocity: f32,
    pub angle: f32,
    pub gaze: f32,
    pub behavior: f32,
}

impl ChannelParams {
    pub const fn splat(v: f32) -> Self {
        Self {
            distance: v,
            velocity: v,
            angle: v,
            gaze: v,
            behavior: v,
        }
    }

    pub fn as_array(&self) -> [f32; 5] {
        [self.distance, self.velocity, self.angle, self.gaze, self.behavior]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeEnergyConfig {
    pub comfortable_distance: f32,
    pub gentle_speed: f32,
    /// Trajectory angle (radians) below which an approach reads as head-on.
    pub head_on_angle: f32,
    pub base_precision: ChannelParams,
    /// How strongly trust (or distrust) bends each channel's precision.
    pub trust_gain: ChannelParams,
    pub precision_min: f32,
    pub precision_max: f32,
    pub base_cost: f32,
    pub trust_bonus: f32,
    pub trend_alpha: f32,
    /// Fraction of the peak lost per second while not exceeded.
    pub peak_decay: f32,
    /// Smallest peak used for normalization.
    pub peak_floor: f32,
    /// Number of speed samples behind the behavior channel.
    pub behavior_window: usize,
}

impl Default for FreeEnergyConfig {
    fn default() -> Self {
        Self {
            comfortable_distance: 3.0,
            gentle_speed: 1.0,
            head_on_angle: 0.5,
            base_precision: ChannelParams::splat(1.0),
            trust_gain: ChannelParams {
                distance: 0.5,
                velocity: 1.0,
                angle: 0.5,
                gaze: 0.5,
                behavior: 1.0,
            },
            precision_min: 0.05,
            precision_max: 5.0,
            base_cost: 0.5,
            trust_bonus: 2.0,
            trend_alpha: 0.2,
            peak_decay: 0.1,
            peak_floor: 1.0,
            behavior_window: 8,
        }
    }
}

impl FreeEnergyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let refs = [self.comfortable_distance, self.gentle_speed, self.head_on_angle];
        if refs.iter().any(|r| !(*r > 0.0)) {
            return Err(ConfigError::Invalid(
                "free_energy reference distance, speed and angle must be positive".into(),
            ));
        }
        if !(self.precision_min > 0.0 && self.precision_min <= self.precision_max) {
            return Err(ConfigError::Invalid(
                "free_energy precision range must be positive and ordered".into(),
            ));
        }
        if self.base_precision.as_array().iter().any(|p| !(*p > 0.0)) {
            return Err(ConfigError::Invalid("free_energy.base_precision must be positive".into()));
        }
        if self.trust_gain.as_array().iter().any(|g| !(*g >= 0.0)) {
            return Err(ConfigError::Invalid("free_energy.trust_gain must be non-negative".into()));
        }
        if !(self.base_cost >= 0.0 && self.trust_bonus >= 0.0) {
            return Err(ConfigError::Invalid("free_energy cost terms must be non-negative".into()));
        }
        if !(self.trend_alpha > 0.0 && self.trend_alpha <= 1.0) {
            return Err(ConfigError::Invalid("free_energy.trend_alpha must lie in (0, 1]".into()));
        }
        if !(self.peak_decay >= 0.0 && self.peak_floor > 0.0) {
            return Err(ConfigError::Invalid("free_energy peak terms must be positive".into()));
        }
        if self.behavior_window == 0 {
            return Err(ConfigError::Invalid(
                "free_energy.behavior_window must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Below this aggregate free energy, acting is not worth it.
    pub action_cost: f32,
    pub approach_threshold: f32,
    pub retreat_threshold: f32,
    pub approach_trust_min: f32,
    pub min_dwell_secs: f32,
    pub standoff_distance: f32,
    pub retreat_distance: f32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            action_cost: 0.3,
            approach_threshold: 1.5,
            retreat_threshold: 6.0,
            approach_trust_min: 0.3,
            min_dwell_secs: 1.5,
            standoff_distance: 1.5,
            retreat_distance: 8.0,
        }
    }
}

impl DecisionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.action_cost >= 0.0
            && self.action_cost <= self.approach_threshold
            && self.approach_threshold <= self.retreat_threshold)
        {
            return Err(ConfigError::Invalid(
                "decision thresholds must satisfy 0 <= action_cost <= approach <= retreat".into(),
            ));
        }
        if !(self.min_dwell_secs >= 0.0) {
            return Err(ConfigError::Invalid("decision.min_dwell_secs must be non-negative".into()));
        }
        if !(self.standoff_distance >= 0.0 && self.retreat_distance > 0.0) {
            return Err(ConfigError::Invalid("decision movement bounds must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub tick_ms: u64,
    pub channel_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            channel_capacity: 256,
        }
    }
}
