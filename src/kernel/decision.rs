//! Behavior selection from free energy, trust and intent.
//!
//! The machine only reads the engines through the two reader traits below.
//! It never mutates them.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::belief::{BeliefEngine, Intent};
use super::config::DecisionConfig;
use super::free_energy::FreeEnergyEngine;
use super::scheduler::ActuationCommand;
use super::slots::{AgentId, MAX_SLOTS};
use super::time::sanitize_dt;

/// The single process-wide behavior of the NPC.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorState {
    /// Idle. Acting is not worth its cost.
    #[default]
    Silence,
    Observe,
    Approach,
    Retreat,
}

/// Read-only view of per-agent beliefs.
pub trait BeliefReader {
    fn agent_at(&self, slot: usize) -> Option<AgentId>;
    /// Instantaneous prediction error of the slot's latest observation.
    fn prediction_error(&self, slot: usize) -> f32;
    fn dominant(&self, slot: usize) -> Intent;
    fn trust(&self, slot: usize) -> f32;
}

/// Read-only view of the free-energy aggregate.
pub trait FreeEnergyReader {
    fn aggregate_free_energy(&self) -> f32;
}

impl BeliefReader for BeliefEngine {
    fn agent_at(&self, slot: usize) -> Option<AgentId> {
        self.registry().agent_at(slot)
    }

    fn prediction_error(&self, slot: usize) -> f32 {
        BeliefEngine::prediction_error(self, slot)
    }

    fn dominant(&self, slot: usize) -> Intent {
        BeliefEngine::dominant(self, slot)
    }

    fn trust(&self, slot: usize) -> f32 {
        BeliefEngine::trust(self, slot)
    }
}

impl FreeEnergyReader for FreeEnergyEngine {
    fn aggregate_free_energy(&self) -> f32 {
        self.aggregate()
    }
}

/// Result of one decision tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: BehaviorState,
    pub previous: BehaviorState,
    pub focus: Option<AgentId>,
    pub command: Option<ActuationCommand>,
}

impl Decision {
    pub fn changed(&self) -> bool {
        self.state != self.previous
    }
}

#[derive(Debug)]
pub struct DecisionMachine {
    config: DecisionConfig,
    state: BehaviorState,
    focus: Option<AgentId>,
    // Seconds of measured time since construction.
    clock: f64,
    last_transition_at: Option<f64>,
    idle: bool,
}

impl DecisionMachine {
    pub fn new(config: DecisionConfig) -> Self {
        Self {
            config,
            state: BehaviorState::Silence,
            focus: None,
            clock: 0.0,
            last_transition_at: None,
            idle: true,
        }
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    pub fn focus(&self) -> Option<AgentId> {
        self.focus
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Seconds spent in the current state.
    pub fn time_in_state(&self) -> f64 {
        self.clock - self.last_transition_at.unwrap_or(0.0)
    }

    /// Agent with the highest prediction error; ties go to the lower slot.
    pub fn select_focus<B: BeliefReader>(beliefs: &B) -> Option<(usize, AgentId)> {
        let mut best: Option<(usize, AgentId, f32)> = None;
        for slot in 0..MAX_SLOTS {
            let Some(agent) = beliefs.agent_at(slot) else { continue };
            let raw = beliefs.prediction_error(slot);
            let pe = if raw.is_finite() { raw } else { 0.0 };
            if best.map_or(true, |(_, _, b)| pe > b) {
                best = Some((slot, agent, pe));
            }
        }
        best.map(|(slot, agent, _)| (slot, agent))
    }

    /// Target state for the current inputs, ignoring dwell.
    pub fn resolve<B: BeliefReader>(
        &self,
        beliefs: &B,
        free_energy: f32,
        focus_slot: Option<usize>,
    ) -> BehaviorState {
        let cfg = &self.config;
        let Some(slot) = focus_slot else {
            return BehaviorState::Silence;
        };
        let f = if free_energy.is_finite() { free_energy.max(0.0) } else { 0.0 };

        if f < cfg.action_cost {
            return BehaviorState::Silence;
        }
        if f > cfg.retreat_threshold {
            return BehaviorState::Retreat;
        }

        let intent = beliefs.dominant(slot);
        let trust = beliefs.trust(slot);
        if intent == Intent::Threat && f > cfg.approach_threshold {
            BehaviorState::Retreat
        } else if intent == Intent::Friendly && trust > cfg.approach_trust_min * 0.5 {
            BehaviorState::Approach
        } else if f < cfg.approach_threshold && trust >= cfg.approach_trust_min {
            BehaviorState::Approach
        } else {
            BehaviorState::Observe
        }
    }

    /// One decision tick over `dt` seconds of measured time.
    pub fn update<B, F>(&mut self, beliefs: &B, free_energy: &F, dt: f32) -> Decision
    where
        B: BeliefReader,
        F: FreeEnergyReader,
    {
        self.clock += f64::from(sanitize_dt(dt));
        let previous = self.state;

        let focus = Self::select_focus(beliefs);
        self.focus = focus.map(|(_, agent)| agent);

        let dwell_elapsed = self
            .last_transition_at
            .map_or(true, |t| self.clock - t >= f64::from(self.config.min_dwell_secs));

        // Nobody left to react to: drop back to ground without waiting.
        let target = if focus.is_none() {
            Some(BehaviorState::Silence)
        } else if dwell_elapsed {
            Some(self.resolve(beliefs, free_energy.aggregate_free_energy(), focus.map(|(s, _)| s)))
        } else {
            None
        };

        if let Some(next) = target {
            if next != self.state {
                info!(
                    from = ?self.state,
                    to = ?next,
                    focus = ?self.focus,
                    free_energy = free_energy.aggregate_free_energy(),
                    "behavior transition"
                );
                self.state = next;
                self.last_transition_at = Some(self.clock);
            }
        }

        let command = self.command();
        Decision {
            state: self.state,
            previous,
            focus: self.focus,
            command,
        }
    }

    fn command(&mut self) -> Option<ActuationCommand> {
        let cfg = &self.config;
        let command = match (self.state, self.focus) {
            (BehaviorState::Silence, _) | (_, None) => {
                if self.idle {
                    None
                } else {
                    Some(ActuationCommand::Stop)
                }
            }
            (BehaviorState::Observe, Some(agent)) => Some(ActuationCommand::Face { agent }),
            (BehaviorState::Approach, Some(agent)) => Some(ActuationCommand::Approach {
                agent,
                standoff: cfg.standoff_distance,
            }),
            (BehaviorState::Retreat, Some(agent)) => Some(ActuationCommand::Retreat {
                agent,
                max_distance: cfg.retreat_distance,
            }),
        };
        self.idle = matches!(command, Some(ActuationCommand::Stop) | None);
        command
    }
}
