use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::belief::BeliefEngine;
use super::config::KernelConfig;
use super::decision::{Decision, DecisionMachine};
use super::free_energy::{Channel, FreeEnergyEngine};
use super::memory::{AgentMemory, InMemoryAgentMemory};
use super::perception::{Features, Observation, SelfPose};
use super::scheduler::Actuator;
use super::slots::{AgentId, MAX_SLOTS};
use super::telemetry::{TelemetryEvent, TelemetryRecorder};
use super::time::{Tick, TickClock};

#[derive(Debug, Clone)]
pub enum Event {
    /// Fresh sensing of one agent.
    Observed(Observation),
    /// The agent is no longer observed.
    Departed(AgentId),
    /// External aggregate trust replacing the belief engine's. `None` clears it.
    TrustOverride(Option<f32>),
}

/// Owns the engines and runs them in a fixed order once per tick.
pub struct Reactor<M: AgentMemory = InMemoryAgentMemory> {
    pub receiver: mpsc::Receiver<Event>,
    pub beliefs: BeliefEngine,
    pub free_energy: FreeEnergyEngine,
    pub decision: DecisionMachine,
    pub telemetry: TelemetryRecorder,
    pub memory: M,
    pub pose: SelfPose,
    pub tick: Tick,
    trust_override: Option<f32>,
    // Belief slots revised during the current tick.
    revised: [bool; MAX_SLOTS],
    tick_ms: u64,
    channel_capacity: usize,
}

impl Reactor<InMemoryAgentMemory> {
    pub fn new(config: KernelConfig, receiver: mpsc::Receiver<Event>) -> Self {
        Self::with_memory(config, receiver, InMemoryAgentMemory::new())
    }

    /// Reactor plus the sender half of its event channel.
    pub fn channel(config: KernelConfig) -> (mpsc::Sender<Event>, Self) {
        let (tx, rx) = mpsc::channel(config.driver.channel_capacity.max(1));
        (tx, Self::new(config, rx))
    }
}

impl<M: AgentMemory> Reactor<M> {
    pub fn with_memory(config: KernelConfig, receiver: mpsc::Receiver<Event>, memory: M) -> Self {
        let KernelConfig {
            belief,
            free_energy,
            decision,
            driver,
        } = config;
        Self {
            receiver,
            beliefs: BeliefEngine::new(belief),
            free_energy: FreeEnergyEngine::new(free_energy),
            decision: DecisionMachine::new(decision),
            telemetry: TelemetryRecorder::new(),
            memory,
            pose: SelfPose::default(),
            tick: Tick::new(),
            trust_override: None,
            revised: [false; MAX_SLOTS],
            tick_ms: driver.tick_ms.max(1),
            channel_capacity: driver.channel_capacity.max(1),
        }
    }

    pub fn set_pose(&mut self, pose: SelfPose) {
        self.pose = pose;
    }

    pub fn trust_override(&self) -> Option<f32> {
        self.trust_override
    }

    /// Trust fed to precision modulation this tick.
    pub fn aggregate_trust(&self) -> f32 {
        self.trust_override
            .unwrap_or_else(|| self.beliefs.aggregate_trust())
    }

    /// Pure Tick Step: ingest, infer, compute, decide. `dt` is measured seconds
    /// since the previous tick. MUST NOT await I/O or timers.
    ///
    /// The Tick is advanced at the VERY START of this step.
    pub fn tick_step<I>(&mut self, events: I, dt: f32) -> Decision
    where
        I: IntoIterator<Item = Event>,
    {
        self.tick = self.tick.next();
        self.revised = [false; MAX_SLOTS];

        // === 1. INGEST ===
        for event in events {
            match event {
                Event::Observed(obs) => self.observe(&obs),
                Event::Departed(agent) => self.depart(agent),
                Event::TrustOverride(value) => {
                    self.trust_override = value
                        .filter(|t| t.is_finite())
                        .map(|t| t.clamp(-1.0, 1.0));
                }
            }
        }

        // Trust and kindness advance once per agent, not once per observation.
        for slot in 0..MAX_SLOTS {
            if self.revised[slot] {
                self.beliefs.integrate(slot, dt);
            }
        }

        // === 2. FREE ENERGY ===
        let trust = self.aggregate_trust();
        self.free_energy.compute_all(trust, dt);

        // === 3. DECIDE ===
        let previous_focus = self.decision.focus();
        let decision = self.decision.update(&self.beliefs, &self.free_energy, dt);

        if decision.changed() {
            self.telemetry.record(TelemetryEvent::StateTransition {
                from: decision.previous,
                to: decision.state,
                tick: self.tick,
            });
        }
        if decision.focus != previous_focus {
            self.telemetry.record(TelemetryEvent::FocusChanged {
                from: previous_focus,
                to: decision.focus,
            });
        }

        decision
    }

    fn observe(&mut self, obs: &Observation) {
        let agent = obs.agent;

        let registration = self.free_energy.register(agent);
        if let Some(evicted) = registration.evicted {
            self.forget_beliefs(evicted);
            self.telemetry.record(TelemetryEvent::AgentEvicted { agent: evicted });
        }

        let mut belief_slot = self.beliefs.find(agent);
        if belief_slot.is_none() {
            belief_slot = self.beliefs.register(agent);
            if let Some(slot) = belief_slot {
                let remembered = self.memory.recall(agent);
                if let Some(snap) = remembered {
                    self.beliefs.restore(slot, snap.trust, snap.kindness);
                }
                debug!(%agent, slot, restored = remembered.is_some(), "agent registered");
                self.telemetry.record(TelemetryEvent::AgentRegistered {
                    agent,
                    restored: remembered.is_some(),
                });
            }
        }

        let features = Features::derive(obs, &self.pose);
        let slot = registration.slot;
        self.free_energy.set_observations(
            slot,
            features.distance,
            features.closing_speed,
            features.trajectory_angle,
            features.gaze_alignment,
            features.speed,
        );

        let Some(belief_slot) = belief_slot else {
            warn!(%agent, "no belief slot available, skipping agent this tick");
            return;
        };
        let erraticness = self.free_energy.prediction_error(slot, Channel::Behavior);
        self.beliefs.revise(
            belief_slot,
            features.distance,
            features.closing_speed,
            features.gaze_alignment,
            erraticness,
        );
        self.revised[belief_slot] = true;
    }

    fn depart(&mut self, agent: AgentId) {
        let had_beliefs = self.forget_beliefs(agent);
        let had_slot = self.free_energy.unregister(agent).is_some();
        if had_beliefs || had_slot {
            debug!(%agent, "agent departed");
            self.telemetry.record(TelemetryEvent::AgentDeparted { agent });
        }
    }

    /// Releases the agent's belief slot and hands its snapshot to memory.
    fn forget_beliefs(&mut self, agent: AgentId) -> bool {
        match self.beliefs.unregister(agent) {
            Some(snapshot) => {
                self.memory.remember(snapshot);
                true
            }
            None => false,
        }
    }

    /// Async Driver Loop. Runs until `cancel` fires or every sender is gone.
    pub async fn run<A: Actuator>(&mut self, actuator: &mut A, cancel: CancellationToken) {
        info!("Reactor Pipeline Started. Tick: {}ms", self.tick_ms);

        let mut cadence = interval(Duration::from_millis(self.tick_ms));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let nominal = self.tick_ms as f32 / 1000.0;
        let mut clock = TickClock::new();
        let mut pending: Vec<Event> = Vec::with_capacity(self.channel_capacity);

        loop {
            // Driver: Wait for physical time boundary
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {}
            }

            // Driver: Drain Events
            let mut disconnected = false;
            loop {
                match self.receiver.try_recv() {
                    Ok(event) => pending.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }

            // Core: Execute Step
            let dt = clock.lap(nominal);
            let decision = self.tick_step(pending.drain(..), dt);

            // Driver: Execute Side Effects
            if let Some(command) = decision.command {
                actuator.dispatch(command);
            }

            if disconnected {
                info!("Observation source closed");
                break;
            }
        }

        info!(ticks = self.tick.frame, "Reactor Pipeline Stopped");
    }
}
