use serde::{Deserialize, Serialize};
use tracing::info;

use super::slots::AgentId;

/// What the kernel asks the actuation layer to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActuationCommand {
    Stop,
    Face { agent: AgentId },
    /// Move toward the agent, never closer than `standoff`.
    Approach { agent: AgentId, standoff: f32 },
    /// Move away from the agent, at most `max_distance`.
    Retreat { agent: AgentId, max_distance: f32 },
}

/// Outbound seam to locomotion and animation.
pub trait Actuator {
    fn stop(&mut self);
    fn face(&mut self, agent: AgentId);
    fn approach(&mut self, agent: AgentId, standoff: f32);
    fn retreat(&mut self, agent: AgentId, max_distance: f32);

    fn dispatch(&mut self, command: ActuationCommand) {
        match command {
            ActuationCommand::Stop => self.stop(),
            ActuationCommand::Face { agent } => self.face(agent),
            ActuationCommand::Approach { agent, standoff } => self.approach(agent, standoff),
            ActuationCommand::Retreat { agent, max_distance } => self.retreat(agent, max_distance),
        }
    }
}

/// Actuator that only logs. Used by the demo driver.
#[derive(Debug, Default)]
pub struct LogActuator {
    pub issued: u64,
}

impl Actuator for LogActuator {
    fn stop(&mut self) {
        self.issued += 1;
        info!("[ACT] stop");
    }

    fn face(&mut self, agent: AgentId) {
        self.issued += 1;
        info!(%agent, "[ACT] face");
    }

    fn approach(&mut self, agent: AgentId, standoff: f32) {
        self.issued += 1;
        info!(%agent, standoff, "[ACT] approach");
    }

    fn retreat(&mut self, agent: AgentId, max_distance: f32) {
        self.issued += 1;
        info!(%agent, max_distance, "[ACT] retreat");
    }
}
