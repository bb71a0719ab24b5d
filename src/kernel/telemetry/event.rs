use serde::{Deserialize, Serialize};

use crate::kernel::decision::BehaviorState;
use crate::kernel::slots::AgentId;
use crate::kernel::time::Tick;

// Allowed: IDs, ticks, states, flags
// Forbidden: raw positions, posteriors, per-channel errors

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    StateTransition {
        from: BehaviorState,
        to: BehaviorState,
        tick: Tick,
    },

    FocusChanged {
        from: Option<AgentId>,
        to: Option<AgentId>,
    },

    AgentRegistered {
        agent: AgentId,
        /// Trust and kindness were seeded from memory.
        restored: bool,
    },

    AgentEvicted {
        agent: AgentId,
    },

    AgentDeparted {
        agent: AgentId,
    },
}
