use std::collections::VecDeque;

use super::event::TelemetryEvent;
use crate::kernel::decision::BehaviorState;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub transition_stats: TransitionStats,
    pub agent_stats: AgentStats,
    pub focus_changes: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionStats {
    pub total: u64,
    pub into_silence: u64,
    pub into_observe: u64,
    pub into_approach: u64,
    pub into_retreat: u64,
    pub avg_ticks_between: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentStats {
    pub registered: u64,
    pub restored: u64,
    pub evicted: u64,
    pub departed: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    let mut first_tick: Option<u64> = None;
    let mut last_tick: Option<u64> = None;

    for event in events {
        match event {
            TelemetryEvent::StateTransition { to, tick, .. } => {
                snap.transition_stats.total += 1;
                match to {
                    BehaviorState::Silence => snap.transition_stats.into_silence += 1,
                    BehaviorState::Observe => snap.transition_stats.into_observe += 1,
                    BehaviorState::Approach => snap.transition_stats.into_approach += 1,
                    BehaviorState::Retreat => snap.transition_stats.into_retreat += 1,
                }
                first_tick.get_or_insert(tick.frame);
                last_tick = Some(tick.frame);
            }
            TelemetryEvent::FocusChanged { .. } => snap.focus_changes += 1,
            TelemetryEvent::AgentRegistered { restored, .. } => {
                snap.agent_stats.registered += 1;
                if *restored {
                    snap.agent_stats.restored += 1;
                }
            }
            TelemetryEvent::AgentEvicted { .. } => snap.agent_stats.evicted += 1,
            TelemetryEvent::AgentDeparted { .. } => snap.agent_stats.departed += 1,
        }
    }

    // Mean spacing between consecutive transitions
    if let (Some(first), Some(last)) = (first_tick, last_tick) {
        if snap.transition_stats.total > 1 {
            snap.transition_stats.avg_ticks_between =
                (last - first) as f64 / (snap.transition_stats.total - 1) as f64;
        }
    }

    snap
}
