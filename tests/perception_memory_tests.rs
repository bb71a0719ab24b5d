use std::f32::consts::{FRAC_PI_2, PI};

use sentinel::kernel::belief::Intent;
use sentinel::kernel::decision::BehaviorState;
use sentinel::kernel::memory::{AgentMemory, AgentSnapshot, InMemoryAgentMemory};
use sentinel::kernel::perception::{Features, Observation, SelfPose, Vec3};
use sentinel::kernel::slots::AgentId;
use sentinel::kernel::telemetry::{TelemetryEvent, TelemetryRecorder};
use sentinel::kernel::time::{sanitize_dt, Tick, TickClock};

fn pose() -> SelfPose {
    SelfPose {
        position: Vec3::new(1.0, 0.0, 1.0),
        forward: Vec3::new(1.0, 0.0, 0.0),
    }
}

fn observation(position: Vec3, velocity: Vec3, gaze: Vec3) -> Observation {
    Observation {
        agent: AgentId::new(),
        position,
        velocity,
        gaze,
    }
}

#[test]
fn test_head_on_approach_features() {
    let obs = observation(
        Vec3::new(5.0, 0.0, 1.0),
        Vec3::new(-2.0, 0.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
    );
    let f = Features::derive(&obs, &pose());

    assert!((f.distance - 4.0).abs() < 1e-6);
    assert!((f.closing_speed - 2.0).abs() < 1e-6);
    assert!(f.trajectory_angle.abs() < 1e-3);
    assert!((f.gaze_alignment - 1.0).abs() < 1e-6);
    assert!((f.speed - 2.0).abs() < 1e-6);
}

#[test]
fn test_crossing_and_receding_features() {
    let crossing = observation(
        Vec3::new(5.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 1.5),
        Vec3::new(1.0, 0.0, 0.0),
    );
    let f = Features::derive(&crossing, &pose());
    assert!(f.closing_speed.abs() < 1e-6);
    assert!((f.trajectory_angle - FRAC_PI_2).abs() < 1e-4);
    assert!((f.gaze_alignment + 1.0).abs() < 1e-6, "looking away");

    let receding = observation(
        Vec3::new(5.0, 0.0, 1.0),
        Vec3::new(3.0, 0.0, 0.0),
        Vec3::ZERO,
    );
    let f = Features::derive(&receding, &pose());
    assert!((f.closing_speed + 3.0).abs() < 1e-6);
    assert!((f.trajectory_angle - PI).abs() < 1e-3);
    assert_eq!(f.gaze_alignment, 0.0, "no gaze reads as indifferent");
}

#[test]
fn test_degenerate_observations_fall_back_to_neutral() {
    let colocated = observation(
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
    );
    let f = Features::derive(&colocated, &pose());
    assert_eq!(f.distance, 0.0);
    assert_eq!(f.closing_speed, 0.0);
    assert_eq!(f.trajectory_angle, PI);
    assert_eq!(f.speed, 1.0);

    let broken = observation(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ZERO, Vec3::ZERO);
    assert_eq!(Features::derive(&broken, &pose()), Features::default());

    let wild = observation(
        Vec3::new(5.0, 0.0, 1.0),
        Vec3::new(f32::INFINITY, 0.0, 0.0),
        Vec3::ZERO,
    );
    let f = Features::derive(&wild, &pose());
    assert_eq!(f.speed, 0.0);
    assert_eq!(f.closing_speed, 0.0);
}

#[test]
fn test_memory_persists_as_json() {
    let mut memory = InMemoryAgentMemory::new();
    let friend = AgentId::new();
    let foe = AgentId::new();
    memory.remember(AgentSnapshot {
        agent: friend,
        trust: 0.8,
        kindness: 12.0,
        dominant: Intent::Friendly,
    });
    memory.remember(AgentSnapshot {
        agent: foe,
        trust: -0.9,
        kindness: 0.0,
        dominant: Intent::Threat,
    });
    // Later snapshots replace earlier ones.
    memory.remember(AgentSnapshot {
        agent: friend,
        trust: 0.85,
        kindness: 13.0,
        dominant: Intent::Friendly,
    });
    assert_eq!(memory.len(), 2);

    let json = memory.to_json().unwrap();
    let restored = InMemoryAgentMemory::from_json(&json).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(restored.recall(friend).map(|s| s.trust), Some(0.85));
    assert_eq!(restored.recall(foe).map(|s| s.dominant), Some(Intent::Threat));
    assert_eq!(restored.recall(AgentId::new()), None);
}

#[test]
fn test_bounded_memory_forgets_the_indifferent() {
    let snapshot = |agent, trust, kindness| AgentSnapshot {
        agent,
        trust,
        kindness,
        dominant: Intent::Neutral,
    };
    let mut memory = InMemoryAgentMemory::with_capacity(2);
    let friend = AgentId::new();
    let stranger = AgentId::new();
    let foe = AgentId::new();

    memory.remember(snapshot(friend, 0.7, 4.0));
    memory.remember(snapshot(stranger, 0.05, 0.0));
    // Updating a known agent never evicts.
    memory.remember(snapshot(friend, 0.75, 5.0));
    assert_eq!(memory.len(), 2);

    memory.remember(snapshot(foe, -0.9, 0.0));
    assert_eq!(memory.len(), 2);
    assert_eq!(memory.recall(stranger), None);
    assert_eq!(memory.recall(friend).map(|s| s.trust), Some(0.75));
    assert!(memory.recall(foe).is_some());

    for _ in 0..100 {
        memory.remember(snapshot(AgentId::new(), 0.0, 0.0));
    }
    assert_eq!(memory.len(), 2);
    assert_eq!(memory.capacity(), Some(2));
    assert_eq!(InMemoryAgentMemory::new().capacity(), None);
}

#[test]
fn test_telemetry_snapshot_counts() {
    let mut recorder = TelemetryRecorder::new();
    let agent = AgentId::new();

    recorder.record(TelemetryEvent::AgentRegistered { agent, restored: false });
    recorder.record(TelemetryEvent::StateTransition {
        from: BehaviorState::Silence,
        to: BehaviorState::Observe,
        tick: Tick { frame: 2 },
    });
    recorder.record(TelemetryEvent::StateTransition {
        from: BehaviorState::Observe,
        to: BehaviorState::Retreat,
        tick: Tick { frame: 10 },
    });
    recorder.record(TelemetryEvent::FocusChanged { from: None, to: Some(agent) });
    recorder.record(TelemetryEvent::AgentDeparted { agent });

    let snap = recorder.snapshot();
    assert_eq!(snap.transition_stats.total, 2);
    assert_eq!(snap.transition_stats.into_observe, 1);
    assert_eq!(snap.transition_stats.into_retreat, 1);
    assert_eq!(snap.transition_stats.avg_ticks_between, 8.0);
    assert_eq!(snap.agent_stats.registered, 1);
    assert_eq!(snap.agent_stats.departed, 1);
    assert_eq!(snap.focus_changes, 1);

    recorder.clear();
    assert!(recorder.is_empty());
}

#[test]
fn test_telemetry_buffer_is_bounded() {
    let mut recorder = TelemetryRecorder::new();
    for _ in 0..5_000 {
        recorder.record(TelemetryEvent::AgentEvicted { agent: AgentId::new() });
    }
    assert_eq!(recorder.len(), recorder.capacity());
    assert_eq!(recorder.dropped(), 5_000 - 4_096);

    let mut small = TelemetryRecorder::with_capacity(2);
    let last = AgentId::new();
    small.record(TelemetryEvent::AgentDeparted { agent: AgentId::new() });
    small.record(TelemetryEvent::AgentDeparted { agent: AgentId::new() });
    small.record(TelemetryEvent::AgentDeparted { agent: last });
    assert_eq!(small.len(), 2);
    assert_eq!(small.events().last(), Some(&TelemetryEvent::AgentDeparted { agent: last }));
}

#[test]
fn test_clock_and_dt_sanitizing() {
    let mut clock = TickClock::new();
    assert_eq!(clock.lap(0.1), 0.1, "first lap reports the nominal step");
    assert!(clock.lap(0.1) >= 0.0);

    assert_eq!(sanitize_dt(f32::NAN), 0.0);
    assert_eq!(sanitize_dt(-1.0), 0.0);
    assert_eq!(sanitize_dt(0.25), 0.25);
    assert_eq!(Tick::new().next().next().frame, 2);
}
