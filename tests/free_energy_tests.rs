use std::f32::consts::PI;

use sentinel::kernel::config::FreeEnergyConfig;
use sentinel::kernel::free_energy::{
    complexity_cost, free_energy_at, modulate_precision, Channel, FreeEnergyEngine, CHANNEL_COUNT,
};
use sentinel::kernel::slots::{AgentId, MAX_SLOTS};

const DT: f32 = 0.1;

fn engine() -> FreeEnergyEngine {
    FreeEnergyEngine::new(FreeEnergyConfig::default())
}

/// Distance, closing speed, trajectory angle, gaze, speed.
type Sample = (f32, f32, f32, f32, f32);

const CALM: Sample = (3.0, 0.0, PI, 0.0, 1.0);
const CHARGING: Sample = (1.2, 4.0, 0.0, 1.0, 4.0);

fn observe(engine: &mut FreeEnergyEngine, slot: usize, s: Sample) {
    engine.set_observations(slot, s.0, s.1, s.2, s.3, s.4);
}

#[test]
fn test_calm_agent_has_zero_free_energy() {
    let mut fe = engine();
    let slot = fe.register(AgentId::new()).slot;
    observe(&mut fe, slot, CALM);
    fe.compute_all(0.0, DT);

    assert_eq!(fe.prediction_errors(slot), [0.0; CHANNEL_COUNT]);
    assert_eq!(fe.free_energy(slot), 0.0);
    assert_eq!(fe.aggregate(), 0.0);
}

#[test]
fn test_channel_semantics() {
    let mut fe = engine();
    let slot = fe.register(AgentId::new()).slot;
    observe(&mut fe, slot, CHARGING);

    assert!((fe.prediction_error(slot, Channel::Distance) - 0.6).abs() < 1e-5);
    assert!((fe.prediction_error(slot, Channel::Velocity) - 3.0).abs() < 1e-5);
    assert!((fe.prediction_error(slot, Channel::Angle) - 1.0).abs() < 1e-5);
    assert!((fe.prediction_error(slot, Channel::Gaze) - 1.0).abs() < 1e-5);
    assert_eq!(fe.prediction_error(slot, Channel::Behavior), 0.0, "single sample has no spread");
    assert_eq!(
        fe.prediction_error_at(slot, Channel::Velocity.index()),
        fe.prediction_error(slot, Channel::Velocity)
    );
    assert_eq!(fe.prediction_error_at(slot, CHANNEL_COUNT), 0.0);

    // Receding, looking away, moving off at an angle: nothing to predict.
    observe(&mut fe, slot, (3.0, -2.0, 2.0, -0.7, 2.0));
    assert_eq!(fe.prediction_error(slot, Channel::Velocity), 0.0);
    assert_eq!(fe.prediction_error(slot, Channel::Angle), 0.0);
    assert_eq!(fe.prediction_error(slot, Channel::Gaze), 0.0);

    let expected = 0.36 + 9.0 + 1.0 + 1.0 - 0.5;
    let mut fresh = engine();
    let s = fresh.register(AgentId::new()).slot;
    observe(&mut fresh, s, CHARGING);
    fresh.compute_all(0.0, DT);
    assert!((fresh.free_energy(s) - expected).abs() < 1e-3, "F = {}", fresh.free_energy(s));
}

#[test]
fn test_behavior_channel_tracks_speed_spread() {
    let mut fe = engine();
    let slot = fe.register(AgentId::new()).slot;

    for i in 0..8 {
        let speed = if i % 2 == 0 { 0.0 } else { 2.0 };
        observe(&mut fe, slot, (3.0, 0.0, PI, 0.0, speed));
    }
    let erratic = fe.prediction_error(slot, Channel::Behavior);
    assert!((erratic - 1.0).abs() < 1e-5, "spread {erratic}");

    // The window only holds the last eight samples.
    for _ in 0..8 {
        observe(&mut fe, slot, (3.0, 0.0, PI, 0.0, 1.0));
    }
    assert_eq!(fe.prediction_error(slot, Channel::Behavior), 0.0);

    // Non-finite speeds never enter the window.
    observe(&mut fe, slot, (3.0, 0.0, PI, 0.0, f32::NAN));
    assert_eq!(fe.prediction_error(slot, Channel::Behavior), 0.0);
}

#[test]
fn test_free_energy_never_negative() {
    let cfg = FreeEnergyConfig::default();
    let mut fe = engine();
    let slot = fe.register(AgentId::new()).slot;

    let distances = [0.0, 0.5, 3.0, 20.0, f32::INFINITY, f32::NAN];
    let speeds = [-10.0, 0.0, 1.0, 50.0, f32::NAN];
    let angles = [0.0, 0.4, PI, -1.0];
    let gazes = [-1.0, 0.0, 1.0, 7.0];
    let trusts = [-1.0, -0.5, 0.0, 0.5, 1.0, 3.0, f32::NAN];

    for d in distances {
        for v in speeds {
            for a in angles {
                for g in gazes {
                    observe(&mut fe, slot, (d, v, a, g, v.abs()));
                    for t in trusts {
                        fe.compute_all(t, DT);
                        let f = fe.free_energy(slot);
                        assert!(
                            f.is_finite() && f >= 0.0,
                            "F = {f} at d={d} v={v} a={a} g={g} t={t}"
                        );
                        assert!(fe.trend().is_finite());
                        let n = fe.normalized();
                        assert!((0.0..=1.0).contains(&n));

                        let errors = fe.prediction_errors(slot);
                        assert!(free_energy_at(&errors, t, &cfg) >= 0.0);
                    }
                }
            }
        }
    }
}

#[test]
fn test_trust_discounts_the_same_observation() {
    let cfg = FreeEnergyConfig::default();
    let vectors = [
        [0.6, 3.0, 1.0, 1.0, 0.0],
        [0.3, 0.0, 0.0, 1.0, 0.0],
        [1.0, 1.0, 1.0, 1.0, 1.0],
        [2.0, 0.0, 0.5, 0.2, 0.3],
        [0.0, 0.0, 0.0, 0.9, 0.0],
    ];
    for errors in vectors {
        let distrusted = free_energy_at(&errors, 0.0, &cfg);
        let trusted = free_energy_at(&errors, 0.9, &cfg);
        assert!(
            trusted <= distrusted + 1e-6,
            "trusted {trusted} > neutral {distrusted} for {errors:?}"
        );
    }

    let head_on = [0.6, 3.0, 1.0, 1.0, 0.0];
    assert!(free_energy_at(&head_on, 0.9, &cfg) < free_energy_at(&head_on, 0.0, &cfg));
}

#[test]
fn test_precision_modulation() {
    let cfg = FreeEnergyConfig::default();

    let neutral = modulate_precision(0.0, &cfg);
    assert_eq!(neutral, [1.0; CHANNEL_COUNT]);

    let trusted = modulate_precision(0.9, &cfg);
    assert!((trusted[Channel::Distance.index()] - 0.55).abs() < 1e-6);
    assert!((trusted[Channel::Angle.index()] - 0.55).abs() < 1e-6);
    assert!((trusted[Channel::Gaze.index()] - 1.45).abs() < 1e-6);
    assert_eq!(trusted[Channel::Velocity.index()], 1.0);
    assert_eq!(trusted[Channel::Behavior.index()], 1.0);

    let hostile = modulate_precision(-1.0, &cfg);
    assert_eq!(hostile[Channel::Velocity.index()], 2.0);
    assert_eq!(hostile[Channel::Behavior.index()], 2.0);
    assert_eq!(hostile[Channel::Gaze.index()], 0.5);

    for p in modulate_precision(f32::NAN, &cfg) {
        assert!((cfg.precision_min..=cfg.precision_max).contains(&p));
    }

    assert_eq!(complexity_cost(0.0, &cfg), 0.5);
    assert!((complexity_cost(0.9, &cfg) - 1.4).abs() < 1e-6);
    assert_eq!(complexity_cost(-1.0, &cfg), 0.5, "distrust does not lower tolerance");
}

#[test]
fn test_seventeenth_agent_evicts_lowest_free_energy() {
    let mut fe = engine();
    let agents: Vec<AgentId> = (0..MAX_SLOTS).map(|_| AgentId::new()).collect();
    for (i, agent) in agents.iter().enumerate() {
        let reg = fe.register(*agent);
        assert_eq!(reg.slot, i);
        assert_eq!(reg.evicted, None);
        let sample = if i == 5 { CALM } else { (12.0, 0.0, PI, 0.0, 1.0) };
        observe(&mut fe, reg.slot, sample);
    }
    fe.compute_all(0.0, DT);
    assert_eq!(fe.free_energy(5), 0.0);
    assert!(fe.free_energy(4) > 0.0);

    let newcomer = AgentId::new();
    let reg = fe.register(newcomer);

    assert_eq!(reg.slot, 5);
    assert_eq!(reg.evicted, Some(agents[5]));
    assert_eq!(fe.active_count(), MAX_SLOTS);
    assert_eq!(fe.find(newcomer), Some(5));
    assert_eq!(fe.find(agents[5]), None);
    // Fresh slot carries nothing over from the evicted agent.
    assert_eq!(fe.prediction_errors(5), [0.0; CHANNEL_COUNT]);
}

#[test]
fn test_unregister_clears_slot() {
    let mut fe = engine();
    let agent = AgentId::new();
    let slot = fe.register(agent).slot;
    observe(&mut fe, slot, CHARGING);
    fe.compute_all(0.0, DT);
    assert!(fe.free_energy(slot) > 0.0);

    assert_eq!(fe.unregister(agent), Some(slot));
    assert_eq!(fe.unregister(agent), None);
    assert_eq!(fe.free_energy(slot), 0.0);

    fe.compute_all(0.0, DT);
    assert_eq!(fe.aggregate(), 0.0);
    assert_eq!(fe.highest_slot(), None);
}

#[test]
fn test_trend_and_peak_follow_aggregate() {
    let mut fe = engine();
    let slot = fe.register(AgentId::new()).slot;

    observe(&mut fe, slot, CHARGING);
    fe.compute_all(0.0, DT);
    let high = fe.aggregate();
    assert!(fe.trend() > 0.0, "rising free energy must show a positive trend");
    assert_eq!(fe.peak(), high);
    assert!((fe.normalized() - 1.0).abs() < 1e-6);

    // Same speed as before so the behavior channel stays quiet.
    observe(&mut fe, slot, (3.0, 0.0, PI, 0.0, 4.0));
    fe.compute_all(0.0, DT);
    assert_eq!(fe.aggregate(), 0.0);
    assert!(fe.trend() < 0.0);
    let decayed = fe.peak();
    assert!(decayed < high && decayed > 0.9 * high, "peak {decayed}");
    assert_eq!(fe.normalized(), 0.0);

    // Zero dt holds the trend instead of blowing it up.
    let held = fe.trend();
    fe.compute_all(0.0, 0.0);
    assert_eq!(fe.trend(), held);
}

#[test]
fn test_same_instant_tick_defers_trend() {
    let mut fe = engine();
    let slot = fe.register(AgentId::new()).slot;
    observe(&mut fe, slot, CHARGING);

    fe.compute_all(0.0, 0.0);
    let f = fe.aggregate();
    assert!(f > 10.0);
    assert_eq!(fe.trend(), 0.0, "no elapsed time, no rate");
    assert_eq!(fe.peak(), f);

    // The rise shows up on the next measured step, scaled by its dt only.
    fe.compute_all(0.0, DT);
    let expected = 0.2 * f / DT;
    assert!((fe.trend() - expected).abs() < 1e-3, "trend {} vs {expected}", fe.trend());
    assert!(fe.trend() < 100.0);
}

#[test]
fn test_highest_slot_ties_go_to_lower_index() {
    let mut fe = engine();
    let a = fe.register(AgentId::new()).slot;
    let b = fe.register(AgentId::new()).slot;
    observe(&mut fe, a, CHARGING);
    observe(&mut fe, b, CHARGING);
    fe.compute_all(0.0, DT);
    assert_eq!(fe.highest_slot(), Some(a));

    observe(&mut fe, a, CALM);
    fe.compute_all(0.0, DT);
    assert_eq!(fe.highest_slot(), Some(b));
}
