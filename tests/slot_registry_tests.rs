use sentinel::kernel::slots::{AgentId, SlotRegistry, MAX_SLOTS};

#[test]
fn test_allocate_reuses_existing_slot() {
    let mut registry = SlotRegistry::new();
    let a = AgentId::new();
    let b = AgentId::new();

    assert_eq!(registry.allocate(a), Some(0));
    assert_eq!(registry.allocate(b), Some(1));
    // Same agent again: same slot, no new entry.
    assert_eq!(registry.allocate(a), Some(0));
    assert_eq!(registry.active_count(), 2);
    assert_eq!(registry.agent_at(1), Some(b));
}

#[test]
fn test_capacity_is_fixed() {
    let mut registry = SlotRegistry::new();
    for _ in 0..MAX_SLOTS {
        assert!(registry.allocate(AgentId::new()).is_some());
    }
    assert!(registry.is_full());
    assert_eq!(registry.allocate(AgentId::new()), None, "17th agent must not fit");
    assert_eq!(registry.active_count(), MAX_SLOTS);
}

#[test]
fn test_release_frees_lowest_slot_for_reuse() {
    let mut registry = SlotRegistry::new();
    let agents: Vec<AgentId> = (0..4).map(|_| AgentId::new()).collect();
    for a in &agents {
        registry.allocate(*a);
    }

    assert_eq!(registry.release(agents[1]), Some(1));
    assert!(!registry.is_active(1));
    assert_eq!(registry.find(agents[1]), None);

    let newcomer = AgentId::new();
    assert_eq!(registry.allocate(newcomer), Some(1));
    assert_eq!(registry.release_slot(99), None);
}

#[test]
fn test_evicts_lowest_score() {
    let mut registry = SlotRegistry::new();
    let agents: Vec<AgentId> = (0..MAX_SLOTS).map(|_| AgentId::new()).collect();
    for a in &agents {
        registry.allocate(*a);
    }

    let newcomer = AgentId::new();
    let (slot, evicted) = registry.allocate_or_evict(newcomer, |s| if s == 7 { 0.1 } else { 5.0 });

    assert_eq!(slot, 7);
    assert_eq!(evicted, Some(agents[7]));
    assert_eq!(registry.find(newcomer), Some(7));
    assert_eq!(registry.active_count(), MAX_SLOTS);
}

#[test]
fn test_eviction_ties_go_to_oldest() {
    let mut registry = SlotRegistry::new();
    let agents: Vec<AgentId> = (0..MAX_SLOTS).map(|_| AgentId::new()).collect();
    for a in &agents {
        registry.allocate(*a);
    }
    // Slot 0 re-registered last, so slot 1 now holds the oldest entry.
    registry.release(agents[0]);
    let late = AgentId::new();
    registry.allocate(late);

    let (slot, evicted) = registry.allocate_or_evict(AgentId::new(), |_| 1.0);
    assert_eq!(slot, 1);
    assert_eq!(evicted, Some(agents[1]));
}

#[test]
fn test_non_finite_scores_are_never_preferred() {
    let mut registry = SlotRegistry::new();
    for _ in 0..MAX_SLOTS {
        registry.allocate(AgentId::new());
    }
    let (slot, evicted) = registry.allocate_or_evict(AgentId::new(), |s| {
        if s == 3 {
            2.0
        } else {
            f32::NAN
        }
    });
    assert_eq!(slot, 3);
    assert!(evicted.is_some());
}

#[test]
fn test_active_slots_in_index_order() {
    let mut registry = SlotRegistry::new();
    let agents: Vec<AgentId> = (0..5).map(|_| AgentId::new()).collect();
    for a in &agents {
        registry.allocate(*a);
    }
    registry.release(agents[2]);

    let slots: Vec<usize> = registry.active_slots().map(|(s, _)| s).collect();
    assert_eq!(slots, vec![0, 1, 3, 4]);
}
