//! Fixed-capacity association between agents and slot indices.
//!
//! Both engines key their per-agent state by a dense index in `[0, MAX_SLOTS)`.
//! The registry never grows; under pressure the caller chooses who leaves.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_SLOTS: usize = 16;

/// Opaque identifier of an observed agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AgentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct SlotEntry {
    agent: AgentId,
    // Monotone registration order, used for oldest-first tie breaks.
    sequence: u64,
}

#[derive(Debug, Clone)]
pub struct SlotRegistry {
    entries: [Option<SlotEntry>; MAX_SLOTS],
    next_sequence: u64,
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self {
            entries: [None; MAX_SLOTS],
            next_sequence: 0,
        }
    }

    pub fn find(&self, agent: AgentId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(e, Some(entry) if entry.agent == agent))
    }

    /// Returns the agent's existing slot, or the lowest free one.
    /// `None` when the registry is full.
    pub fn allocate(&mut self, agent: AgentId) -> Option<usize> {
        if let Some(slot) = self.find(agent) {
            return Some(slot);
        }
        let slot = self.entries.iter().position(Option::is_none)?;
        self.occupy(slot, agent);
        Some(slot)
    }

    /// Like `allocate`, but when full evicts the active slot with the lowest
    /// `score`. Ties go to the oldest registration, then the lowest index.
    /// Returns the slot and the agent that was evicted, if any.
    pub fn allocate_or_evict<F>(&mut self, agent: AgentId, score: F) -> (usize, Option<AgentId>)
    where
        F: Fn(usize) -> f32,
    {
        if let Some(slot) = self.allocate(agent) {
            return (slot, None);
        }

        let mut victim: Option<(usize, f32, u64)> = None;
        for (slot, entry) in self.entries.iter().enumerate() {
            let Some(entry) = entry else { continue };
            let raw = score(slot);
            let s = if raw.is_finite() { raw } else { f32::MAX };
            let better = match victim {
                None => true,
                Some((_, best, seq)) => s < best || (s == best && entry.sequence < seq),
            };
            if better {
                victim = Some((slot, s, entry.sequence));
            }
        }

        // Full registry always yields a victim.
        let slot = victim.map(|(slot, _, _)| slot).unwrap_or(0);
        let evicted = self.entries[slot].map(|e| e.agent);
        self.occupy(slot, agent);
        (slot, evicted)
    }

    pub fn release(&mut self, agent: AgentId) -> Option<usize> {
        let slot = self.find(agent)?;
        self.entries[slot] = None;
        Some(slot)
    }

    pub fn release_slot(&mut self, slot: usize) -> Option<AgentId> {
        self.entries.get_mut(slot)?.take().map(|e| e.agent)
    }

    pub fn agent_at(&self, slot: usize) -> Option<AgentId> {
        self.entries.get(slot).copied().flatten().map(|e| e.agent)
    }

    pub fn is_active(&self, slot: usize) -> bool {
        matches!(self.entries.get(slot), Some(Some(_)))
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.active_count() == MAX_SLOTS
    }

    /// Active slots in index order.
    pub fn active_slots(&self) -> impl Iterator<Item = (usize, AgentId)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| e.map(|entry| (slot, entry.agent)))
    }

    fn occupy(&mut self, slot: usize, agent: AgentId) {
        self.entries[slot] = Some(SlotEntry {
            agent,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
    }
}
