//! Hand-off point for what the NPC remembers about agents that left.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::belief::Intent;
use super::slots::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent: AgentId,
    pub trust: f32,
    pub kindness: f32,
    pub dominant: Intent,
}

/// External store consulted when an agent returns.
pub trait AgentMemory {
    fn remember(&mut self, snapshot: AgentSnapshot);
    fn recall(&self, agent: AgentId) -> Option<AgentSnapshot>;
}

/// HashMap-backed memory. Unbounded unless built with [`Self::with_capacity`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentMemory {
    entries: HashMap<AgentId, AgentSnapshot>,
    capacity: Option<usize>,
}

impl InMemoryAgentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `capacity` agents. A new agent arriving at capacity
    /// displaces the one with the weakest feelings either way (trust closest
    /// to 0, then least kindness).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.max(1)),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut list: Vec<&AgentSnapshot> = self.entries.values().collect();
        list.sort_by_key(|s| s.agent);
        serde_json::to_string_pretty(&list)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let list: Vec<AgentSnapshot> = serde_json::from_str(json)?;
        Ok(Self {
            entries: list.into_iter().map(|s| (s.agent, s)).collect(),
            capacity: None,
        })
    }
}

impl AgentMemory for InMemoryAgentMemory {
    fn remember(&mut self, snapshot: AgentSnapshot) {
        if let Some(capacity) = self.capacity {
            if !self.entries.contains_key(&snapshot.agent) && self.entries.len() >= capacity {
                let forgettable = self
                    .entries
                    .values()
                    .min_by(|a, b| {
                        a.trust
                            .abs()
                            .total_cmp(&b.trust.abs())
                            .then(a.kindness.total_cmp(&b.kindness))
                            .then(a.agent.cmp(&b.agent))
                    })
                    .map(|s| s.agent);
                if let Some(agent) = forgettable {
                    self.entries.remove(&agent);
                    debug!(%agent, capacity, "memory full, forgot agent");
                }
            }
        }
        self.entries.insert(snapshot.agent, snapshot);
    }

    fn recall(&self, agent: AgentId) -> Option<AgentSnapshot> {
        self.entries.get(&agent).copied()
    }
}
