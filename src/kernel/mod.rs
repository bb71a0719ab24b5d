//! Perception-to-decision kernel.
//!
//! One decision tick runs, in order: observation ingestion, belief update,
//! free-energy computation, state selection. Every engine owns its state;
//! the reactor is the only place they meet.

pub mod belief;
pub mod config;
pub mod decision;
pub mod free_energy;
pub mod memory;
pub mod perception;
pub mod reactor;
pub mod scheduler;
pub mod slots;
pub mod telemetry;
pub mod time;
