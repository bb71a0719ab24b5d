//! Precision-weighted free energy over five prediction-error channels.
//!
//! ```text
//! F_slot = max(0, Σ_c π_c(trust)·e_c² − cost(trust))
//! cost   = base_cost·(1 + max(0, trust)·trust_bonus)
//! ```
//! Precision is recomputed once per tick from the trust estimate and shared
//! by every slot.

pub mod channels;
pub mod engine;

pub use channels::{
    complexity_cost, free_energy_at, modulate_precision, Channel, ChannelVector, CHANNEL_COUNT,
};
pub use engine::{FreeEnergyEngine, Registration};
