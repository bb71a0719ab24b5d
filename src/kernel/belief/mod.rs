//! Per-agent intent inference.
//!
//! Recursive Bayes over four intents with independent Gaussian feature
//! likelihoods. The previous posterior is the prior for the next update:
//! ```text
//! ln q'(k) = -Σ_f z_f(k)² + ln max(q(k), floor)
//! q(k)     ← (1 - s)·q(k) + s·normalize(q')(k)
//! ```
//! Trust and kindness integrate the result over measured time.

pub mod engine;
pub mod types;

pub use engine::BeliefEngine;
pub use types::{argmax, AgentBelief, Intent, Posterior, INTENT_COUNT};
