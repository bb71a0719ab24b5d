use serde::{Deserialize, Serialize};

pub const INTENT_COUNT: usize = 4;

/// Coarse intent categories, in posterior index order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Approach,
    #[default]
    Neutral,
    Threat,
    Friendly,
}

impl Intent {
    pub const ALL: [Intent; INTENT_COUNT] = [
        Intent::Approach,
        Intent::Neutral,
        Intent::Threat,
        Intent::Friendly,
    ];

    pub const fn index(self) -> usize {
        match self {
            Intent::Approach => 0,
            Intent::Neutral => 1,
            Intent::Threat => 2,
            Intent::Friendly => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Probability vector over `Intent::ALL`.
pub type Posterior = [f32; INTENT_COUNT];

/// Everything the belief engine knows about one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentBelief {
    pub posterior: Posterior,
    pub dominant: Intent,
    /// -1.0 (hostile) .. 1.0 (benign)
    pub trust: f32,
    /// Integral of sustained friendly mass. Never negative.
    pub kindness: f32,
    /// Surprise of the latest observation under the previous posterior.
    pub prediction_error: f32,
    pub updates: u64,
}

impl AgentBelief {
    pub fn fresh(prior: Posterior) -> Self {
        Self {
            posterior: prior,
            dominant: argmax(&prior),
            trust: 0.0,
            kindness: 0.0,
            prediction_error: 0.0,
            updates: 0,
        }
    }
}

/// Highest-mass category. Ties go to the lower index.
pub fn argmax(p: &Posterior) -> Intent {
    let mut best = 0;
    for k in 1..INTENT_COUNT {
        if p[k] > p[best] {
            best = k;
        }
    }
    Intent::ALL[best]
}
