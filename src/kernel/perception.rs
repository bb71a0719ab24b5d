//! Raw observations and the features both engines consume.
//!
//! How a position, velocity or gaze vector is obtained is the host's
//! business. This module only turns them into scalars relative to the NPC.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use super::slots::AgentId;

const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector, or `None` for (near) zero or non-finite vectors.
    pub fn normalized(self) -> Option<Vec3> {
        let len = self.length();
        if !len.is_finite() || len < EPSILON {
            return None;
        }
        Some(Vec3::new(self.x / len, self.y / len, self.z / len))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One agent as reported by the observation source for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub agent: AgentId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Where the agent is looking.
    pub gaze: Vec3,
}

/// The NPC's own placement, owned by the actuation layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SelfPose {
    pub position: Vec3,
    pub forward: Vec3,
}

/// Scalars derived from one observation relative to the NPC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub distance: f32,
    /// Positive when the agent is closing in.
    pub closing_speed: f32,
    /// Angle in `[0, π]` between the agent's motion and the line to the NPC.
    pub trajectory_angle: f32,
    /// Cosine between the agent's gaze and the line to the NPC.
    pub gaze_alignment: f32,
    pub speed: f32,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            distance: 0.0,
            closing_speed: 0.0,
            trajectory_angle: PI,
            gaze_alignment: 0.0,
            speed: 0.0,
        }
    }
}

impl Features {
    pub fn derive(obs: &Observation, pose: &SelfPose) -> Self {
        let mut out = Features::default();
        if !obs.position.is_finite() || !pose.position.is_finite() {
            return out;
        }

        let to_npc = pose.position.sub(obs.position);
        out.distance = to_npc.length();

        let velocity = if obs.velocity.is_finite() { obs.velocity } else { Vec3::ZERO };
        out.speed = velocity.length();

        // Co-located: no meaningful direction, keep the neutral defaults.
        let Some(dir) = to_npc.normalized() else {
            return out;
        };

        out.closing_speed = velocity.dot(dir);
        if let Some(heading) = velocity.normalized() {
            out.trajectory_angle = heading.dot(dir).clamp(-1.0, 1.0).acos();
        }
        if let Some(look) = obs.gaze.normalized() {
            out.gaze_alignment = look.dot(dir).clamp(-1.0, 1.0);
        }
        out
    }
}
