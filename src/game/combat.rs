//! Combat rules - hitboxes and health

use serde::{Deserialize, Serialize};

use super::constants::{HITBOX_HEIGHT, HITBOX_WIDTH};
use super::trajectory::Point;

/// Defender collision rectangle, centered on the defender's position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Hitbox {
    /// Standard hitbox around a player position
    pub fn around(position: Point) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: HITBOX_WIDTH,
            height: HITBOX_HEIGHT,
        }
    }

    pub fn left(&self) -> f32 {
        self.x - self.width / 2.0
    }

    pub fn top(&self) -> f32 {
        self.y - self.height / 2.0
    }

    /// Inclusive point-in-rectangle test
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.left() + self.width
            && point.y >= self.top()
            && point.y <= self.top() + self.height
    }
}

/// Outcome of a resolved shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotOutcome {
    Hit,
    Miss,
}

impl ShotOutcome {
    pub fn from_hit(hit: bool) -> Self {
        if hit {
            Self::Hit
        } else {
            Self::Miss
        }
    }
}

/// Combat system for health bookkeeping
pub struct CombatSystem;

impl CombatSystem {
    /// Damage from one confirmed hit
    pub const HIT_DAMAGE: u32 = 1;

    /// Apply one hit, returns (new_health, is_dead)
    pub fn apply_hit(current_health: u32) -> (u32, bool) {
        let new_health = current_health.saturating_sub(Self::HIT_DAMAGE);
        (new_health, new_health == 0)
    }
}
