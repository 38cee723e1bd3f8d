//! Fixed duel parameters
//!
//! These are design constants of the duel, not runtime configuration.

use std::time::Duration;

/// Downward acceleration applied to every shot
pub const GRAVITY: f32 = 0.16;
/// Divisor turning aim power into horizontal/vertical speed
pub const VELOCITY_SCALE: f32 = 10.0;
/// Stands in for cos(angle) when |cos| is smaller, when solving for impact time
pub const MIN_COS: f32 = 1e-4;

/// Shots weaker than this are rejected at commit
pub const MIN_SHOT_VELOCITY: f32 = 5.0;
/// Drag distance that maps to 100% power
pub const MAX_DRAG_DISTANCE: f32 = 150.0;

/// Preview sampling: t = 0, 2, 4, ... < 120
pub const PREVIEW_STEP: f32 = 2.0;
pub const PREVIEW_DURATION: f32 = 120.0;

/// Shots leave the barrel this far above the player's position
pub const LAUNCH_HEIGHT_OFFSET: f32 = 20.0;

pub const MAX_HEALTH: u32 = 3;
pub const HITBOX_WIDTH: f32 = 50.0;
pub const HITBOX_HEIGHT: f32 = 80.0;

/// Board extents. Projectiles outside them end the animation.
pub const BOARD_WIDTH: f32 = 800.0;
pub const BOARD_HEIGHT: f32 = 600.0;
/// Shots may arc this far above the top edge before counting as gone
pub const BOARD_CEILING: f32 = -100.0;

/// One animation frame; flight time advances by one unit per frame
pub const ANIMATION_FRAME: Duration = Duration::from_millis(16);
/// Pause between the shot outcome and the next turn
pub const TURN_TRANSITION_DELAY: Duration = Duration::from_millis(1000);

/// Spawn layout: (name, x, y, min_x, max_x)
pub const PLAYER_LAYOUT: [(&str, f32, f32, f32, f32); 2] = [
    ("Player 1", 150.0, 535.0, 50.0, 350.0),
    ("Player 2", 650.0, 535.0, 450.0, 750.0),
];
