//! Drag-to-aim conversion

use serde::{Deserialize, Serialize};

use super::trajectory::Point;

/// Normalized aim derived from a drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AimVector {
    /// 0..=100
    pub power_percent: f32,
    pub angle_degrees: f32,
}

/// Convert a drag into power and angle.
///
/// The angle is measured on the vector from the player's origin to the
/// pointer. Screen y grows downward while the trajectory treats positive
/// angles as rising, so dragging below the player aims upward.
pub fn compute_aim(origin: Point, pointer: Point, max_drag_distance: f32) -> AimVector {
    let dx = pointer.x - origin.x;
    let dy = pointer.y - origin.y;

    let distance = origin.distance(&pointer).clamp(0.0, max_drag_distance);
    let power_percent = if max_drag_distance > 0.0 {
        distance / max_drag_distance * 100.0
    } else {
        0.0
    };

    AimVector {
        power_percent,
        angle_degrees: dy.atan2(dx).to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_below_and_ahead_aims_45_degrees() {
        let aim = compute_aim(Point::new(150.0, 535.0), Point::new(200.0, 585.0), 150.0);
        assert!((aim.angle_degrees - 45.0).abs() < 1e-4);
        let expected_power = (50.0f32 * 50.0 * 2.0).sqrt() / 150.0 * 100.0;
        assert!((aim.power_percent - expected_power).abs() < 1e-3);
    }

    #[test]
    fn test_power_clamped_to_max_drag() {
        let aim = compute_aim(Point::new(0.0, 0.0), Point::new(1000.0, 0.0), 150.0);
        assert_eq!(aim.power_percent, 100.0);
        assert_eq!(aim.angle_degrees, 0.0);
    }

    #[test]
    fn test_zero_drag_is_zero_power() {
        let p = Point::new(42.0, 7.0);
        assert_eq!(compute_aim(p, p, 150.0).power_percent, 0.0);
    }

    #[test]
    fn test_deterministic() {
        let a = compute_aim(Point::new(650.0, 535.0), Point::new(712.3, 590.1), 150.0);
        let b = compute_aim(Point::new(650.0, 535.0), Point::new(712.3, 590.1), 150.0);
        assert_eq!(a, b);
    }
}
