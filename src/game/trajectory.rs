//! Ballistic trajectory model shared by the aim preview and the shot animation

use serde::{Deserialize, Serialize};

use super::constants::{GRAVITY, MIN_COS, PREVIEW_DURATION, PREVIEW_STEP, VELOCITY_SCALE};

/// A position on the board (screen coordinates, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Immutable description of a committed shot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchParameters {
    pub origin_x: f32,
    pub origin_y: f32,
    /// Aim power, 0..=100
    pub velocity: f32,
    pub angle_degrees: f32,
    /// +1 fires rightward, -1 leftward
    pub direction: f32,
}

impl LaunchParameters {
    #[inline]
    fn angle_radians(&self) -> f32 {
        self.angle_degrees.to_radians()
    }
}

/// Predicted projectile position at the defender's x line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactPoint {
    pub x: f32,
    pub y: f32,
    /// Flight time at which the projectile crosses the line
    pub t: f32,
}

/// Closed-form parabola; no state
pub struct TrajectoryModel;

impl TrajectoryModel {
    /// Projectile position at flight time `t`
    pub fn position_at(launch: &LaunchParameters, t: f32) -> Point {
        let angle = launch.angle_radians();
        let travel = t * launch.velocity / VELOCITY_SCALE;

        Point {
            x: launch.origin_x + launch.direction * travel * angle.cos(),
            y: launch.origin_y - (travel * angle.sin() - 0.5 * GRAVITY * t * t),
        }
    }

    /// Solve x(t) = target_x for t and evaluate the height there.
    ///
    /// The impact always lies on the target line. Near-vertical shots have
    /// cos replaced by `+MIN_COS` so the division stays finite.
    pub fn solve_impact_at_x(launch: &LaunchParameters, target_x: f32) -> ImpactPoint {
        let cos = launch.angle_radians().cos();
        let cos = if cos.abs() < MIN_COS { MIN_COS } else { cos };

        let t = (target_x - launch.origin_x) * VELOCITY_SCALE
            / (launch.velocity * launch.direction * cos);
        let y = Self::position_at(launch, t).y;

        ImpactPoint { x: target_x, y, t }
    }

    /// Sample points for the aim preview line
    pub fn preview(launch: &LaunchParameters) -> Vec<Point> {
        let steps = (PREVIEW_DURATION / PREVIEW_STEP).ceil() as usize;
        (0..steps)
            .map(|i| Self::position_at(launch, i as f32 * PREVIEW_STEP))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch(angle_degrees: f32, velocity: f32, direction: f32) -> LaunchParameters {
        LaunchParameters {
            origin_x: 0.0,
            origin_y: 0.0,
            velocity,
            angle_degrees,
            direction,
        }
    }

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn test_position_at_zero_is_origin() {
        let l = LaunchParameters {
            origin_x: 150.0,
            origin_y: 515.0,
            velocity: 73.0,
            angle_degrees: 31.0,
            direction: -1.0,
        };
        assert_eq!(TrajectoryModel::position_at(&l, 0.0), Point::new(150.0, 515.0));
    }

    #[test]
    fn test_position_is_deterministic_and_continuous() {
        let l = launch(60.0, 40.0, 1.0);
        let a = TrajectoryModel::position_at(&l, 17.5);
        let b = TrajectoryModel::position_at(&l, 17.5);
        assert_eq!(a, b);

        let near = TrajectoryModel::position_at(&l, 17.5001);
        assert!(a.distance(&near) < 0.01);
    }

    #[test]
    fn test_direction_mirrors_horizontal_travel() {
        let right = TrajectoryModel::position_at(&launch(30.0, 50.0, 1.0), 10.0);
        let left = TrajectoryModel::position_at(&launch(30.0, 50.0, -1.0), 10.0);
        assert!(approx(right.x, -left.x, 1e-4));
        assert!(approx(right.y, left.y, 1e-4));
    }

    #[test]
    fn test_solve_at_origin_is_degenerate() {
        for velocity in [5.0, 20.0, 100.0] {
            let l = LaunchParameters {
                origin_x: 320.0,
                origin_y: 500.0,
                velocity,
                angle_degrees: 45.0,
                direction: 1.0,
            };
            let impact = TrajectoryModel::solve_impact_at_x(&l, 320.0);
            assert!(approx(impact.x, 320.0, 1e-3));
            assert!(approx(impact.t, 0.0, 1e-4));
        }
    }

    #[test]
    fn test_regression_fixture_45_degrees() {
        // t = 100 * 10 / (50 * cos 45) = 20 * sqrt(2)
        // y = -(t * 5 * sin 45 - 0.08 * t^2) = -(100 - 64)
        let impact = TrajectoryModel::solve_impact_at_x(&launch(45.0, 50.0, 1.0), 100.0);
        assert!(approx(impact.t, 20.0 * 2f32.sqrt(), 1e-3));
        assert!(approx(impact.x, 100.0, 1e-3));
        assert!(approx(impact.y, -36.0, 1e-2));
    }

    #[test]
    fn test_solve_matches_sampled_position() {
        let l = LaunchParameters {
            origin_x: 650.0,
            origin_y: 515.0,
            velocity: 80.0,
            angle_degrees: 50.0,
            direction: -1.0,
        };
        let impact = TrajectoryModel::solve_impact_at_x(&l, 150.0);
        let at = TrajectoryModel::position_at(&l, impact.t);
        assert!(impact.t > 0.0);
        assert!(approx(at.x, 150.0, 1e-2));
        assert!(approx(at.y, impact.y, 1e-4));
    }

    #[test]
    fn test_vertical_shot_stays_finite() {
        let impact = TrajectoryModel::solve_impact_at_x(&launch(90.0, 50.0, 1.0), 400.0);
        assert!(impact.t.is_finite());
        assert!(impact.y.is_finite());
    }

    #[test]
    fn test_near_vertical_impact_stays_on_target_line() {
        for angle_degrees in [89.999, 90.0] {
            let l = LaunchParameters {
                origin_x: 150.0,
                origin_y: 515.0,
                velocity: 50.0,
                angle_degrees,
                direction: 1.0,
            };
            let impact = TrajectoryModel::solve_impact_at_x(&l, 650.0);
            assert_eq!(impact.x, 650.0);
            assert!(impact.t > 0.0, "t = {} at {} degrees", impact.t, angle_degrees);
            assert!(impact.y.is_finite());
        }
    }

    #[test]
    fn test_preview_samples() {
        let l = launch(45.0, 50.0, 1.0);
        let points = TrajectoryModel::preview(&l);
        assert_eq!(points.len(), 60);
        assert_eq!(points[0], Point::new(0.0, 0.0));
        assert_eq!(points[1], TrajectoryModel::position_at(&l, 2.0));
    }
}
