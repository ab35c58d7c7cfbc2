// Chassis velocity composition
// Scales conditioned stick values to physical speeds and picks the command frame.

use serde::{Deserialize, Serialize};

/// Planar rigid-body velocity, robot-relative once composed
///
/// `vx` forward (m/s), `vy` left (m/s), `omega` counter-clockwise (rad/s).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChassisVelocity {
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

impl ChassisVelocity {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_finite(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite() && self.omega.is_finite()
    }

    /// Re-express a field-frame velocity in the frame of a robot facing `heading` (rad)
    pub fn from_field_relative(vx: f64, vy: f64, omega: f64, heading: f64) -> Self {
        // Rotate by -heading
        let (sin, cos) = heading.sin_cos();
        Self {
            vx: vx * cos + vy * sin,
            vy: -vx * sin + vy * cos,
            omega,
        }
    }
}

/// Compose the robot-relative chassis velocity for one cycle
///
/// # Arguments
/// * `x`, `y`, `rot` - rate-limited axis values, nominally in [-1, 1]
/// * `field_relative` - interpret `x`/`y` in the field frame
/// * `heading` - robot heading on the field (rad, CCW positive), only used when field-relative
/// * `max_speed` - linear speed (m/s) at full stick
/// * `max_angular_speed` - angular speed (rad/s) at full stick
pub fn compose(
    x: f64,
    y: f64,
    rot: f64,
    field_relative: bool,
    heading: f64,
    max_speed: f64,
    max_angular_speed: f64,
) -> ChassisVelocity {
    let vx = x * max_speed;
    let vy = y * max_speed;
    let omega = rot * max_angular_speed;

    if field_relative {
        ChassisVelocity::from_field_relative(vx, vy, omega, heading)
    } else {
        ChassisVelocity::new(vx, vy, omega)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_robot_relative_is_plain_scaling() {
        let max_angular = 2.0 * PI;
        let v = compose(0.5, -0.25, 0.1, false, 1.234, 4.0, max_angular);
        assert_eq!(v, ChassisVelocity::new(0.5 * 4.0, -0.25 * 4.0, 0.1 * max_angular));
    }

    #[test]
    fn test_field_relative_at_zero_heading_matches_robot_relative() {
        let field = compose(0.7, 0.3, -0.4, true, 0.0, 4.0, 3.0);
        let robot = compose(0.7, 0.3, -0.4, false, 0.0, 4.0, 3.0);
        assert_eq!(field, robot);
    }

    #[test]
    fn test_field_forward_when_facing_left() {
        // Robot turned 90° CCW: field +x is the robot's right side (-y)
        let v = compose(1.0, 0.0, 0.0, true, FRAC_PI_2, 4.0, 3.0);
        assert!(close(v.vx, 0.0), "vx = {}", v.vx);
        assert!(close(v.vy, -4.0), "vy = {}", v.vy);
    }

    #[test]
    fn test_field_relative_keeps_omega_and_magnitude() {
        let v = compose(0.6, 0.8, 0.5, true, 2.1, 4.0, 3.0);
        assert_eq!(v.omega, 1.5);
        assert!(close(v.vx.hypot(v.vy), 4.0));
    }

    #[test]
    fn test_facing_backwards_inverts_translation() {
        let v = compose(0.5, 0.25, 0.0, true, PI, 4.0, 3.0);
        assert!(close(v.vx, -2.0));
        assert!(close(v.vy, -1.0));
    }
}
