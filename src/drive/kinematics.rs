// Swerve inverse kinematics
// Converts a robot-relative chassis velocity into a speed and steering angle per module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::composer::ChassisVelocity;
use crate::config::ZeroSpeedAnglePolicy;

/// Position of a module relative to the robot's rotation center (m)
///
/// `x` forward, `y` left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleOffset {
    pub x: f64,
    pub y: f64,
}

impl ModuleOffset {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Commanded state of one module
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Wheel ground speed (m/s), never negative
    pub speed: f64,
    /// Steering angle (rad, CCW from robot forward)
    pub angle: f64,
}

impl ModuleState {
    pub fn new(speed: f64, angle: f64) -> Self {
        Self { speed, angle }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum KinematicsError {
    #[error("chassis velocity is not finite or overflows a module speed: {0:?}")]
    NonFinite(ChassisVelocity),
}

/// Inverse kinematics for a set of swerve modules
///
/// Keeps the last steering angle of every module so a stopped module does not
/// swing back to 0 rad (see [`ZeroSpeedAnglePolicy`]).
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    modules: Vec<ModuleOffset>,
    max_module_speed: f64,
    policy: ZeroSpeedAnglePolicy,
    held_angles: Vec<f64>,
}

impl SwerveKinematics {
    pub fn new(
        modules: Vec<ModuleOffset>,
        max_module_speed: f64,
        policy: ZeroSpeedAnglePolicy,
    ) -> Self {
        let held_angles = vec![0.0; modules.len()];
        Self {
            modules,
            max_module_speed,
            policy,
            held_angles,
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Module states for `velocity`, in module order
    ///
    /// Speeds are desaturated so none exceeds the module limit.
    pub fn solve(&mut self, velocity: ChassisVelocity) -> Result<Vec<ModuleState>, KinematicsError> {
        if !velocity.is_finite() {
            return Err(KinematicsError::NonFinite(velocity));
        }

        let ChassisVelocity { vx, vy, omega } = velocity;

        // Translation plus the tangential velocity from rotation
        let vectors: Vec<(f64, f64, f64)> = self
            .modules
            .iter()
            .map(|offset| {
                let mvx = vx - omega * offset.y;
                let mvy = vy + omega * offset.x;
                (mvx, mvy, mvx.hypot(mvy))
            })
            .collect();

        // Finite but huge inputs can still overflow a module speed
        if vectors.iter().any(|&(_, _, speed)| !speed.is_finite()) {
            return Err(KinematicsError::NonFinite(velocity));
        }

        let policy = self.policy;
        let mut states: Vec<ModuleState> = vectors
            .into_iter()
            .zip(self.held_angles.iter_mut())
            .map(|((mvx, mvy, speed), held)| {
                let angle = if speed == 0.0 {
                    match policy {
                        ZeroSpeedAnglePolicy::HoldLast => *held,
                        ZeroSpeedAnglePolicy::Zero => 0.0,
                    }
                } else {
                    mvy.atan2(mvx)
                };
                *held = angle;

                ModuleState::new(speed, angle)
            })
            .collect();

        desaturate(&mut states, self.max_module_speed);
        Ok(states)
    }

    /// Zero speed on every module, steering held where it was
    pub fn stopped_states(&self) -> Vec<ModuleState> {
        self.held_angles
            .iter()
            .map(|&angle| ModuleState::new(0.0, angle))
            .collect()
    }
}

/// Scale all speeds by the same factor if any exceeds `max_speed`
///
/// Relative speeds and every angle are preserved.
pub fn desaturate(states: &mut [ModuleState], max_speed: f64) {
    let fastest = states.iter().map(|s| s.speed).fold(0.0f64, f64::max);

    if fastest > max_speed {
        let scale = max_speed / fastest;
        for state in states.iter_mut() {
            state.speed *= scale;
        }
    }
}
