// Loop timing, topics, drive limits and module geometry
use std::f64::consts::PI;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drive::kinematics::ModuleOffset;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_AXES: &str = "swerve/cmd/axes"; // joystick axes
pub const TOPIC_HEADING: &str = "swerve/state/heading"; // gyro heading
pub const TOPIC_RT_MODULES: &str = "swerve/rt/modules"; // module actuation
pub const TOPIC_HEALTH: &str = "swerve/state/health"; // health status

// Operator input
pub const DEADBAND: f64 = 0.05;

// Teleop limits
pub const TELE_MAX_SPEED_MPS: f64 = 4.0;
pub const TELE_MAX_ANGULAR_SPEED_RADPS: f64 = 2.0 * PI;
pub const TELE_MAX_ACCEL_UNITS_PER_SEC: f64 = 3.0;
pub const TELE_MAX_ANGULAR_ACCEL_UNITS_PER_SEC: f64 = 3.0;

// Physical limit of a single drive module
pub const MAX_MODULE_SPEED_MPS: f64 = 5.0;

/// Half of the wheelbase / track width (m), modules sit on a square
const HALF_BASE: f64 = 0.3;

/// Module offsets from the rotation center: front-left, front-right, back-left, back-right
pub const MODULE_OFFSETS: [ModuleOffset; 4] = [
    ModuleOffset::new(HALF_BASE, HALF_BASE),
    ModuleOffset::new(HALF_BASE, -HALF_BASE),
    ModuleOffset::new(-HALF_BASE, HALF_BASE),
    ModuleOffset::new(-HALF_BASE, -HALF_BASE),
];

/// What a module's angle becomes when its commanded speed is exactly zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ZeroSpeedAnglePolicy {
    /// Keep the last angle commanded to that module
    #[default]
    HoldLast,
    /// Snap to 0 rad
    Zero,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("deadband must be finite and non-negative, got {0}")]
    Deadband(f64),

    #[error("{name} must be finite and positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("module geometry is empty")]
    NoModules,

    #[error("module {index} offset is not finite")]
    ModuleOffset { index: usize },
}

/// Everything the drive command needs, fixed at construction
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub deadband: f64,
    pub max_accel: f64,
    pub max_angular_accel: f64,
    pub max_speed: f64,
    pub max_angular_speed: f64,
    pub max_module_speed: f64,
    pub modules: Vec<ModuleOffset>,
    pub zero_speed_policy: ZeroSpeedAnglePolicy,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            deadband: DEADBAND,
            max_accel: TELE_MAX_ACCEL_UNITS_PER_SEC,
            max_angular_accel: TELE_MAX_ANGULAR_ACCEL_UNITS_PER_SEC,
            max_speed: TELE_MAX_SPEED_MPS,
            max_angular_speed: TELE_MAX_ANGULAR_SPEED_RADPS,
            max_module_speed: MAX_MODULE_SPEED_MPS,
            modules: MODULE_OFFSETS.to_vec(),
            zero_speed_policy: ZeroSpeedAnglePolicy::default(),
        }
    }
}

impl DriveConfig {
    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.deadband.is_finite() || self.deadband < 0.0 {
            return Err(ConfigError::Deadband(self.deadband));
        }

        let limits = [
            ("max_accel", self.max_accel),
            ("max_angular_accel", self.max_angular_accel),
            ("max_speed", self.max_speed),
            ("max_angular_speed", self.max_angular_speed),
            ("max_module_speed", self.max_module_speed),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if self.modules.is_empty() {
            return Err(ConfigError::NoModules);
        }
        if let Some(index) = self
            .modules
            .iter()
            .position(|m| !m.x.is_finite() || !m.y.is_finite())
        {
            return Err(ConfigError::ModuleOffset { index });
        }

        Ok(())
    }
}
