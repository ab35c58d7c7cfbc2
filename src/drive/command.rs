// Teleop drive command
//
// One cycle: sample sticks -> deadband -> slew limit -> compose -> swerve kinematics -> modules.
// The command owns its three limiters and the solver; inputs and outputs are collaborators
// wired in at construction.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::composer::compose;
use super::deadband::apply_deadband;
use super::kinematics::{KinematicsError, ModuleState, SwerveKinematics};
use super::rate_limiter::RateLimiter;
use crate::config::{ConfigError, DriveConfig};

/// Raw stick readings for one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSample {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub field_relative: bool,
}

impl AxisSample {
    pub fn new(x: f64, y: f64, rotation: f64, field_relative: bool) -> Self {
        Self {
            x,
            y,
            rotation,
            field_relative,
        }
    }
}

/// Source of stick axes and the field-relative flag
pub trait AxisSource {
    fn sample(&mut self) -> AxisSample;
}

impl<F> AxisSource for F
where
    F: FnMut() -> AxisSample,
{
    fn sample(&mut self) -> AxisSample {
        self()
    }
}

/// Source of the robot's field heading (rad, CCW positive)
pub trait HeadingSource {
    fn heading(&self) -> f64;
}

impl HeadingSource for f64 {
    fn heading(&self) -> f64 {
        *self
    }
}

/// Receiver of module commands
pub trait ModuleSink {
    /// Apply one state per module, in module order
    fn set_module_states(&mut self, states: &[ModuleState]);

    /// Command zero speed to every module
    ///
    /// `held` is one zero-speed state per module carrying the steering angle to keep.
    fn stop(&mut self, held: &[ModuleState]);
}

#[derive(Debug, Error, PartialEq)]
pub enum DriveError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("non-finite {input} input: {value}")]
    InvalidInput { input: &'static str, value: f64 },

    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
}

pub type Result<T> = std::result::Result<T, DriveError>;

/// Joystick teleop command for a swerve base
pub struct DriveCommand<A, H, S> {
    config: DriveConfig,
    axes: A,
    heading: H,
    sink: S,
    x_limiter: RateLimiter,
    y_limiter: RateLimiter,
    turn_limiter: RateLimiter,
    kinematics: SwerveKinematics,
}

impl<A, H, S> DriveCommand<A, H, S>
where
    A: AxisSource,
    H: HeadingSource,
    S: ModuleSink,
{
    /// Create the command, refusing configurations it cannot run with
    pub fn new(config: DriveConfig, axes: A, heading: H, sink: S) -> Result<Self> {
        config.validate()?;

        let now = Instant::now();
        let kinematics = SwerveKinematics::new(
            config.modules.clone(),
            config.max_module_speed,
            config.zero_speed_policy,
        );
        info!(
            "Drive command configured: {} modules, {} m/s, {:.2} rad/s, angle policy {:?}",
            kinematics.module_count(),
            config.max_speed,
            config.max_angular_speed,
            config.zero_speed_policy
        );

        Ok(Self {
            x_limiter: RateLimiter::new(config.max_accel, now)?,
            y_limiter: RateLimiter::new(config.max_accel, now)?,
            turn_limiter: RateLimiter::new(config.max_angular_accel, now)?,
            kinematics,
            config,
            axes,
            heading,
            sink,
        })
    }

    /// Start (or restart) the command: limiters ramp from rest
    ///
    /// `now` is the instant the first cycle's `dt` is measured from, so it should
    /// precede that cycle (typically the previous tick).
    pub fn initialize(&mut self, now: Instant) {
        debug!("Drive command initialized");
        self.x_limiter.reset(0.0, now);
        self.y_limiter.reset(0.0, now);
        self.turn_limiter.reset(0.0, now);
    }

    /// Run one control cycle now
    pub fn execute(&mut self) -> Result<()> {
        self.execute_at(Instant::now())
    }

    /// Run one control cycle at `now`
    ///
    /// Non-finite inputs reject the whole cycle: no limiter moves and nothing is sent to the modules.
    pub fn execute_at(&mut self, now: Instant) -> Result<()> {
        let sample = self.axes.sample();
        check_finite("x axis", sample.x)?;
        check_finite("y axis", sample.y)?;
        check_finite("rotation axis", sample.rotation)?;

        let heading = if sample.field_relative {
            let heading = self.heading.heading();
            check_finite("heading", heading)?;
            heading
        } else {
            0.0
        };

        let deadband = self.config.deadband;
        let x = self.x_limiter.compute(apply_deadband(sample.x, deadband), now);
        let y = self.y_limiter.compute(apply_deadband(sample.y, deadband), now);
        let rot = self
            .turn_limiter
            .compute(apply_deadband(sample.rotation, deadband), now);

        let velocity = compose(
            x,
            y,
            rot,
            sample.field_relative,
            heading,
            self.config.max_speed,
            self.config.max_angular_speed,
        );
        let states = self.kinematics.solve(velocity)?;

        debug!(
            "Cycle: sample={:?} chassis={:?} modules={:?}",
            sample, velocity, states
        );
        self.sink.set_module_states(&states);
        Ok(())
    }

    /// End the command, stopping every module
    pub fn end(&mut self, interrupted: bool) {
        if interrupted {
            warn!("Drive command interrupted, stopping modules");
        } else {
            info!("Drive command ended, stopping modules");
        }
        self.stop();
    }

    /// Zero speed on every module at the angles last commanded
    pub fn stop(&mut self) {
        let held = self.kinematics.stopped_states();
        self.sink.stop(&held);
    }

    pub fn axes_mut(&mut self) -> &mut A {
        &mut self.axes
    }

    pub fn heading_mut(&mut self) -> &mut H {
        &mut self.heading
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

fn check_finite(input: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DriveError::InvalidInput { input, value })
    }
}
