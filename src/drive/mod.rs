// Teleop drive pipeline for a swerve base
//
// Provides:
// - Input conditioning (deadband, slew rate limiting)
// - Robot/field-relative chassis velocity composition
// - Swerve inverse kinematics (chassis velocity -> module states)
// - The drive command tying the stages to its collaborators

pub mod command;
pub mod composer;
pub mod deadband;
pub mod kinematics;
pub mod rate_limiter;

pub use command::{AxisSample, AxisSource, DriveCommand, DriveError, HeadingSource, ModuleSink};
pub use composer::{ChassisVelocity, compose};
pub use deadband::apply_deadband;
pub use kinematics::{KinematicsError, ModuleOffset, ModuleState, SwerveKinematics, desaturate};
pub use rate_limiter::RateLimiter;
