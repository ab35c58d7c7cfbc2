// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::drive::{AxisSample, ModuleState};

// Command from teleop -> runtime
// Stick axes are normalized to [-1, 1]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisCommand {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    #[serde(default)]
    pub field_relative: bool,
}

impl From<&AxisCommand> for AxisSample {
    fn from(cmd: &AxisCommand) -> Self {
        AxisSample::new(cmd.x, cmd.y, cmd.rotation, cmd.field_relative)
    }
}

// Heading from the pose estimator -> runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeadingReport {
    pub heading_rad: f64,
}

/// Setpoint for a single swerve module
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct ModuleCommand {
    pub speed_mps: f64,
    pub angle_rad: f64,
}

impl From<&ModuleState> for ModuleCommand {
    fn from(state: &ModuleState) -> Self {
        Self {
            speed_mps: state.speed,
            angle_rad: state.angle,
        }
    }
}

// Actuation output from runtime -> module controllers, one entry per module in geometry order
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModuleActuation {
    pub modules: Vec<ModuleCommand>,
}

impl From<&[ModuleState]> for ModuleActuation {
    fn from(states: &[ModuleState]) -> Self {
        Self {
            modules: states.iter().map(ModuleCommand::from).collect(),
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    InvalidInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_relative_defaults_to_false() {
        let cmd: AxisCommand = serde_json::from_str(r#"{"x":0.5,"y":-0.1,"rotation":0.0}"#).unwrap();
        let sample = AxisSample::from(&cmd);
        assert_eq!(sample, AxisSample::new(0.5, -0.1, 0.0, false));
    }

    #[test]
    fn test_health_wire_names() {
        assert_eq!(serde_json::to_string(&RuntimeHealth::CmdStale).unwrap(), r#""cmd_stale""#);
        assert_eq!(
            serde_json::to_string(&RuntimeHealth::InvalidInput).unwrap(),
            r#""invalid_input""#
        );
    }

    #[test]
    fn test_actuation_keeps_module_order() {
        let states = [ModuleState::new(1.0, 0.5), ModuleState::new(2.0, -0.5)];
        let actuation = ModuleActuation::from(&states[..]);
        let json = serde_json::to_string(&actuation).unwrap();
        assert_eq!(
            json,
            r#"{"modules":[{"speed_mps":1.0,"angle_rad":0.5},{"speed_mps":2.0,"angle_rad":-0.5}]}"#
        );
    }
}
