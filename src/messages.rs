// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::hal::{Direction, RunMode, ZeroPowerBehavior};

// Operator input from gamepad/keyboard -> runtime
// Stick axes are in [-1, 1]; pushing a stick forward gives negative y
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GamepadState {
    pub left_stick_x: f64,
    pub left_stick_y: f64,
    pub right_stick_x: f64,
    pub right_stick_y: f64,
}

impl GamepadState {
    /// Sticks released
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Clamp every axis into [-1, 1], NaN becomes 0
    pub fn clamped(self) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
        Self {
            left_stick_x: clamp(self.left_stick_x),
            left_stick_y: clamp(self.left_stick_y),
            right_stick_x: clamp(self.right_stick_x),
            right_stick_y: clamp(self.right_stick_y),
        }
    }
}

// Command for one wheel, runtime -> wheel hardware
// seq increases per wheel so feedback can be matched to the command it reflects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelCommand {
    pub seq: u64,
    #[serde(flatten)]
    pub op: WheelOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WheelOp {
    RunMode { mode: RunMode },
    Target { ticks: i32 },
    Power { power: f64 },
    Direction { direction: Direction },
    ZeroPower { behavior: ZeroPowerBehavior },
}

// Feedback from one wheel, wheel hardware -> runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct WheelFeedback {
    /// Highest command seq applied when this sample was taken
    pub ack: u64,
    pub position: i32,
    pub busy: bool,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}
