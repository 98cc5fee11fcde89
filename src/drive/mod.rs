// Drive control for a four-wheel mecanum base
//
// Provides:
// - Distance/angle to encoder tick conversion
// - Mecanum kinematics (discrete sign tables and continuous mixing)
// - Wheel power normalization
// - Move supervisor: closed-loop discrete moves with timeout
// - Teleoperation loop: gamepad -> wheel powers

pub mod intent;
pub mod kinematics;
pub mod power;
pub mod supervisor;
pub mod teleop;
pub mod units;

pub use intent::{MotionIntent, ParseIntentError};
pub use kinematics::{MoveKind, WheelPowers, WheelTargets};
pub use power::normalize;
pub use supervisor::{MoveOutcome, MoveState, MoveSupervisor};
pub use teleop::{TeleopLoop, WheelTest};
pub use units::UnitsConverter;

use crate::hal::ActuatorError;

/// Error types for drive control
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("{0} is not a discrete move")]
    NotDiscrete(MotionIntent),
}
