// High-level motion intents

use std::fmt;
use std::str::FromStr;

use super::kinematics::{MoveKind, WheelPowers, WheelTargets};
use super::power::normalize;
use super::units::UnitsConverter;

/// What the robot is asked to do, created per command and consumed immediately
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionIntent {
    /// Forward (positive) or backward (negative)
    DriveDistance { inches: f64 },
    /// Right (positive) or left (negative)
    StrafeDistance { inches: f64 },
    /// Clockwise (positive) or counter-clockwise (negative)
    RotateAngle { degrees: f64 },
    /// Continuous command, each axis in [-1, 1]
    Velocity { axial: f64, lateral: f64, yaw: f64 },
}

impl MotionIntent {
    /// Per-wheel tick targets, `None` for a velocity intent
    pub fn wheel_targets(&self, units: &UnitsConverter) -> Option<WheelTargets> {
        let (kind, ticks) = match *self {
            MotionIntent::DriveDistance { inches } => (MoveKind::Drive, units.to_ticks(inches)),
            MotionIntent::StrafeDistance { inches } => {
                (MoveKind::Strafe, units.strafe_ticks(inches))
            }
            MotionIntent::RotateAngle { degrees } => (MoveKind::Turn, units.turn_ticks(degrees)),
            MotionIntent::Velocity { .. } => return None,
        };
        Some(WheelTargets::for_move(kind, ticks))
    }

    /// Normalized wheel powers, `None` for a discrete move
    pub fn wheel_powers(&self) -> Option<WheelPowers> {
        match *self {
            MotionIntent::Velocity {
                axial,
                lateral,
                yaw,
            } => Some(normalize(WheelPowers::mix(axial, lateral, yaw))),
            _ => None,
        }
    }
}

impl fmt::Display for MotionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionIntent::DriveDistance { inches } => write!(f, "drive {} in", inches),
            MotionIntent::StrafeDistance { inches } => write!(f, "strafe {} in", inches),
            MotionIntent::RotateAngle { degrees } => write!(f, "turn {} deg", degrees),
            MotionIntent::Velocity {
                axial,
                lateral,
                yaw,
            } => write!(
                f,
                "velocity (axial {:.2}, lateral {:.2}, yaw {:.2})",
                axial, lateral, yaw
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseIntentError {
    #[error("Expected <drive|strafe|turn>:<amount>, got '{0}'")]
    Format(String),

    #[error("Unknown move '{0}', expected drive, strafe or turn")]
    UnknownMove(String),

    #[error("Invalid amount '{0}'")]
    Amount(String),
}

/// Parses discrete steps such as `drive:10`, `strafe:-5` or `turn:90`
impl FromStr for MotionIntent {
    type Err = ParseIntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, amount) = s
            .split_once(':')
            .ok_or_else(|| ParseIntentError::Format(s.to_string()))?;
        let value: f64 = amount
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| ParseIntentError::Amount(amount.to_string()))?;

        match kind.trim().to_ascii_lowercase().as_str() {
            "drive" => Ok(MotionIntent::DriveDistance { inches: value }),
            "strafe" => Ok(MotionIntent::StrafeDistance { inches: value }),
            "turn" => Ok(MotionIntent::RotateAngle { degrees: value }),
            other => Err(ParseIntentError::UnknownMove(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        assert_eq!(
            "drive:10".parse::<MotionIntent>().unwrap(),
            MotionIntent::DriveDistance { inches: 10.0 }
        );
        assert_eq!(
            "strafe:-5.5".parse::<MotionIntent>().unwrap(),
            MotionIntent::StrafeDistance { inches: -5.5 }
        );
        assert_eq!(
            "Turn: 90".parse::<MotionIntent>().unwrap(),
            MotionIntent::RotateAngle { degrees: 90.0 }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "drive10".parse::<MotionIntent>(),
            Err(ParseIntentError::Format(_))
        ));
        assert!(matches!(
            "hop:3".parse::<MotionIntent>(),
            Err(ParseIntentError::UnknownMove(_))
        ));
        assert!(matches!(
            "drive:far".parse::<MotionIntent>(),
            Err(ParseIntentError::Amount(_))
        ));
        assert!(matches!(
            "drive:inf".parse::<MotionIntent>(),
            Err(ParseIntentError::Amount(_))
        ));
    }

    #[test]
    fn test_discrete_targets() {
        let units = UnitsConverter::default();
        let drive = MotionIntent::DriveDistance { inches: 10.0 }
            .wheel_targets(&units)
            .unwrap();
        assert_eq!(drive.as_array(), [-418, 418, -418, 418]);

        let turn = MotionIntent::RotateAngle { degrees: -90.0 }
            .wheel_targets(&units)
            .unwrap();
        assert_eq!(turn.as_array(), [720, -720, -720, 720]);

        assert!(MotionIntent::DriveDistance { inches: 1.0 }
            .wheel_powers()
            .is_none());
    }

    #[test]
    fn test_velocity_powers_normalized() {
        let intent = MotionIntent::Velocity {
            axial: 1.0,
            lateral: 1.0,
            yaw: 0.0,
        };
        assert!(intent.wheel_targets(&UnitsConverter::default()).is_none());

        let powers = intent.wheel_powers().unwrap();
        assert_eq!(powers.as_array(), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_huge_step_saturates_instead_of_overflowing() {
        let units = UnitsConverter::default();
        let back: MotionIntent = "turn:-1e12".parse().unwrap();
        let forth: MotionIntent = "turn:1e12".parse().unwrap();

        let back = back.wheel_targets(&units).unwrap().as_array();
        let forth = forth.wheel_targets(&units).unwrap().as_array();
        assert_eq!(back, forth.map(|t| -t));
        assert_eq!(forth, [-i32::MAX, i32::MAX, i32::MAX, -i32::MAX]);
    }
}
