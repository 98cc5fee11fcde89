// Calibration, timeouts, topics, wheel configuration
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::hal::{Direction, Wheel};

// Zenoh topics
pub const TOPIC_CMD_GAMEPAD: &str = "mecanum/cmd/gamepad"; // operator input
pub const TOPIC_RT_WHEEL: &str = "mecanum/rt/wheel"; // per-wheel commands, suffixed by wheel name
pub const TOPIC_STATE_WHEEL: &str = "mecanum/state/wheel"; // per-wheel feedback, suffixed by wheel name
pub const TOPIC_TELEMETRY: &str = "mecanum/state/telemetry"; // operator-facing telemetry
pub const TOPIC_HEALTH: &str = "mecanum/state/health"; // health status

/// Command topic for a single wheel, e.g. `mecanum/rt/wheel/front_left_drive`
pub fn wheel_command_topic(wheel: Wheel) -> String {
    format!("{}/{}", TOPIC_RT_WHEEL, wheel.hardware_name())
}

/// Feedback topic for a single wheel
pub fn wheel_feedback_topic(wheel: Wheel) -> String {
    format!("{}/{}", TOPIC_STATE_WHEEL, wheel.hardware_name())
}

/// Error types for loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {value}")]
    Invalid { field: &'static str, value: f64 },
}

/// Drivetrain calibration constants.
///
/// Defaults are for a goBILDA chassis with 312 RPM motors and 104mm mecanum wheels.
/// The strafe and turn factors are empirical and must be tuned on the actual robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Encoder ticks per output shaft revolution
    pub ticks_per_revolution: f64,
    /// Wheel diameter in inches
    pub wheel_diameter_in: f64,
    /// Extra ticks needed when strafing, mecanum rollers slip sideways (start at 1.1)
    pub strafe_correction: f64,
    /// Ticks per wheel for one degree of in-place rotation
    pub turn_ticks_per_degree: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            ticks_per_revolution: 537.7,
            wheel_diameter_in: 4.0945,
            strafe_correction: 1.1,
            turn_ticks_per_degree: 8.0,
        }
    }
}

impl Calibration {
    pub fn ticks_per_inch(&self) -> f64 {
        self.ticks_per_revolution / (self.wheel_diameter_in * std::f64::consts::PI)
    }

    /// Reject values that would make tick conversion meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("ticks_per_revolution", self.ticks_per_revolution),
            ("wheel_diameter_in", self.wheel_diameter_in),
            ("strafe_correction", self.strafe_correction),
            ("turn_ticks_per_degree", self.turn_ticks_per_degree),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid { field, value });
            }
        }
        Ok(())
    }
}

/// Full runtime configuration, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub calibration: Calibration,
    /// Power applied to every wheel during a discrete move
    pub drive_power: f64,
    /// Give up on a discrete move after this long
    pub move_timeout_secs: f64,
    /// Control loop frequency
    pub loop_hz: u64,
    /// Gamepad watchdog: neutral sticks after this long without input
    pub gamepad_timeout_ms: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            calibration: Calibration::default(),
            drive_power: 0.1,
            move_timeout_secs: 2.0,
            loop_hz: 50,
            gamepad_timeout_ms: 250,
        }
    }
}

impl DriveConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading drive config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: DriveConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calibration.validate()?;
        if !(self.drive_power > 0.0 && self.drive_power <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "drive_power",
                value: self.drive_power,
            });
        }
        if !self.move_timeout_secs.is_finite() || self.move_timeout_secs <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "move_timeout_secs",
                value: self.move_timeout_secs,
            });
        }
        if self.loop_hz == 0 {
            return Err(ConfigError::Invalid {
                field: "loop_hz",
                value: 0.0,
            });
        }
        Ok(())
    }

    pub fn loop_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.loop_hz)
    }

    pub fn gamepad_timeout(&self) -> Duration {
        Duration::from_millis(self.gamepad_timeout_ms)
    }
}

/// Motor polarity for the four wheels, in [`Wheel::ALL`] order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDirections(pub [Direction; 4]);

impl WheelDirections {
    /// Discrete moves run on raw motor polarity; the sign tables carry direction
    pub fn autonomous() -> Self {
        Self([Direction::Forward; 4])
    }

    /// Left side reversed so positive power drives every wheel forward.
    /// Flip any wheel that runs backward when the left stick is pushed forward.
    pub fn teleop() -> Self {
        Self([
            Direction::Reverse, // front left
            Direction::Forward, // front right
            Direction::Reverse, // back left
            Direction::Forward, // back right
        ])
    }

    pub fn get(&self, wheel: Wheel) -> Direction {
        self.0[wheel.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ticks_per_inch() {
        let ticks = Calibration::default().ticks_per_inch();
        assert!(
            (ticks - 41.8).abs() < 0.1,
            "goBILDA 312 RPM chassis should be ~41.8 ticks/inch, got {}",
            ticks
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DriveConfig::from_json(r#"{"drive_power": 0.3}"#).unwrap();
        assert_eq!(config.drive_power, 0.3);
        assert_eq!(config.calibration, Calibration::default());
        assert_eq!(config.move_timeout_secs, 2.0);
    }

    #[test]
    fn test_nested_calibration_override() {
        let config =
            DriveConfig::from_json(r#"{"calibration": {"strafe_correction": 1.25}}"#).unwrap();
        assert_eq!(config.calibration.strafe_correction, 1.25);
        assert_eq!(config.calibration.ticks_per_revolution, 537.7);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = DriveConfig::from_json(r#"{"calibration": {"wheel_diameter_in": 0.0}}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "wheel_diameter_in",
                ..
            }
        ));

        let err = DriveConfig::from_json(r#"{"drive_power": 1.5}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "drive_power",
                ..
            }
        ));

        assert!(matches!(
            DriveConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_loop_period() {
        let config = DriveConfig::default();
        assert_eq!(config.loop_period(), Duration::from_millis(20));
    }

    #[test]
    fn test_teleop_directions_reverse_left_side() {
        let dirs = WheelDirections::teleop();
        assert_eq!(dirs.get(Wheel::FrontLeft), Direction::Reverse);
        assert_eq!(dirs.get(Wheel::BackLeft), Direction::Reverse);
        assert_eq!(dirs.get(Wheel::FrontRight), Direction::Forward);
        assert_eq!(dirs.get(Wheel::BackRight), Direction::Forward);
    }
}
