// Capability interfaces the drive core consumes
//
// Provides:
// - Actuator, Clock, RunGate, ControllerInput, Telemetry traits
// - DriveMotors: the four wheel actuators of a mecanum base
// - Host implementations: wall clock, stop flag, tracing telemetry,
//   simulated motors and the zenoh wheel bridge

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::messages::GamepadState;

mod host;
pub mod sim;
pub mod zenoh_bridge;

pub use host::{StdClock, StopFlag, TracingTelemetry};
pub use sim::SimulatedMotor;
pub use zenoh_bridge::{GamepadWatchdog, ZenohGamepad, ZenohTelemetry, ZenohWheel};

/// Actuator run modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Stop and clear the position reference to zero
    ResetPosition,
    /// Closed-loop move to the target position
    PositionTracking,
    /// Power is applied as given
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroPowerBehavior {
    /// Hold position when power is 0
    Brake,
    Coast,
}

/// Error types for actuator communication
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("Wheel {wheel} unreachable: {reason}")]
    Link { wheel: Wheel, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to encode wheel command: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A motor with an attached encoder
pub trait Actuator {
    fn set_run_mode(&mut self, mode: RunMode) -> Result<(), ActuatorError>;

    /// Target in ticks, relative to the last position reset
    fn set_target_position(&mut self, ticks: i32) -> Result<(), ActuatorError>;

    /// Power in [-1, 1]
    fn set_power(&mut self, power: f64) -> Result<(), ActuatorError>;

    fn current_position(&mut self) -> Result<i32, ActuatorError>;

    /// True once the encoder has reached the target within the motor's own tolerance
    fn is_arrived(&mut self) -> Result<bool, ActuatorError>;

    fn set_direction(&mut self, direction: Direction) -> Result<(), ActuatorError>;

    fn set_zero_power_behavior(&mut self, behavior: ZeroPowerBehavior)
        -> Result<(), ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_run_mode(&mut self, mode: RunMode) -> Result<(), ActuatorError> {
        (**self).set_run_mode(mode)
    }

    fn set_target_position(&mut self, ticks: i32) -> Result<(), ActuatorError> {
        (**self).set_target_position(ticks)
    }

    fn set_power(&mut self, power: f64) -> Result<(), ActuatorError> {
        (**self).set_power(power)
    }

    fn current_position(&mut self) -> Result<i32, ActuatorError> {
        (**self).current_position()
    }

    fn is_arrived(&mut self) -> Result<bool, ActuatorError> {
        (**self).is_arrived()
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        (**self).set_direction(direction)
    }

    fn set_zero_power_behavior(
        &mut self,
        behavior: ZeroPowerBehavior,
    ) -> Result<(), ActuatorError> {
        (**self).set_zero_power_behavior(behavior)
    }
}

/// Elapsed-time source for timeouts
pub trait Clock {
    fn reset(&mut self);

    fn elapsed_seconds(&self) -> f64;

    /// Wait between two polls of a control loop
    fn pause(&mut self, period: Duration) {
        if !period.is_zero() {
            std::thread::sleep(period);
        }
    }
}

/// Host signal for whether control loops may keep iterating
pub trait RunGate {
    /// False once an external stop has been requested
    fn is_active(&self) -> bool;
}

impl<F: Fn() -> bool> RunGate for F {
    fn is_active(&self) -> bool {
        self()
    }
}

/// Operator gamepad
pub trait ControllerInput {
    /// Latest stick positions
    fn read(&mut self) -> GamepadState;
}

/// Fire-and-forget key/value sink for operator-facing status
pub trait Telemetry {
    fn add_data(&mut self, key: &str, value: &dyn fmt::Display);

    /// Flush everything added since the last update
    fn update(&mut self);
}

impl<T: Telemetry + ?Sized> Telemetry for Box<T> {
    fn add_data(&mut self, key: &str, value: &dyn fmt::Display) {
        (**self).add_data(key, value)
    }

    fn update(&mut self) {
        (**self).update()
    }
}

/// Wheel positions on the chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl Wheel {
    pub const ALL: [Wheel; 4] = [
        Wheel::FrontLeft,
        Wheel::FrontRight,
        Wheel::BackLeft,
        Wheel::BackRight,
    ];

    pub fn index(self) -> usize {
        match self {
            Wheel::FrontLeft => 0,
            Wheel::FrontRight => 1,
            Wheel::BackLeft => 2,
            Wheel::BackRight => 3,
        }
    }

    /// Name used for the wheel in the hardware configuration
    pub fn hardware_name(self) -> &'static str {
        match self {
            Wheel::FrontLeft => "front_left_drive",
            Wheel::FrontRight => "front_right_drive",
            Wheel::BackLeft => "back_left_drive",
            Wheel::BackRight => "back_right_drive",
        }
    }

    /// Short label for telemetry
    pub fn label(self) -> &'static str {
        match self {
            Wheel::FrontLeft => "FL",
            Wheel::FrontRight => "FR",
            Wheel::BackLeft => "BL",
            Wheel::BackRight => "BR",
        }
    }
}

impl fmt::Display for Wheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hardware_name())
    }
}

/// The four drive actuators, indexed by [`Wheel`]
pub struct DriveMotors<A> {
    motors: [A; 4],
}

impl<A: Actuator> DriveMotors<A> {
    pub fn new(front_left: A, front_right: A, back_left: A, back_right: A) -> Self {
        Self {
            motors: [front_left, front_right, back_left, back_right],
        }
    }

    /// Build each wheel's actuator from its position
    pub fn from_fn(make: impl FnMut(Wheel) -> A) -> Self {
        Self {
            motors: Wheel::ALL.map(make),
        }
    }

    pub fn get(&self, wheel: Wheel) -> &A {
        &self.motors[wheel.index()]
    }

    pub fn get_mut(&mut self, wheel: Wheel) -> &mut A {
        &mut self.motors[wheel.index()]
    }

    /// Apply polarity and zero-power behavior to all four wheels
    pub fn configure(
        &mut self,
        directions: [Direction; 4],
        behavior: ZeroPowerBehavior,
    ) -> Result<(), ActuatorError> {
        for (motor, direction) in self.motors.iter_mut().zip(directions) {
            motor.set_direction(direction)?;
            motor.set_zero_power_behavior(behavior)?;
        }
        Ok(())
    }

    pub fn set_run_mode(&mut self, mode: RunMode) -> Result<(), ActuatorError> {
        for motor in &mut self.motors {
            motor.set_run_mode(mode)?;
        }
        Ok(())
    }

    /// Targets in [`Wheel::ALL`] order
    pub fn set_targets(&mut self, ticks: [i32; 4]) -> Result<(), ActuatorError> {
        for (motor, target) in self.motors.iter_mut().zip(ticks) {
            motor.set_target_position(target)?;
        }
        Ok(())
    }

    /// Powers in [`Wheel::ALL`] order
    pub fn set_powers(&mut self, powers: [f64; 4]) -> Result<(), ActuatorError> {
        for (motor, power) in self.motors.iter_mut().zip(powers) {
            motor.set_power(power)?;
        }
        Ok(())
    }

    pub fn positions(&mut self) -> Result<[i32; 4], ActuatorError> {
        let mut positions = [0; 4];
        for (slot, motor) in positions.iter_mut().zip(&mut self.motors) {
            *slot = motor.current_position()?;
        }
        Ok(positions)
    }

    /// Every wheel has reached its target. Each wheel is queried on every call.
    pub fn all_arrived(&mut self) -> Result<bool, ActuatorError> {
        let mut arrived = true;
        for motor in &mut self.motors {
            arrived &= motor.is_arrived()?;
        }
        Ok(arrived)
    }

    /// Command zero power to every wheel, even if some writes fail.
    /// Returns the first failure.
    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        let mut first_err = None;
        for motor in &mut self.motors {
            if let Err(e) = motor.set_power(0.0) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
