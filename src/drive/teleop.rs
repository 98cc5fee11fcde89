// Teleoperation: gamepad sticks -> normalized wheel powers, every cycle
//
// Left stick: forward/strafe. Right stick: rotate.
// Nothing carries over between cycles; each one depends only on the latest
// gamepad reading. The run gate is checked at the top of every cycle.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::DriveError;
use super::intent::MotionIntent;
use super::kinematics::WheelPowers;
use crate::hal::{
    Actuator, Clock, ControllerInput, DriveMotors, RunGate, RunMode, Telemetry, Wheel,
};
use crate::messages::GamepadState;

/// Velocity intent from the sticks. Pushing the left stick forward gives negative y.
pub fn intent_from_gamepad(pad: &GamepadState) -> MotionIntent {
    MotionIntent::Velocity {
        axial: -pad.left_stick_y,
        lateral: pad.left_stick_x,
        yaw: pad.right_stick_x,
    }
}

/// Normalized wheel powers for a gamepad reading
pub fn powers_from_gamepad(pad: &GamepadState) -> WheelPowers {
    intent_from_gamepad(pad).wheel_powers().unwrap_or_default()
}

pub struct TeleopLoop<A, I, C, G, T> {
    motors: DriveMotors<A>,
    input: I,
    clock: C,
    gate: G,
    telemetry: T,
    period: Duration,
}

impl<A, I, C, G, T> TeleopLoop<A, I, C, G, T>
where
    A: Actuator,
    I: ControllerInput,
    C: Clock,
    G: RunGate,
    T: Telemetry,
{
    pub fn new(motors: DriveMotors<A>, input: I, clock: C, gate: G, telemetry: T) -> Self {
        Self {
            motors,
            input,
            clock,
            gate,
            telemetry,
            period: Duration::ZERO,
        }
    }

    /// Pause between cycles
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn motors(&self) -> &DriveMotors<A> {
        &self.motors
    }

    /// Run cycles until the run gate closes, then stop the wheels.
    /// Returns the number of cycles run.
    pub fn run(&mut self) -> Result<u64, DriveError> {
        info!("Teleop started");
        let result = self.run_cycles();

        let stopped = self.motors.stop();
        let cycles = match result {
            Ok(cycles) => cycles,
            Err(e) => {
                if let Err(stop_err) = stopped {
                    warn!("Failed to stop motors after error: {}", stop_err);
                }
                return Err(e);
            }
        };
        stopped?;
        info!("Teleop stopped after {} cycles", cycles);
        Ok(cycles)
    }

    fn run_cycles(&mut self) -> Result<u64, DriveError> {
        self.motors.set_run_mode(RunMode::Direct)?;
        self.clock.reset();

        let mut cycles = 0;
        while self.gate.is_active() {
            self.step()?;
            cycles += 1;
            self.clock.pause(self.period);
        }
        Ok(cycles)
    }

    /// One cycle: read sticks, mix, normalize, apply, report
    pub fn step(&mut self) -> Result<WheelPowers, DriveError> {
        let pad = self.input.read();
        let powers = powers_from_gamepad(&pad);
        debug!("Wheel powers: {:?}", powers.as_array());
        self.motors.set_powers(powers.as_array())?;

        self.telemetry.add_data(
            "Status",
            &format_args!("Run Time: {:.1}s", self.clock.elapsed_seconds()),
        );
        self.telemetry.add_data(
            "Front left/Right",
            &format_args!("{:4.2}, {:4.2}", powers.front_left, powers.front_right),
        );
        self.telemetry.add_data(
            "Back  left/Right",
            &format_args!("{:4.2}, {:4.2}", powers.back_left, powers.back_right),
        );
        self.telemetry.update();
        Ok(powers)
    }
}

/// Single-wheel wiring check: the left stick drives one wheel directly.
/// Push forward; the wheel should spin forward. If not, flip its direction.
pub struct WheelTest<A, I, C, G, T> {
    wheel: Wheel,
    motor: A,
    input: I,
    clock: C,
    gate: G,
    telemetry: T,
    period: Duration,
}

impl<A, I, C, G, T> WheelTest<A, I, C, G, T>
where
    A: Actuator,
    I: ControllerInput,
    C: Clock,
    G: RunGate,
    T: Telemetry,
{
    pub fn new(wheel: Wheel, motor: A, input: I, clock: C, gate: G, telemetry: T) -> Self {
        Self {
            wheel,
            motor,
            input,
            clock,
            gate,
            telemetry,
            period: Duration::ZERO,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn motor(&self) -> &A {
        &self.motor
    }

    pub fn run(&mut self) -> Result<u64, DriveError> {
        info!("Wheel test on {}", self.wheel);
        let result = self.run_cycles();
        let stopped = self.motor.set_power(0.0);
        let cycles = match result {
            Ok(cycles) => cycles,
            Err(e) => {
                if let Err(stop_err) = stopped {
                    warn!("Failed to stop {} after error: {}", self.wheel, stop_err);
                }
                return Err(e);
            }
        };
        stopped?;
        Ok(cycles)
    }

    fn run_cycles(&mut self) -> Result<u64, DriveError> {
        self.motor.set_run_mode(RunMode::Direct)?;

        let mut cycles = 0;
        while self.gate.is_active() {
            let power = (-self.input.read().left_stick_y).clamp(-1.0, 1.0);
            self.motor.set_power(power)?;
            self.telemetry
                .add_data(&format!("{} Power", self.wheel.label()), &power);
            self.telemetry.update();
            cycles += 1;
            self.clock.pause(self.period);
        }
        Ok(cycles)
    }
}
