// Closed-loop discrete moves with a timeout
//
// A move resets the encoders, writes four relative targets, switches the motors
// to position tracking and applies the configured drive power. It then polls
// until every wheel arrives, the timeout expires, or the host asks to stop.
// All four wheels are commanded to zero power on every exit path.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::DriveError;
use super::intent::MotionIntent;
use super::kinematics::WheelTargets;
use super::units::UnitsConverter;
use crate::config::DriveConfig;
use crate::hal::{
    Actuator, ActuatorError, Clock, DriveMotors, RunGate, RunMode, Telemetry, Wheel,
};

/// How a discrete move ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Every wheel reported arrival before the timeout
    Completed,
    /// At least one wheel was still moving when time ran out
    TimedOut,
    /// The host stopped the op-mode mid-move
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    Idle,
    Resetting,
    Targeting,
    Running,
}

pub struct MoveSupervisor<A, C, G, T> {
    motors: DriveMotors<A>,
    clock: C,
    gate: G,
    telemetry: T,
    units: UnitsConverter,
    drive_power: f64,
    timeout_secs: f64,
    poll_period: Duration,
    state: MoveState,
}

impl<A, C, G, T> MoveSupervisor<A, C, G, T>
where
    A: Actuator,
    C: Clock,
    G: RunGate,
    T: Telemetry,
{
    pub fn new(
        motors: DriveMotors<A>,
        clock: C,
        gate: G,
        telemetry: T,
        config: &DriveConfig,
    ) -> Self {
        Self {
            motors,
            clock,
            gate,
            telemetry,
            units: UnitsConverter::new(config.calibration),
            drive_power: config.drive_power,
            timeout_secs: config.move_timeout_secs,
            poll_period: Duration::ZERO,
            state: MoveState::Idle,
        }
    }

    /// Pause between polls (default: busy-poll)
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    pub fn state(&self) -> MoveState {
        self.state
    }

    pub fn motors(&self) -> &DriveMotors<A> {
        &self.motors
    }

    pub fn telemetry_mut(&mut self) -> &mut T {
        &mut self.telemetry
    }

    /// Drive forward (positive) or backward (negative)
    pub fn drive(&mut self, inches: f64) -> Result<MoveOutcome, DriveError> {
        self.run(MotionIntent::DriveDistance { inches })
    }

    /// Strafe right (positive) or left (negative)
    pub fn strafe(&mut self, inches: f64) -> Result<MoveOutcome, DriveError> {
        self.run(MotionIntent::StrafeDistance { inches })
    }

    /// Turn clockwise (positive) or counter-clockwise (negative)
    pub fn turn(&mut self, degrees: f64) -> Result<MoveOutcome, DriveError> {
        self.run(MotionIntent::RotateAngle { degrees })
    }

    pub fn run(&mut self, intent: MotionIntent) -> Result<MoveOutcome, DriveError> {
        let targets = intent
            .wheel_targets(&self.units)
            .ok_or(DriveError::NotDiscrete(intent))?;
        info!("Move: {} -> targets {:?}", intent, targets.as_array());
        self.execute_move(targets)
    }

    /// Run each step in order regardless of how the previous one ended.
    /// Stops early only when the host stops the op-mode.
    pub fn run_sequence(
        &mut self,
        steps: &[MotionIntent],
    ) -> Result<Vec<MoveOutcome>, DriveError> {
        let mut outcomes = Vec::with_capacity(steps.len());
        for step in steps {
            let outcome = self.run(*step)?;
            outcomes.push(outcome);
            if outcome == MoveOutcome::Cancelled {
                break;
            }
        }
        Ok(outcomes)
    }

    /// Move every wheel to its target (relative to a fresh encoder reset)
    pub fn execute_move(&mut self, targets: WheelTargets) -> Result<MoveOutcome, DriveError> {
        let result = self.run_to_targets(targets);
        self.state = MoveState::Idle;

        // Zero power on every exit path, including errors
        let stopped = self.motors.stop();
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(stop_err) = stopped {
                    warn!("Failed to stop motors after error: {}", stop_err);
                }
                return Err(e.into());
            }
        };
        stopped?;

        let elapsed = self.clock.elapsed_seconds();
        match outcome {
            MoveOutcome::Completed => info!("Move completed in {:.2}s", elapsed),
            MoveOutcome::TimedOut => warn!(
                "Move timed out after {:.2}s, targets {:?}",
                elapsed,
                targets.as_array()
            ),
            MoveOutcome::Cancelled => warn!("Move cancelled after {:.2}s", elapsed),
        }
        Ok(outcome)
    }

    fn run_to_targets(&mut self, targets: WheelTargets) -> Result<MoveOutcome, ActuatorError> {
        self.state = MoveState::Resetting;
        self.motors.set_run_mode(RunMode::ResetPosition)?;

        self.state = MoveState::Targeting;
        self.motors.set_targets(targets.as_array())?;
        self.motors.set_run_mode(RunMode::PositionTracking)?;

        // Direction comes from the target sign, power is the same for every wheel
        self.state = MoveState::Running;
        self.clock.reset();
        self.motors.set_powers([self.drive_power; 4])?;

        loop {
            if !self.gate.is_active() {
                return Ok(MoveOutcome::Cancelled);
            }
            if self.motors.all_arrived()? {
                return Ok(MoveOutcome::Completed);
            }
            if self.clock.elapsed_seconds() >= self.timeout_secs {
                return Ok(MoveOutcome::TimedOut);
            }

            let positions = self.motors.positions()?;
            debug!("Positions: {:?}", positions);
            for (wheel, position) in Wheel::ALL.iter().zip(positions) {
                self.telemetry.add_data(wheel.label(), &position);
            }
            self.telemetry.update();

            self.clock.pause(self.poll_period);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fmt;
    use std::rc::Rc;

    use super::*;
    use crate::hal::{Direction, SimulatedMotor, ZeroPowerBehavior};

    /// Clock that advances a fixed step per pause
    struct StepClock {
        now: f64,
        step: f64,
    }

    impl StepClock {
        fn new(step: f64) -> Self {
            Self { now: 0.0, step }
        }
    }

    impl Clock for StepClock {
        fn reset(&mut self) {
            self.now = 0.0;
        }

        fn elapsed_seconds(&self) -> f64 {
            self.now
        }

        fn pause(&mut self, _period: Duration) {
            self.now += self.step;
        }
    }

    #[derive(Default)]
    struct RecordingTelemetry {
        updates: Vec<Vec<(String, String)>>,
        pending: Vec<(String, String)>,
    }

    impl Telemetry for RecordingTelemetry {
        fn add_data(&mut self, key: &str, value: &dyn fmt::Display) {
            self.pending.push((key.to_string(), value.to_string()));
        }

        fn update(&mut self) {
            self.updates.push(std::mem::take(&mut self.pending));
        }
    }

    /// Motor that arrives after a set number of polls, or never
    #[derive(Debug, Default)]
    struct ScriptedMotor {
        arrive_after: Option<usize>,
        fail_on_poll: bool,
        polls: usize,
        modes: Vec<RunMode>,
        target: i32,
        power: f64,
        powers: Vec<f64>,
    }

    impl ScriptedMotor {
        fn arriving_after(polls: usize) -> Self {
            Self {
                arrive_after: Some(polls),
                ..Self::default()
            }
        }

        fn never_arriving() -> Self {
            Self::default()
        }

        fn failing() -> Self {
            Self {
                fail_on_poll: true,
                ..Self::default()
            }
        }
    }

    impl Actuator for ScriptedMotor {
        fn set_run_mode(&mut self, mode: RunMode) -> Result<(), ActuatorError> {
            self.modes.push(mode);
            Ok(())
        }

        fn set_target_position(&mut self, ticks: i32) -> Result<(), ActuatorError> {
            self.target = ticks;
            Ok(())
        }

        fn set_power(&mut self, power: f64) -> Result<(), ActuatorError> {
            self.power = power;
            self.powers.push(power);
            Ok(())
        }

        fn current_position(&mut self) -> Result<i32, ActuatorError> {
            Ok(self.polls as i32)
        }

        fn is_arrived(&mut self) -> Result<bool, ActuatorError> {
            if self.fail_on_poll {
                return Err(ActuatorError::Transport("link down".to_string()));
            }
            self.polls += 1;
            Ok(self.arrive_after.is_some_and(|n| self.polls >= n))
        }

        fn set_direction(&mut self, _direction: Direction) -> Result<(), ActuatorError> {
            Ok(())
        }

        fn set_zero_power_behavior(
            &mut self,
            _behavior: ZeroPowerBehavior,
        ) -> Result<(), ActuatorError> {
            Ok(())
        }
    }

    fn supervisor<A: Actuator, G: RunGate>(
        motors: DriveMotors<A>,
        gate: G,
    ) -> MoveSupervisor<A, StepClock, G, RecordingTelemetry> {
        MoveSupervisor::new(
            motors,
            StepClock::new(0.1),
            gate,
            RecordingTelemetry::default(),
            &DriveConfig::default(),
        )
    }

    fn assert_all_stopped(motors: &DriveMotors<ScriptedMotor>) {
        for wheel in Wheel::ALL {
            assert_eq!(motors.get(wheel).power, 0.0, "{} still powered", wheel);
        }
    }

    #[test]
    fn test_completes_when_arrived_immediately() {
        let motors = DriveMotors::from_fn(|_| ScriptedMotor::arriving_after(1));
        let mut sup = supervisor(motors, || true);

        let outcome = sup.execute_move(WheelTargets::new(-418, 418, -418, 418)).unwrap();

        assert_eq!(outcome, MoveOutcome::Completed);
        assert_eq!(sup.state(), MoveState::Idle);
        assert_eq!(sup.clock.elapsed_seconds(), 0.0);
        assert_all_stopped(sup.motors());
        assert!(sup.telemetry.updates.is_empty(), "No polling iteration expected");
    }

    #[test]
    fn test_times_out_when_never_arrived() {
        let motors = DriveMotors::from_fn(|_| ScriptedMotor::never_arriving());
        let mut sup = supervisor(motors, || true);

        let outcome = sup.drive(10.0).unwrap();

        assert_eq!(outcome, MoveOutcome::TimedOut);
        assert!(sup.clock.elapsed_seconds() >= 2.0);
        assert!(sup.clock.elapsed_seconds() < 2.2);
        assert_all_stopped(sup.motors());
    }

    #[test]
    fn test_cancelled_by_run_gate() {
        let polls_left = Rc::new(Cell::new(3u32));
        let gate = {
            let polls_left = Rc::clone(&polls_left);
            move || {
                let left = polls_left.get();
                polls_left.set(left.saturating_sub(1));
                left > 0
            }
        };
        let motors = DriveMotors::from_fn(|_| ScriptedMotor::never_arriving());
        let mut sup = supervisor(motors, gate);

        let outcome = sup.strafe(-6.0).unwrap();

        assert_eq!(outcome, MoveOutcome::Cancelled);
        assert_eq!(sup.telemetry.updates.len(), 3);
        assert_all_stopped(sup.motors());
    }

    #[test]
    fn test_stops_motors_on_actuator_error() {
        let motors = DriveMotors::from_fn(|_| ScriptedMotor::failing());
        let mut sup = supervisor(motors, || true);

        let err = sup.turn(90.0).unwrap_err();

        assert!(matches!(err, DriveError::Actuator(ActuatorError::Transport(_))));
        assert_eq!(sup.state(), MoveState::Idle);
        assert_all_stopped(sup.motors());
    }

    #[test]
    fn test_command_sequence() {
        let motors = DriveMotors::from_fn(|_| ScriptedMotor::arriving_after(3));
        let mut sup = supervisor(motors, || true);
        sup.turn(10.0).unwrap();

        let fl = sup.motors().get(Wheel::FrontLeft);
        assert_eq!(fl.modes, vec![RunMode::ResetPosition, RunMode::PositionTracking]);
        assert_eq!(fl.target, -80);
        assert_eq!(fl.powers, vec![0.1, 0.0]);

        // Uniform positive power, direction carried by the target
        let bl = sup.motors().get(Wheel::BackLeft);
        assert_eq!(bl.target, 80);
        assert_eq!(bl.powers, vec![0.1, 0.0]);
    }

    #[test]
    fn test_reports_positions_each_poll() {
        let motors = DriveMotors::from_fn(|_| ScriptedMotor::arriving_after(3));
        let mut sup = supervisor(motors, || true);

        assert_eq!(sup.drive(1.0).unwrap(), MoveOutcome::Completed);

        let updates = &sup.telemetry.updates;
        assert_eq!(updates.len(), 2);
        let keys: Vec<&str> = updates[0].iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["FL", "FR", "BL", "BR"]);
        assert_eq!(updates[1][0].1, "2");
    }

    #[test]
    fn test_rejects_velocity_intent() {
        let motors = DriveMotors::from_fn(|_| ScriptedMotor::arriving_after(1));
        let mut sup = supervisor(motors, || true);
        let err = sup
            .run(MotionIntent::Velocity {
                axial: 1.0,
                lateral: 0.0,
                yaw: 0.0,
            })
            .unwrap_err();
        assert!(matches!(err, DriveError::NotDiscrete(_)));
        assert!(sup.motors().get(Wheel::FrontLeft).modes.is_empty());
    }

    #[test]
    fn test_sequence_continues_after_timeout() {
        let motors = DriveMotors::from_fn(|_| ScriptedMotor::never_arriving());
        let mut sup = supervisor(motors, || true);
        let steps = [
            MotionIntent::DriveDistance { inches: 10.0 },
            MotionIntent::RotateAngle { degrees: 90.0 },
        ];
        let outcomes = sup.run_sequence(&steps).unwrap();
        assert_eq!(outcomes, vec![MoveOutcome::TimedOut, MoveOutcome::TimedOut]);
    }

    #[test]
    fn test_sequence_stops_when_cancelled() {
        let motors = DriveMotors::from_fn(|_| ScriptedMotor::never_arriving());
        let mut sup = supervisor(motors, || false);
        let steps = [
            MotionIntent::DriveDistance { inches: 10.0 },
            MotionIntent::StrafeDistance { inches: 4.0 },
        ];
        let outcomes = sup.run_sequence(&steps).unwrap();
        assert_eq!(outcomes, vec![MoveOutcome::Cancelled]);
        assert_all_stopped(sup.motors());
    }

    #[test]
    fn test_simulated_drive_reaches_target() {
        let motors = DriveMotors::from_fn(|_| SimulatedMotor::with_speed(1000.0));
        let mut sup = supervisor(motors, || true);

        assert_eq!(sup.drive(10.0).unwrap(), MoveOutcome::Completed);

        let positions: Vec<i32> = Wheel::ALL
            .iter()
            .map(|&w| sup.motors().get(w).position())
            .collect();
        assert_eq!(positions, vec![-418, 418, -418, 418]);
        for wheel in Wheel::ALL {
            assert_eq!(sup.motors().get(wheel).power(), 0.0);
        }
    }
}
