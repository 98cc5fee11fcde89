// Simulated drive motor for --sim runs, the wheel bridge demo and tests
//
// The motor moves in discrete control periods. In position-tracking mode each
// is_arrived() poll advances one period, so a supervisor polling loop drives
// the simulation forward on its own. In direct mode call step() explicitly.

use super::{Actuator, ActuatorError, Direction, RunMode, ZeroPowerBehavior};

/// Encoder ticks travelled per control period at full power
/// (312 RPM * 537.7 ticks/rev at 50 Hz)
pub const DEFAULT_TICKS_PER_STEP: f64 = 56.0;

/// Distance from target at which the motor stops reporting busy
pub const DEFAULT_TOLERANCE_TICKS: i32 = 5;

#[derive(Debug, Clone)]
pub struct SimulatedMotor {
    mode: RunMode,
    direction: Direction,
    zero_power: ZeroPowerBehavior,
    position: f64,
    target: i32,
    power: f64,
    ticks_per_step: f64,
    tolerance: i32,
}

impl SimulatedMotor {
    pub fn new() -> Self {
        Self::with_speed(DEFAULT_TICKS_PER_STEP)
    }

    /// Motor covering `ticks_per_step` ticks per period at full power
    pub fn with_speed(ticks_per_step: f64) -> Self {
        Self {
            mode: RunMode::Direct,
            direction: Direction::Forward,
            zero_power: ZeroPowerBehavior::Brake,
            position: 0.0,
            target: 0,
            power: 0.0,
            ticks_per_step,
            tolerance: DEFAULT_TOLERANCE_TICKS,
        }
    }

    /// Advance one control period
    pub fn step(&mut self) {
        let travel = self.power.abs() * self.ticks_per_step;
        match self.mode {
            RunMode::ResetPosition => {}
            RunMode::Direct => self.position += self.power * self.ticks_per_step,
            RunMode::PositionTracking => {
                let remaining = self.target as f64 - self.position;
                if remaining.abs() <= travel {
                    self.position = self.target as f64;
                } else {
                    self.position += travel * remaining.signum();
                }
            }
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn zero_power_behavior(&self) -> ZeroPowerBehavior {
        self.zero_power
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn target(&self) -> i32 {
        self.target
    }

    pub fn position(&self) -> i32 {
        self.position.round() as i32
    }

    fn within_tolerance(&self) -> bool {
        (self.target - self.position()).abs() <= self.tolerance
    }
}

impl Default for SimulatedMotor {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for SimulatedMotor {
    fn set_run_mode(&mut self, mode: RunMode) -> Result<(), ActuatorError> {
        if mode == RunMode::ResetPosition {
            self.position = 0.0;
            self.target = 0;
            self.power = 0.0;
        }
        self.mode = mode;
        Ok(())
    }

    fn set_target_position(&mut self, ticks: i32) -> Result<(), ActuatorError> {
        self.target = ticks;
        Ok(())
    }

    fn set_power(&mut self, power: f64) -> Result<(), ActuatorError> {
        self.power = power.clamp(-1.0, 1.0);
        Ok(())
    }

    fn current_position(&mut self) -> Result<i32, ActuatorError> {
        Ok(self.position())
    }

    fn is_arrived(&mut self) -> Result<bool, ActuatorError> {
        if self.mode != RunMode::PositionTracking {
            return Ok(true);
        }
        self.step();
        Ok(self.within_tolerance())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        self.direction = direction;
        Ok(())
    }

    fn set_zero_power_behavior(
        &mut self,
        behavior: ZeroPowerBehavior,
    ) -> Result<(), ActuatorError> {
        self.zero_power = behavior;
        Ok(())
    }
}
