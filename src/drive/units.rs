// Inches and degrees to encoder ticks

use crate::config::Calibration;

/// Largest tick count either way; symmetric so negating a target never overflows
pub const MAX_TICKS: i32 = i32::MAX;

/// Nearest tick, half away from zero, saturating at `±MAX_TICKS`
fn round_ticks(x: f64) -> i32 {
    const LIMIT: f64 = MAX_TICKS as f64;
    x.round().clamp(-LIMIT, LIMIT) as i32
}

/// Converts physical moves to per-wheel encoder ticks.
///
/// Rounds to the nearest tick (half away from zero), so every conversion is odd:
/// `f(-x) == -f(x)` and `f(0) == 0`, including moves too long to represent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitsConverter {
    calibration: Calibration,
    ticks_per_inch: f64,
}

impl UnitsConverter {
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            ticks_per_inch: calibration.ticks_per_inch(),
        }
    }

    pub fn ticks_per_inch(&self) -> f64 {
        self.ticks_per_inch
    }

    /// Straight-line travel
    pub fn to_ticks(&self, inches: f64) -> i32 {
        round_ticks(inches * self.ticks_per_inch)
    }

    /// Sideways travel, scaled up for roller slip
    pub fn strafe_ticks(&self, inches: f64) -> i32 {
        round_ticks(inches * self.ticks_per_inch * self.calibration.strafe_correction)
    }

    /// In-place rotation. Empirical, tune on the robot.
    pub fn turn_ticks(&self, degrees: f64) -> i32 {
        round_ticks(degrees * self.calibration.turn_ticks_per_degree)
    }
}

impl Default for UnitsConverter {
    fn default() -> Self {
        Self::new(Calibration::default())
    }
}
