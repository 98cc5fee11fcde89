// Wheel power normalization

use super::kinematics::WheelPowers;

/// Maximum power magnitude an actuator accepts
pub const MAX_POWER: f64 = 1.0;

/// Scale all four powers down together if any exceeds [`MAX_POWER`].
///
/// Ratios between wheels are preserved. Powers already in range are returned untouched.
pub fn normalize(powers: WheelPowers) -> WheelPowers {
    let max = powers.max_abs();
    if max > MAX_POWER {
        WheelPowers::from_array(powers.as_array().map(|p| p / max))
    } else {
        powers
    }
}
