// Mecanum kinematics for a four-wheel base
//
// Discrete moves use fixed sign tables on raw motor polarity (all wheels Forward):
//
//   Drive(t):   FL -t  FR +t  BL -t  BR +t   (positive t = forward)
//   Strafe(t):  FL +t  FR -t  BL +t  BR -t   (positive t = right)
//   Turn(t):    FL -t  FR +t  BL +t  BR -t   (positive t = clockwise)
//
// Continuous mixing assumes the left side is reversed so positive power drives
// every wheel forward (see WheelDirections::teleop).

/// Discrete motion primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Drive,
    Strafe,
    Turn,
}

/// Relative encoder targets for the four wheels, in ticks from the last reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelTargets {
    pub front_left: i32,
    pub front_right: i32,
    pub back_left: i32,
    pub back_right: i32,
}

impl WheelTargets {
    pub fn new(front_left: i32, front_right: i32, back_left: i32, back_right: i32) -> Self {
        Self {
            front_left,
            front_right,
            back_left,
            back_right,
        }
    }

    /// Targets for a discrete move of `ticks` (already signed for direction)
    pub fn for_move(kind: MoveKind, ticks: i32) -> Self {
        // i32::MIN has no positive counterpart
        let t = ticks.max(-i32::MAX);
        match kind {
            MoveKind::Drive => Self::new(-t, t, -t, t),
            MoveKind::Strafe => Self::new(t, -t, t, -t),
            MoveKind::Turn => Self::new(-t, t, t, -t),
        }
    }

    /// Returns targets as array [front_left, front_right, back_left, back_right]
    pub fn as_array(&self) -> [i32; 4] {
        [
            self.front_left,
            self.front_right,
            self.back_left,
            self.back_right,
        ]
    }
}

/// Immediate power commands for the four wheels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelPowers {
    pub front_left: f64,
    pub front_right: f64,
    pub back_left: f64,
    pub back_right: f64,
}

impl WheelPowers {
    pub fn new(front_left: f64, front_right: f64, back_left: f64, back_right: f64) -> Self {
        Self {
            front_left,
            front_right,
            back_left,
            back_right,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Holonomic mixing of (axial, lateral, yaw), each in [-1, 1].
    ///
    /// Axial positive is forward, lateral positive is right, yaw positive is clockwise.
    /// The result may exceed 1.0 in magnitude; see [`normalize`](super::normalize).
    pub fn mix(axial: f64, lateral: f64, yaw: f64) -> Self {
        Self {
            front_left: axial + lateral + yaw,
            front_right: axial - lateral - yaw,
            back_left: axial - lateral + yaw,
            back_right: axial + lateral - yaw,
        }
    }

    /// Returns powers as array [front_left, front_right, back_left, back_right]
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.front_left,
            self.front_right,
            self.back_left,
            self.back_right,
        ]
    }

    pub fn from_array(powers: [f64; 4]) -> Self {
        let [front_left, front_right, back_left, back_right] = powers;
        Self::new(front_left, front_right, back_left, back_right)
    }

    /// Largest magnitude among the four wheels
    pub fn max_abs(&self) -> f64 {
        self.as_array().iter().fold(0.0f64, |m, p| m.max(p.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_negative_ticks_do_not_overflow() {
        for kind in [MoveKind::Drive, MoveKind::Strafe, MoveKind::Turn] {
            let targets = WheelTargets::for_move(kind, i32::MIN).as_array();
            assert_eq!(targets, WheelTargets::for_move(kind, -i32::MAX).as_array());
            assert!(targets.iter().all(|t| t.abs() == i32::MAX), "{:?}", kind);
        }
    }

    #[test]
    fn test_sign_tables() {
        for t in [1, 7, 418, 10_000] {
            assert_eq!(
                WheelTargets::for_move(MoveKind::Drive, t).as_array(),
                [-t, t, -t, t]
            );
            assert_eq!(
                WheelTargets::for_move(MoveKind::Strafe, t).as_array(),
                [t, -t, t, -t]
            );
            assert_eq!(
                WheelTargets::for_move(MoveKind::Turn, t).as_array(),
                [-t, t, t, -t]
            );
        }
    }

    #[test]
    fn test_negative_ticks_reverse_every_wheel() {
        let forward = WheelTargets::for_move(MoveKind::Strafe, 100);
        let back = WheelTargets::for_move(MoveKind::Strafe, -100);
        for (f, b) in forward.as_array().iter().zip(back.as_array()) {
            assert_eq!(*f, -b);
        }
    }

    #[test]
    fn test_zero_velocity() {
        let powers = WheelPowers::mix(0.0, 0.0, 0.0);
        assert_eq!(powers, WheelPowers::zero());
    }

    #[test]
    fn test_forward_motion() {
        // All wheels forward at full axial
        let powers = WheelPowers::mix(1.0, 0.0, 0.0);
        assert_eq!(powers.as_array(), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_strafe_right() {
        // Diagonal pairs oppose each other
        let powers = WheelPowers::mix(0.0, 0.5, 0.0);
        assert_eq!(powers.as_array(), [0.5, -0.5, -0.5, 0.5]);
    }

    #[test]
    fn test_rotation_only() {
        // Left side forward, right side backward for clockwise
        let powers = WheelPowers::mix(0.0, 0.0, 0.5);
        assert_eq!(powers.as_array(), [0.5, -0.5, 0.5, -0.5]);
    }

    #[test]
    fn test_combined_axes_can_exceed_one() {
        let powers = WheelPowers::mix(1.0, 1.0, 1.0);
        assert_eq!(powers.front_left, 3.0);
        assert_eq!(powers.max_abs(), 3.0);
    }
}
