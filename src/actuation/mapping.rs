//! mapping.rs
//! Pure raw-scale → actuator-scale mappers.
//!
//! - `drive`: speed → H-bridge direction + duty cycle for both motors.
//! - `alignment`: recenters a joystick angle by +50 and clamps to 0..=180.
//! - `turn`: angle → servo pulse ratio via an affine `(base, span)` calibration,
//!   rounded to 0.1 so sub-resolution changes never reach the servo.
//!
//! Every mapper clamps its result to the actuator range as the last step, so
//! out-of-range input can never produce an out-of-range write.

use serde::Deserialize;

pub const MAX_DUTY: i32 = 100;
pub const MAX_ANGLE: i32 = 180;
pub const ALIGNMENT_OFFSET: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveSignal {
    pub motor_a_percent: u8,
    pub motor_b_percent: u8,
    /// `None` leaves the direction lines as they are (deadband stop).
    pub direction: Option<Direction>,
}

impl DriveSignal {
    fn both(percent: i32, direction: Option<Direction>) -> Self {
        let percent = percent.clamp(0, MAX_DUTY) as u8;
        Self {
            motor_a_percent: percent,
            motor_b_percent: percent,
            direction,
        }
    }

    pub fn stop() -> Self {
        Self::both(0, None)
    }
}

/// Joystick center deadzone: speeds strictly between `low` and `high` stop the car.
/// Expects `1 <= low < high`; the config loader enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadband {
    pub low: i32,
    pub high: i32,
}

impl Default for Deadband {
    fn default() -> Self {
        Self { low: 43, high: 55 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrivePolicy {
    /// Speed 0..=100 with a center deadzone; below it is reverse.
    Deadband(Deadband),
    /// Speed is already a 0..=100 duty cycle.
    Linear,
}

pub fn drive(speed: i32, policy: &DrivePolicy) -> DriveSignal {
    match policy {
        DrivePolicy::Deadband(band) => {
            let s = speed as f64;
            if speed > band.low && speed < band.high {
                DriveSignal::stop()
            } else if speed <= band.low {
                let magnitude = (100.0 - s / band.low as f64 * 100.0).floor();
                DriveSignal::both(saturate(magnitude), Some(Direction::Reverse))
            } else {
                let high = band.high as f64;
                let magnitude = ((s - high) / high * 100.0).floor();
                DriveSignal::both(saturate(magnitude), Some(Direction::Forward))
            }
        }
        DrivePolicy::Linear => DriveSignal::both(speed, Some(Direction::Forward)),
    }
}

// f64 → i32 without wrapping; the caller clamps to the duty range.
fn saturate(v: f64) -> i32 {
    v.clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

/// Recenter a joystick angle and clamp it onto the servo range.
pub fn alignment(angle: i32) -> i32 {
    angle.saturating_add(ALIGNMENT_OFFSET).clamp(0, MAX_ANGLE)
}

/// Affine servo calibration: `pulse = base + span * angle / 180`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteerCalibration {
    pub base: f64,
    pub span: f64,
}

impl SteerCalibration {
    pub const JOYSTICK: Self = Self { base: 6.0, span: 3.0 };
    pub const NETWORK: Self = Self { base: 5.0, span: 5.0 };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteerPolicy {
    /// Apply `alignment` before mapping; otherwise only clamp.
    pub recenter: bool,
    pub calibration: SteerCalibration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteerSignal {
    pub pulse_ratio: f64,
    pub clamped_angle: i32,
}

pub fn turn(angle: i32, policy: &SteerPolicy) -> SteerSignal {
    let clamped_angle = if policy.recenter {
        alignment(angle)
    } else {
        angle.clamp(0, MAX_ANGLE)
    };

    let cal = policy.calibration;
    let raw = cal.base + cal.span * clamped_angle as f64 / MAX_ANGLE as f64;
    let (lo, hi) = if cal.span >= 0.0 {
        (cal.base, cal.base + cal.span)
    } else {
        (cal.base + cal.span, cal.base)
    };

    SteerSignal {
        // max/min rather than clamp: a NaN bound must not panic the control thread.
        pulse_ratio: round_tenth(raw.max(lo).min(hi)),
        clamped_angle,
    }
}

#[inline]
pub fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// The two input conventions the vehicle has been driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Raw stick scale: deadband drive, recentered steering, (6, 3) servo.
    Joystick,
    /// Pre-normalized scale: linear drive, clamp-only steering, (5, 5) servo.
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingPolicy {
    pub drive: DrivePolicy,
    pub steer: SteerPolicy,
}

impl MappingPolicy {
    pub fn joystick() -> Self {
        Self {
            drive: DrivePolicy::Deadband(Deadband::default()),
            steer: SteerPolicy {
                recenter: true,
                calibration: SteerCalibration::JOYSTICK,
            },
        }
    }

    pub fn network() -> Self {
        Self {
            drive: DrivePolicy::Linear,
            steer: SteerPolicy {
                recenter: false,
                calibration: SteerCalibration::NETWORK,
            },
        }
    }
}

impl From<Profile> for MappingPolicy {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Joystick => Self::joystick(),
            Profile::Network => Self::network(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deadband() -> DrivePolicy {
        DrivePolicy::Deadband(Deadband::default())
    }

    fn has_one_decimal(v: f64) -> bool {
        ((v * 10.0).round() - v * 10.0).abs() < 1e-9
    }

    #[test]
    fn deadband_center_stops() {
        for s in 44..55 {
            let sig = drive(s, &deadband());
            assert_eq!(sig.motor_a_percent, 0, "speed {s}");
            assert_eq!(sig.motor_b_percent, 0, "speed {s}");
            assert_eq!(sig.direction, None);
        }
    }

    #[test]
    fn deadband_reverse_follows_formula() {
        for s in -50..=43 {
            let sig = drive(s, &deadband());
            let expected = (100.0 - s as f64 / 43.0 * 100.0).floor().clamp(0.0, 100.0) as u8;
            assert_eq!(sig.direction, Some(Direction::Reverse), "speed {s}");
            assert_eq!(sig.motor_a_percent, expected, "speed {s}");
            assert_eq!(sig.motor_b_percent, expected, "speed {s}");
        }
        assert_eq!(drive(0, &deadband()).motor_a_percent, 100);
        assert_eq!(drive(43, &deadband()).motor_a_percent, 0);
        assert_eq!(drive(43, &deadband()).direction, Some(Direction::Reverse));
    }

    #[test]
    fn deadband_forward_follows_formula() {
        for s in 55..=300 {
            let sig = drive(s, &deadband());
            let expected = ((s as f64 - 55.0) / 55.0 * 100.0).floor().clamp(0.0, 100.0) as u8;
            assert_eq!(sig.direction, Some(Direction::Forward), "speed {s}");
            assert_eq!(sig.motor_a_percent, expected, "speed {s}");
        }
        assert_eq!(drive(55, &deadband()).motor_a_percent, 0);
        assert_eq!(drive(100, &deadband()).motor_a_percent, 81);
        assert_eq!(drive(i32::MAX, &deadband()).motor_a_percent, 100);
        assert_eq!(drive(i32::MIN, &deadband()).motor_a_percent, 100);
    }

    #[test]
    fn linear_passes_duty_through_clamped() {
        let sig = drive(100, &DrivePolicy::Linear);
        assert_eq!(sig.motor_a_percent, 100);
        assert_eq!(sig.direction, Some(Direction::Forward));
        assert_eq!(drive(37, &DrivePolicy::Linear).motor_b_percent, 37);
        assert_eq!(drive(-5, &DrivePolicy::Linear).motor_a_percent, 0);
        assert_eq!(drive(250, &DrivePolicy::Linear).motor_a_percent, 100);
    }

    #[test]
    fn alignment_recenters_and_clamps() {
        assert_eq!(alignment(-60), 0);
        assert_eq!(alignment(200), 180);
        assert_eq!(alignment(40), 90);
        assert_eq!(alignment(i32::MAX), 180);
        for a in -500..500 {
            assert!((0..=180).contains(&alignment(a)));
        }
    }

    #[test]
    fn turn_rounds_to_one_decimal() {
        for policy in [MappingPolicy::joystick().steer, MappingPolicy::network().steer] {
            for a in -100..300 {
                let sig = turn(a, &policy);
                assert!(has_one_decimal(sig.pulse_ratio), "angle {a}: {}", sig.pulse_ratio);
                assert!((0..=180).contains(&sig.clamped_angle));
            }
        }
    }

    #[test]
    fn turn_uses_calibration_endpoints() {
        let joy = MappingPolicy::joystick().steer;
        assert_eq!(turn(-50, &joy).pulse_ratio, 6.0);
        assert_eq!(turn(130, &joy).pulse_ratio, 9.0);
        // alignment(90) = 140 → 6 + 3 * 140 / 180 = 8.333
        assert_eq!(turn(90, &joy).pulse_ratio, 8.3);
        assert_eq!(turn(90, &joy).clamped_angle, 140);

        let net = MappingPolicy::network().steer;
        assert_eq!(turn(0, &net).pulse_ratio, 5.0);
        assert_eq!(turn(90, &net).pulse_ratio, 7.5);
        assert_eq!(turn(180, &net).pulse_ratio, 10.0);
        assert_eq!(turn(180, &net).clamped_angle, 180);
        assert_eq!(turn(400, &net).pulse_ratio, 10.0);
    }

    #[test]
    fn non_finite_calibration_does_not_panic() {
        for cal in [
            SteerCalibration { base: 5.0, span: f64::NAN },
            SteerCalibration { base: f64::NAN, span: 5.0 },
            SteerCalibration { base: f64::INFINITY, span: 1.0 },
        ] {
            let policy = SteerPolicy { recenter: false, calibration: cal };
            let _ = turn(120, &policy);
        }
    }

    #[test]
    fn custom_deadband_uses_its_own_edges() {
        let band = DrivePolicy::Deadband(Deadband { low: 1, high: 2 });
        assert_eq!(drive(1, &band).motor_a_percent, 0);
        assert_eq!(drive(1, &band).direction, Some(Direction::Reverse));
        assert_eq!(drive(0, &band).motor_a_percent, 100);
        assert_eq!(drive(4, &band).motor_a_percent, 100);
        assert_eq!(drive(4, &band).direction, Some(Direction::Forward));
    }

    #[test]
    fn profiles_select_policies() {
        assert_eq!(MappingPolicy::from(Profile::Joystick), MappingPolicy::joystick());
        assert_eq!(MappingPolicy::from(Profile::Network).drive, DrivePolicy::Linear);
    }
}
