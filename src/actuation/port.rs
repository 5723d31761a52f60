//! port.rs
//! Actuator port: the only way the control loop touches hardware.
//!
//! Calls are synchronous, idempotent and made from the control thread only.
//! Hardware faults are the backend's business; the port never fails upward.

use log::info;

use crate::actuation::mapping::{Direction, DriveSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motor {
    A,
    B,
}

impl Motor {
    pub const ALL: [Motor; 2] = [Motor::A, Motor::B];
}

pub trait ActuatorPort {
    /// Assert the H-bridge direction lines for one motor.
    fn set_direction(&mut self, motor: Motor, forward: bool);

    /// PWM duty cycle for one drive motor, 0..=100.
    fn set_drive_duty_cycle(&mut self, motor: Motor, percent: u8);

    /// Servo PWM duty cycle in percent, 0.1 resolution.
    fn set_steer_pulse_width(&mut self, ratio: f64);

    /// `true` drives STBY high so the H-bridge can power the motors.
    fn set_standby(&mut self, enabled: bool);
}

impl<P: ActuatorPort + ?Sized> ActuatorPort for Box<P> {
    fn set_direction(&mut self, motor: Motor, forward: bool) {
        (**self).set_direction(motor, forward)
    }

    fn set_drive_duty_cycle(&mut self, motor: Motor, percent: u8) {
        (**self).set_drive_duty_cycle(motor, percent)
    }

    fn set_steer_pulse_width(&mut self, ratio: f64) {
        (**self).set_steer_pulse_width(ratio)
    }

    fn set_standby(&mut self, enabled: bool) {
        (**self).set_standby(enabled)
    }
}

/// Direction first, then duty on both motors, then enable the bridge.
pub fn apply_drive<P: ActuatorPort + ?Sized>(port: &mut P, signal: &DriveSignal) {
    if let Some(direction) = signal.direction {
        let forward = direction == Direction::Forward;
        for motor in Motor::ALL {
            port.set_direction(motor, forward);
        }
    }
    port.set_drive_duty_cycle(Motor::A, signal.motor_a_percent);
    port.set_drive_duty_cycle(Motor::B, signal.motor_b_percent);
    port.set_standby(true);
}

/// Both motors to 0 % and the bridge disabled.
pub fn apply_neutral<P: ActuatorPort + ?Sized>(port: &mut P) {
    for motor in Motor::ALL {
        port.set_drive_duty_cycle(motor, 0);
    }
    port.set_standby(false);
}

/// Dry-run backend: logs every call instead of touching pins.
#[derive(Debug, Default)]
pub struct LoggingPort;

impl ActuatorPort for LoggingPort {
    fn set_direction(&mut self, motor: Motor, forward: bool) {
        info!("[Port] motor {:?} direction {}", motor, if forward { "forward" } else { "reverse" });
    }

    fn set_drive_duty_cycle(&mut self, motor: Motor, percent: u8) {
        info!("[Port] motor {:?} duty {}%", motor, percent);
    }

    fn set_steer_pulse_width(&mut self, ratio: f64) {
        info!("[Port] servo pulse {:.1}%", ratio);
    }

    fn set_standby(&mut self, enabled: bool) {
        info!("[Port] standby line {}", if enabled { "high (enabled)" } else { "low (disabled)" });
    }
}
