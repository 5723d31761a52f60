//! gpio.rs
//! Raspberry Pi backend: software PWM on BCM pins through `rppal`.
//!
//! Pin faults after start-up are logged and swallowed; the control loop only
//! ever sees an infallible port.

use log::{info, warn};
use rppal::gpio::{Gpio, OutputPin};

use crate::actuation::port::{ActuatorPort, Motor};
use crate::utils::config::ActuatorConfig;

/// Servo pulse written at start-up (straight ahead).
pub const NEUTRAL_STEER_PULSE: f64 = 7.5;

struct Bridge {
    pwm: OutputPin,
    in1: OutputPin,
    in2: OutputPin,
}

pub struct GpioPort {
    a: Bridge,
    b: Bridge,
    stby: OutputPin,
    servo: OutputPin,
    drive_hz: f64,
    servo_hz: f64,
}

impl GpioPort {
    /// Claim the pins and put the car in its start-up state: forward
    /// direction, 0 % drive, bridge enabled, servo centered.
    pub fn open(config: &ActuatorConfig) -> rppal::gpio::Result<Self> {
        let gpio = Gpio::new()?;
        let pins = config.pins;
        let out = |pin: u8| -> rppal::gpio::Result<OutputPin> { Ok(gpio.get(pin)?.into_output_low()) };

        let mut port = Self {
            a: Bridge { pwm: out(pins.pwm_a)?, in1: out(pins.ain1)?, in2: out(pins.ain2)? },
            b: Bridge { pwm: out(pins.pwm_b)?, in1: out(pins.bin1)?, in2: out(pins.bin2)? },
            stby: out(pins.stby)?,
            servo: out(pins.servo)?,
            drive_hz: config.drive_pwm_hz,
            servo_hz: config.servo_pwm_hz,
        };

        for motor in Motor::ALL {
            port.set_direction(motor, true);
            port.set_drive_duty_cycle(motor, 0);
        }
        port.set_standby(true);
        port.set_steer_pulse_width(NEUTRAL_STEER_PULSE);

        info!("[Gpio] Pins claimed: {:?}", pins);
        Ok(port)
    }

    fn bridge(&mut self, motor: Motor) -> &mut Bridge {
        match motor {
            Motor::A => &mut self.a,
            Motor::B => &mut self.b,
        }
    }
}

impl ActuatorPort for GpioPort {
    fn set_direction(&mut self, motor: Motor, forward: bool) {
        // Motor B is mounted mirrored, so its bridge inputs are swapped.
        let in1_high = match motor {
            Motor::A => !forward,
            Motor::B => forward,
        };
        let bridge = self.bridge(motor);
        if in1_high {
            bridge.in2.set_low();
            bridge.in1.set_high();
        } else {
            bridge.in1.set_low();
            bridge.in2.set_high();
        }
    }

    fn set_drive_duty_cycle(&mut self, motor: Motor, percent: u8) {
        let hz = self.drive_hz;
        let duty = f64::from(percent.min(100)) / 100.0;
        if let Err(e) = self.bridge(motor).pwm.set_pwm_frequency(hz, duty) {
            warn!("[Gpio] motor {:?} PWM failed: {}", motor, e);
        }
    }

    fn set_steer_pulse_width(&mut self, ratio: f64) {
        let duty = (ratio / 100.0).clamp(0.0, 1.0);
        if let Err(e) = self.servo.set_pwm_frequency(self.servo_hz, duty) {
            warn!("[Gpio] servo PWM failed: {}", e);
        }
    }

    fn set_standby(&mut self, enabled: bool) {
        if enabled {
            self.stby.set_high();
        } else {
            self.stby.set_low();
        }
    }
}
