//! Run-time configuration loaded from a TOML file.
//!
//! Every field has a default, so a missing file section (or a missing file,
//! see `load_or_default`) yields the stock vehicle wiring and timing.

use std::{
    fs::read_to_string,
    net::Ipv4Addr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::actuation::{
    control_loop::{DEFAULT_PERIOD, DEFAULT_SELF_TEST_TICKS},
    mapping::{Deadband, DrivePolicy, MappingPolicy, Profile},
};
use crate::ingestion::{
    joystick::{AxisMap, AxisRange, DEFAULT_ANGLE_AXIS, DEFAULT_SPEED_AXIS},
    multicast::{DEFAULT_GROUP, DEFAULT_MAX_DATAGRAM, DEFAULT_PORT},
    task::DEFAULT_BURST_CAP,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {0:?}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    pub mapping: MappingConfig,
    pub control: ControlConfig,
    pub actuator: ActuatorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Multicast,
    Joystick,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub group: Ipv4Addr,
    pub port: u16,
    pub interface: Ipv4Addr,
    pub max_datagram: usize,
    pub device: PathBuf,
    /// Axis readings drained before a forced publish.
    pub burst_cap: usize,
    pub speed_axis: AxisRange,
    pub angle_axis: AxisRange,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Multicast,
            group: DEFAULT_GROUP,
            port: DEFAULT_PORT,
            interface: Ipv4Addr::UNSPECIFIED,
            max_datagram: DEFAULT_MAX_DATAGRAM,
            device: PathBuf::from("/dev/input/event0"),
            burst_cap: DEFAULT_BURST_CAP,
            speed_axis: DEFAULT_SPEED_AXIS,
            angle_axis: DEFAULT_ANGLE_AXIS,
        }
    }
}

impl SourceConfig {
    pub fn axis_map(&self) -> AxisMap {
        AxisMap {
            speed: self.speed_axis,
            angle: self.angle_axis,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingConfig {
    /// Defaults to the profile matching the source kind.
    pub profile: Option<Profile>,
    pub steer_base: Option<f64>,
    pub steer_span: Option<f64>,
    pub deadband_low: Option<i32>,
    pub deadband_high: Option<i32>,
}

impl MappingConfig {
    pub fn profile_for(&self, source: SourceKind) -> Profile {
        self.profile.unwrap_or(match source {
            SourceKind::Multicast => Profile::Network,
            SourceKind::Joystick => Profile::Joystick,
        })
    }

    pub fn policy(&self, source: SourceKind) -> MappingPolicy {
        let mut policy = MappingPolicy::from(self.profile_for(source));

        if let Some(base) = self.steer_base {
            policy.steer.calibration.base = base;
        }
        if let Some(span) = self.steer_span {
            policy.steer.calibration.span = span;
        }
        if let DrivePolicy::Deadband(band) = &mut policy.drive {
            let defaults = Deadband::default();
            band.low = self.deadband_low.unwrap_or(defaults.low);
            band.high = self.deadband_high.unwrap_or(defaults.high);
        }
        policy
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    pub period_ms: u64,
    pub self_test_ticks: u32,
    pub pin_core: Option<usize>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD.as_millis() as u64,
            self_test_ticks: DEFAULT_SELF_TEST_TICKS,
            pin_core: None,
        }
    }
}

impl ControlConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Log actuator calls, touch no hardware.
    Log,
    /// Raspberry Pi GPIO (needs the `gpio` feature).
    Gpio,
}

/// BCM pin numbers of the TB6612-style H-bridge and the steering servo.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinConfig {
    pub pwm_a: u8,
    pub ain1: u8,
    pub ain2: u8,
    pub stby: u8,
    pub bin1: u8,
    pub bin2: u8,
    pub pwm_b: u8,
    pub servo: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            pwm_a: 26,
            ain1: 18,
            ain2: 17,
            stby: 23,
            bin1: 22,
            bin2: 25,
            pwm_b: 24,
            servo: 13,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorConfig {
    pub backend: Backend,
    pub pins: PinConfig,
    pub drive_pwm_hz: f64,
    pub servo_pwm_hz: f64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Log,
            pins: PinConfig::default(),
            drive_pwm_hz: 100.0,
            servo_pwm_hz: 50.0,
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot drive the mappers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, range) in [("speed_axis", self.source.speed_axis), ("angle_axis", self.source.angle_axis)] {
            if range.min >= range.max {
                return Err(ConfigError::Invalid(format!(
                    "source.{name}: min {} must be below max {}",
                    range.min, range.max
                )));
            }
        }

        for (name, value) in [("steer_base", self.mapping.steer_base), ("steer_span", self.mapping.steer_span)] {
            if let Some(v) = value.filter(|v| !v.is_finite()) {
                return Err(ConfigError::Invalid(format!("mapping.{name} must be finite, got {v}")));
            }
        }

        let defaults = Deadband::default();
        let low = self.mapping.deadband_low.unwrap_or(defaults.low);
        let high = self.mapping.deadband_high.unwrap_or(defaults.high);
        if low < 1 || high <= low {
            return Err(ConfigError::Invalid(format!(
                "mapping deadband needs 1 <= deadband_low < deadband_high, got {low}..{high}"
            )));
        }

        for (name, hz) in [("drive_pwm_hz", self.actuator.drive_pwm_hz), ("servo_pwm_hz", self.actuator.servo_pwm_hz)] {
            if !(hz.is_finite() && hz > 0.0) {
                return Err(ConfigError::Invalid(format!("actuator.{name} must be a positive frequency, got {hz}")));
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_toml_str(&text)
    }

    /// `None` means built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
