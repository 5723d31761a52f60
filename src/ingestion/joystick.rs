//! joystick.rs
//! Local input device source (evdev).
//!
//! Vertical stick (`ABS_Y`) drives speed, rotational stick (`ABS_RX`) drives angle.
//! Raw axis counts are scaled into the command domain here; clamping to the
//! actuator range happens later in the mappers.

use std::{collections::VecDeque, io, path::Path};

use evdev::{AbsoluteAxisCode, Device, EventType, InputEvent, SynchronizationCode};
use log::{info, trace};
use serde::Deserialize;

use crate::ingestion::source::{AxisReading, CommandSource, SourceError, SourceEvent};

/// Raw count range reported by one device axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    // Widened to f64 so extreme configured ranges cannot overflow.
    fn fraction(&self, value: i32) -> f64 {
        let width = (f64::from(self.max) - f64::from(self.min)).max(1.0);
        (f64::from(value) - f64::from(self.min)) / width
    }
}

/// errno reported by evdev once the device is unplugged.
const ENODEV: i32 = 19;

pub const DEFAULT_SPEED_AXIS: AxisRange = AxisRange::new(8300, 59000);
pub const DEFAULT_ANGLE_AXIS: AxisRange = AxisRange::new(4300, 53000);

/// Stick pushed forward reads low counts, so speed is inverted onto 0..=100.
pub fn scale_speed(value: i32, range: &AxisRange) -> i32 {
    (100.0 - range.fraction(value) * 100.0).floor() as i32
}

/// Stick pushed right reads high counts, so angle is inverted onto 0..=180.
pub fn scale_angle(value: i32, range: &AxisRange) -> i32 {
    180 - (range.fraction(value) * 180.0).floor() as i32
}

/// Which device events matter and how they scale.
#[derive(Debug, Clone, Copy)]
pub struct AxisMap {
    pub speed: AxisRange,
    pub angle: AxisRange,
}

impl Default for AxisMap {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED_AXIS,
            angle: DEFAULT_ANGLE_AXIS,
        }
    }
}

impl AxisMap {
    /// Translate one raw device event. `None` for events the vehicle ignores.
    pub fn translate(&self, event_type: EventType, code: u16, value: i32) -> Option<SourceEvent> {
        if event_type == EventType::ABSOLUTE {
            if code == AbsoluteAxisCode::ABS_Y.0 {
                return Some(SourceEvent::Axis(AxisReading::Speed(scale_speed(value, &self.speed))));
            }
            if code == AbsoluteAxisCode::ABS_RX.0 {
                return Some(SourceEvent::Axis(AxisReading::Angle(scale_angle(value, &self.angle))));
            }
        } else if event_type == EventType::SYNCHRONIZATION && code == SynchronizationCode::SYN_REPORT.0 {
            return Some(SourceEvent::FrameEnd);
        }
        None
    }
}

pub struct JoystickSource {
    device: Device,
    axes: AxisMap,
    pending: VecDeque<SourceEvent>,
    label: String,
}

impl JoystickSource {
    pub fn open(path: impl AsRef<Path>, axes: AxisMap) -> io::Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path)?;
        info!(
            "[Joystick] Opened {} ({})",
            path.display(),
            device.name().unwrap_or("unnamed device")
        );
        Ok(Self {
            device,
            axes,
            pending: VecDeque::new(),
            label: format!("joystick {}", path.display()),
        })
    }

    fn refill(&mut self) -> io::Result<()> {
        let events: Vec<InputEvent> = self.device.fetch_events()?.collect();
        for ev in events {
            trace!("[Joystick] type={:?} code={} value={}", ev.event_type(), ev.code(), ev.value());
            if let Some(translated) = self.axes.translate(ev.event_type(), ev.code(), ev.value()) {
                self.pending.push_back(translated);
            }
        }
        // Every fetched batch closes at least one frame.
        if !matches!(self.pending.back(), Some(SourceEvent::FrameEnd)) {
            self.pending.push_back(SourceEvent::FrameEnd);
        }
        Ok(())
    }
}

impl CommandSource for JoystickSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn next_event(&mut self) -> Result<SourceEvent, SourceError> {
        loop {
            if let Some(ev) = self.pending.pop_front() {
                return Ok(ev);
            }
            match self.refill() {
                Ok(()) => continue,
                Err(e) if e.raw_os_error() == Some(ENODEV) => return Err(SourceError::Closed),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_axis_matches_observed_formula() {
        let r = DEFAULT_SPEED_AXIS;
        assert_eq!(scale_speed(8300, &r), 100);
        assert_eq!(scale_speed(59000, &r), 0);
        // floor(100 - 25350/50700*100) = floor(50.0)
        assert_eq!(scale_speed(33650, &r), 50);
        // floor(100 - 37.501) = 62, where 100 - floor(37.501) would be 63
        assert_eq!(scale_speed(8300 + 19013, &r), 62);
    }

    #[test]
    fn angle_axis_matches_observed_formula() {
        let r = DEFAULT_ANGLE_AXIS;
        assert_eq!(scale_angle(4300, &r), 180);
        assert_eq!(scale_angle(53000, &r), 0);
        assert_eq!(scale_angle(28650, &r), 90);
    }

    #[test]
    fn out_of_range_counts_are_not_clamped_here() {
        assert!(scale_speed(0, &DEFAULT_SPEED_AXIS) > 100);
        assert!(scale_angle(60000, &DEFAULT_ANGLE_AXIS) < 0);
    }

    #[test]
    fn degenerate_range_does_not_divide_by_zero() {
        let r = AxisRange::new(500, 500);
        assert_eq!(scale_speed(500, &r), 100);
    }

    #[test]
    fn extreme_range_scales_without_overflow() {
        let wide = AxisRange::new(i32::MIN, 65535);
        assert_eq!(scale_speed(65535, &wide), 0);
        assert_eq!(scale_speed(i32::MIN, &wide), 100);
        let s = scale_speed(100, &wide);
        assert!((0..=100).contains(&s), "speed {s}");

        let full = AxisRange::new(i32::MIN, i32::MAX);
        assert_eq!(scale_angle(i32::MIN, &full), 180);
        assert_eq!(scale_angle(i32::MAX, &full), 0);
    }

    #[test]
    fn translates_only_relevant_events() {
        let map = AxisMap::default();
        assert_eq!(
            map.translate(EventType::ABSOLUTE, AbsoluteAxisCode::ABS_Y.0, 59000),
            Some(SourceEvent::Axis(AxisReading::Speed(0)))
        );
        assert_eq!(
            map.translate(EventType::ABSOLUTE, AbsoluteAxisCode::ABS_RX.0, 4300),
            Some(SourceEvent::Axis(AxisReading::Angle(180)))
        );
        assert_eq!(
            map.translate(EventType::SYNCHRONIZATION, SynchronizationCode::SYN_REPORT.0, 0),
            Some(SourceEvent::FrameEnd)
        );
        assert_eq!(map.translate(EventType::ABSOLUTE, AbsoluteAxisCode::ABS_X.0, 1234), None);
        assert_eq!(map.translate(EventType::KEY, 304, 1), None);
    }
}
