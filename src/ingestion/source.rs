//! source.rs
//! Blocking command sources consumed by the ingestion task.
//!
//! A source yields one `SourceEvent` per call. Network sources produce whole
//! commands; device sources produce single axis readings followed by a frame
//! marker, and the ingestion task assembles the pair.

use thiserror::Error;

use crate::ingestion::command::Command;

/// One axis reading, already scaled into the raw command domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisReading {
    Speed(i32),
    Angle(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// A complete command (one datagram).
    Command(Command),
    /// Half of a command from a polled device.
    Axis(AxisReading),
    /// End of one device frame (`SYN_REPORT`).
    FrameEnd,
    /// Input arrived but could not be decoded. Dropped by the task.
    Malformed(String),
}

/// Transport failures. Any of these ends the ingestion task.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("source closed")]
    Closed,
}

pub trait CommandSource: Send {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Block until the next input event is available.
    fn next_event(&mut self) -> Result<SourceEvent, SourceError>;
}

impl<S: CommandSource + ?Sized> CommandSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_event(&mut self) -> Result<SourceEvent, SourceError> {
        (**self).next_event()
    }
}
