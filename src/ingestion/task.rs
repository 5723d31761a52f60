//! task.rs
//! Ingestion task: blocks on a `CommandSource` forever and publishes into the
//! shared command state.
//!
//! - Whole commands (datagrams) are published as they arrive.
//! - Axis readings are accumulated in a thread-local `FrameAccumulator` and
//!   published as a pair at the end of a device frame, or early once
//!   `burst_cap` readings piled up without a frame end.
//! - Malformed input is logged and dropped; transport errors end the task and
//!   are reported to the supervisor, never to the control loop.

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, bounded};
use log::{debug, error, info, warn};

use crate::ingestion::{
    command::Command,
    command_state::SharedCommandState,
    source::{AxisReading, CommandSource, SourceError, SourceEvent},
};
use crate::utils::metrics::LoopMetrics;

pub const DEFAULT_BURST_CAP: usize = 10;

/// What the task should do after feeding one event to the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Idle,
    Publish(Command),
    /// Burst cap reached: publish, then let the control loop run.
    PublishAndYield(Command),
    Drop(String),
}

/// Thread-local half-update buffer. Holds the last pair this task published
/// plus any axis readings since.
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    pending: Command,
    dirty: bool,
    drained: usize,
    burst_cap: usize,
}

impl FrameAccumulator {
    pub fn new(start: Command, burst_cap: usize) -> Self {
        Self {
            pending: start,
            dirty: false,
            drained: 0,
            burst_cap: burst_cap.max(1),
        }
    }

    pub fn push(&mut self, event: SourceEvent) -> Step {
        match event {
            SourceEvent::Command(command) => {
                self.pending = command;
                self.flush()
            }
            SourceEvent::Axis(reading) => {
                match reading {
                    AxisReading::Speed(s) => self.pending.speed = s,
                    AxisReading::Angle(a) => self.pending.angle = a,
                }
                self.dirty = true;
                self.drained += 1;
                if self.drained >= self.burst_cap {
                    match self.flush() {
                        Step::Publish(c) => Step::PublishAndYield(c),
                        other => other,
                    }
                } else {
                    Step::Idle
                }
            }
            SourceEvent::FrameEnd if self.dirty => self.flush(),
            SourceEvent::FrameEnd => Step::Idle,
            SourceEvent::Malformed(reason) => Step::Drop(reason),
        }
    }

    fn flush(&mut self) -> Step {
        self.dirty = false;
        self.drained = 0;
        Step::Publish(self.pending)
    }
}

pub struct IngestionTask<S: CommandSource> {
    source: S,
    state: SharedCommandState,
    burst_cap: usize,
    metrics: Arc<LoopMetrics>,
}

impl<S: CommandSource> IngestionTask<S> {
    pub fn new(source: S, state: SharedCommandState, burst_cap: usize, metrics: Arc<LoopMetrics>) -> Self {
        Self {
            source,
            state,
            burst_cap,
            metrics,
        }
    }

    /// Runs until the source fails. Only returns with an error.
    pub fn run(mut self) -> Result<(), SourceError> {
        let mut acc = FrameAccumulator::new(self.state.read(), self.burst_cap);
        info!("[Ingest] Listening on {}", self.source.name());

        loop {
            match acc.push(self.source.next_event()?) {
                Step::Idle => {}
                Step::Publish(command) => self.publish(command),
                Step::PublishAndYield(command) => {
                    debug!("[Ingest] Burst cap of {} reached", self.burst_cap);
                    self.publish(command);
                    thread::yield_now();
                }
                Step::Drop(reason) => {
                    warn!("[Ingest] Dropped malformed input: {}", reason);
                    self.metrics.record_dropped();
                }
            }
        }
    }

    fn publish(&self, command: Command) {
        self.state.publish(command);
        self.metrics.record_published();
    }
}

/// Why the ingestion thread stopped.
#[derive(Debug, Clone)]
pub struct IngestionExit {
    pub source: String,
    pub reason: String,
}

/// Spawn the task on its own thread. The receiver yields once when it ends.
pub fn spawn_ingestion<S>(task: IngestionTask<S>) -> io::Result<(JoinHandle<()>, Receiver<IngestionExit>)>
where
    S: CommandSource + 'static,
{
    let (tx, rx) = bounded(1);
    let source = task.source.name().to_string();

    let handle = thread::Builder::new()
        .name("ingestion".to_string())
        .spawn(move || {
            let reason = match task.run() {
                Ok(()) => "finished".to_string(),
                Err(e) => {
                    error!("[Ingest] {} failed: {}", source, e);
                    e.to_string()
                }
            };
            let _ = tx.try_send(IngestionExit { source, reason });
        })?;

    Ok((handle, rx))
}
