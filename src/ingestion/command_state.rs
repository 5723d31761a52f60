//! command_state.rs
//! Last-value-wins handoff between the ingestion thread and the control loop.
//!
//! - `publish` replaces speed and angle together; `read` copies both together.
//! - The critical section is the copy of one `Command` and nothing else, so
//!   neither side holds the lock across I/O or mapping work.
//! - No queue: a newer command overwrites an unread older one.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::ingestion::command::Command;

/// Handle to the shared command. Cloning hands out another reference to the
/// same slot, one for each task.
#[derive(Clone, Debug, Default)]
pub struct SharedCommandState {
    slot: Arc<Mutex<Command>>,
}

impl SharedCommandState {
    pub fn new(initial: Command) -> Self {
        Self {
            slot: Arc::new(Mutex::new(initial)),
        }
    }

    /// Atomically replace both fields.
    #[inline]
    pub fn publish(&self, command: Command) {
        *self.slot.lock() = command;
    }

    /// Atomically snapshot both fields.
    #[inline]
    pub fn read(&self) -> Command {
        *self.slot.lock()
    }
}
