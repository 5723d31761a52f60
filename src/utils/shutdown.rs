//! Cooperative shutdown token.
//!
//! The interrupt handler only flips a flag; the control loop checks it at tick
//! boundaries and performs the neutral actuation itself.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use log::info;

#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Route SIGINT/SIGTERM into this token. Can only be installed once per process.
    pub fn install_interrupt_handler(&self) -> Result<(), ctrlc::Error> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            if !token.is_requested() {
                info!("[Main] Interrupt received, shutting down");
            }
            token.request();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_the_request() {
        let a = ShutdownSignal::new();
        let b = a.clone();
        assert!(!b.is_requested());
        a.request();
        assert!(b.is_requested());
    }
}
