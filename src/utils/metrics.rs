//! Loop counters for the running vehicle.
//!
//! Both threads bump plain atomic counters (no lock, no queue) so recording
//! never delays a tick or a publish. `snapshot()` is read once at shutdown and
//! logged as a summary line.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
pub struct LoopMetrics {
    ticks: AtomicU64,
    late_ticks: AtomicU64,
    drive_writes: AtomicU64,
    steer_writes: AtomicU64,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl LoopMetrics {
    #[inline]
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// A tick released after its scheduled time.
    #[inline]
    pub fn record_late_tick(&self) {
        self.late_ticks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_drive_write(&self) {
        self.drive_writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_steer_write(&self) {
        self.steer_writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            late_ticks: self.late_ticks.load(Ordering::Relaxed),
            drive_writes: self.drive_writes.load(Ordering::Relaxed),
            steer_writes: self.steer_writes.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub late_ticks: u64,
    pub drive_writes: u64,
    pub steer_writes: u64,
    pub published: u64,
    pub dropped: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticks={} late={} drive_writes={} steer_writes={} published={} dropped={}",
            self.ticks, self.late_ticks, self.drive_writes, self.steer_writes, self.published, self.dropped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let m = LoopMetrics::default();
        m.record_tick();
        m.record_tick();
        m.record_late_tick();
        m.record_drive_write();
        m.record_published();
        m.record_published();
        m.record_published();

        let s = m.snapshot();
        assert_eq!(s.ticks, 2);
        assert_eq!(s.late_ticks, 1);
        assert_eq!(s.drive_writes, 1);
        assert_eq!(s.steer_writes, 0);
        assert_eq!(s.published, 3);
        assert_eq!(s.dropped, 0);
        assert_eq!(
            s.to_string(),
            "ticks=2 late=1 drive_writes=1 steer_writes=0 published=3 dropped=0"
        );
    }
}
