//! control_loop.rs
//! Fixed-period drive task.
//!
//! Each tick snapshots the shared command, compares it field by field with
//! what was last applied, and only rewrites the actuators whose input changed:
//! a speed-only change never touches the servo and vice versa.
//!
//! Two states: `Running` → `ShuttingDown` (terminal). Leaving `Running` drives
//! every output to neutral exactly once, whether the loop ended by interrupt,
//! by the self-test countdown, or by unwinding through `Drop`.

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use spin_sleep::{SpinSleeper, SpinStrategy};
use thread_priority::{ThreadBuilderExt, ThreadPriority};

use crate::actuation::{
    mapping::{DriveSignal, MappingPolicy, SteerSignal, drive, turn},
    port::{ActuatorPort, apply_drive, apply_neutral},
};
use crate::ingestion::{command::Command, command_state::SharedCommandState};
use crate::utils::{metrics::LoopMetrics, shutdown::ShutdownSignal};

pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);
pub const DEFAULT_SELF_TEST_TICKS: u32 = 100;
/// Speed forced during self-test.
pub const SELF_TEST_SPEED: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ShuttingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Interrupted,
    SelfTestComplete,
}

/// Values last written to the actuators. Owned by the loop, never shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub last_applied_speed: i32,
    pub last_applied_angle: i32,
}

impl From<Command> for ControlState {
    fn from(c: Command) -> Self {
        Self {
            last_applied_speed: c.speed,
            last_applied_angle: c.angle,
        }
    }
}

/// What one tick wrote, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    pub drive: Option<DriveSignal>,
    pub steer: Option<SteerSignal>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.drive.is_none() && self.steer.is_none()
    }
}

pub struct ControlLoop<P: ActuatorPort> {
    commands: SharedCommandState,
    port: P,
    policy: MappingPolicy,
    control: ControlState,
    period: Duration,
    self_test_remaining: Option<u32>,
    phase: LoopState,
    metrics: Arc<LoopMetrics>,
}

impl<P: ActuatorPort> ControlLoop<P> {
    /// The port is assumed to already be in its neutral start-up state, which
    /// matches the neutral default command, so nothing is written until a
    /// command differs from it.
    pub fn new(
        commands: SharedCommandState,
        port: P,
        policy: MappingPolicy,
        period: Duration,
        metrics: Arc<LoopMetrics>,
    ) -> Self {
        Self {
            commands,
            port,
            policy,
            control: ControlState::from(Command::default()),
            period,
            self_test_remaining: None,
            phase: LoopState::Running,
            metrics,
        }
    }

    /// Force full speed and stop by itself after `ticks` ticks.
    pub fn with_self_test(mut self, ticks: u32) -> Self {
        self.self_test_remaining = Some(ticks);
        self
    }

    pub fn state(&self) -> LoopState {
        self.phase
    }

    pub fn control_state(&self) -> ControlState {
        self.control
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// One control cycle. No-op once shutting down.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if self.phase != LoopState::Running {
            return report;
        }
        self.metrics.record_tick();

        let mut command = self.commands.read();
        if self.self_test_remaining.is_some() {
            command.speed = SELF_TEST_SPEED;
        }

        if command.speed != self.control.last_applied_speed {
            let signal = drive(command.speed, &self.policy.drive);
            apply_drive(&mut self.port, &signal);
            self.control.last_applied_speed = command.speed;
            self.metrics.record_drive_write();
            report.drive = Some(signal);
        }

        if command.angle != self.control.last_applied_angle {
            let signal = turn(command.angle, &self.policy.steer);
            self.port.set_steer_pulse_width(signal.pulse_ratio);
            self.control.last_applied_angle = command.angle;
            self.metrics.record_steer_write();
            report.steer = Some(signal);
        }

        if !report.is_idle() {
            info!("[Control] speed: {}, angle: {}", command.speed, command.angle);
        }
        report
    }

    /// Tick on a fixed period until interrupted or the self-test runs out,
    /// then shut down.
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> ExitReason {
        let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
        let mut next_release = Instant::now();

        info!("[Control] Running, period {:?}", self.period);

        let reason = loop {
            if shutdown.is_requested() {
                break ExitReason::Interrupted;
            }
            if self.self_test_remaining == Some(0) {
                break ExitReason::SelfTestComplete;
            }

            self.tick();

            if let Some(remaining) = self.self_test_remaining.as_mut() {
                *remaining -= 1;
                debug!(
                    "[Control] Self-test remaining time: {:.1}s",
                    self.period.as_secs_f64() * *remaining as f64
                );
            }

            next_release += self.period;
            let now = Instant::now();
            if now < next_release {
                sleeper.sleep(next_release - now);
            } else {
                // Overran the period; start a fresh schedule instead of bursting.
                self.metrics.record_late_tick();
                next_release = now;
            }
        };

        info!("[Control] Leaving run loop: {:?}", reason);
        self.shutdown();
        reason
    }

    /// Enter `ShuttingDown` and neutralize the outputs. Returns `false` if
    /// that already happened.
    pub fn shutdown(&mut self) -> bool {
        if self.phase == LoopState::ShuttingDown {
            return false;
        }
        self.phase = LoopState::ShuttingDown;
        info!("[Control] Driving outputs to neutral");
        apply_neutral(&mut self.port);
        true
    }
}

impl<P: ActuatorPort> Drop for ControlLoop<P> {
    fn drop(&mut self) {
        if self.shutdown() {
            warn!("[Control] Neutralized outputs on drop");
        }
    }
}

/// Run the loop on its own max-priority thread, optionally pinned to a core.
pub fn spawn_control_loop<P>(
    mut control: ControlLoop<P>,
    shutdown: ShutdownSignal,
    pin_core: Option<usize>,
) -> io::Result<JoinHandle<ExitReason>>
where
    P: ActuatorPort + Send + 'static,
{
    thread::Builder::new()
        .name("control".to_string())
        .spawn_with_priority(ThreadPriority::Max, move |priority| {
            if let Err(e) = priority {
                warn!("[Control] Running at default priority: {:?}", e);
            }

            if let Some(core) = pin_core {
                let core_ids = core_affinity::get_core_ids().unwrap_or_default();
                match core_ids.get(core) {
                    Some(id) if core_affinity::set_for_current(*id) => {
                        info!("[Control] Pinned to core {}", core);
                    }
                    Some(_) => warn!("[Control] Failed to pin to core {}", core),
                    None => warn!("[Control] Core {} not found among available cores", core),
                }
            }

            control.run(&shutdown)
        })
}
