//! # RC Drive Entry Point
//!
//! Drives a remotely controlled car from either a multicast command stream or a
//! local joystick.
//!
//! ## Threads
//! - **Ingestion:** blocks on the command source, publishes (speed, angle) into
//!   the shared command state. Allowed to die; the car keeps its last command.
//! - **Control:** max priority, 100 ms fixed period, rewrites only the actuators
//!   whose input changed. Neutralizes the outputs exactly once on the way out.
//! - **Main:** supervises both and logs the run summary.
//!
//! ## Exit
//! Ctrl+C / SIGTERM, or the end of the `--debug` self-test, neutralizes the car
//! and exits 0. Start-up failures exit non-zero.

use std::{path::PathBuf, sync::Arc, thread, time::Duration};

use anyhow::{Context, anyhow};
use clap::Parser;
use crossbeam::channel::RecvTimeoutError;
use log::{error, info, warn};

use rc_drive::{
    actuation::{
        control_loop::{ControlLoop, spawn_control_loop},
        port::{ActuatorPort, LoggingPort},
    },
    ingestion::{
        command::Command,
        command_state::SharedCommandState,
        joystick::JoystickSource,
        multicast::MulticastSource,
        source::CommandSource,
        task::{IngestionTask, spawn_ingestion},
    },
    utils::{
        config::{ActuatorConfig, Backend, Config, SourceConfig, SourceKind},
        metrics::LoopMetrics,
        shutdown::ShutdownSignal,
    },
};

const SUPERVISE_POLL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "rc_drive", about = "rc car motor controller")]
struct Args {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Max motors on a timer, then stop
    #[arg(long)]
    debug: bool,

    /// Override the configured command source
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// Override the joystick device path
    #[arg(long)]
    device: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("=== RC DRIVE START ===");

    let mut config = Config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(kind) = args.source {
        config.source.kind = kind;
    }
    if let Some(device) = args.device {
        config.source.device = device;
    }

    let commands = SharedCommandState::new(Command::default());
    let metrics = Arc::new(LoopMetrics::default());
    let shutdown = ShutdownSignal::new();
    shutdown
        .install_interrupt_handler()
        .context("Failed to install interrupt handler")?;

    // Built before the source so a failed source open still neutralizes the port on drop.
    let policy = config.mapping.policy(config.source.kind);
    info!("[Main] Source {:?}, mapping {:?}", config.source.kind, config.mapping.profile_for(config.source.kind));
    let mut control = ControlLoop::new(
        commands.clone(),
        open_port(&config.actuator)?,
        policy,
        config.control.period(),
        metrics.clone(),
    );
    if args.debug {
        info!("[Main] Self-test: full speed for {} ticks", config.control.self_test_ticks);
        control = control.with_self_test(config.control.self_test_ticks);
    }

    let source = open_source(&config.source)?;
    let (_ingestion, ingestion_exit) = spawn_ingestion(IngestionTask::new(
        source,
        commands,
        config.source.burst_cap,
        metrics.clone(),
    ))
    .context("Failed to spawn ingestion thread")?;

    let control_handle =
        spawn_control_loop(control, shutdown, config.control.pin_core).context("Failed to spawn control thread")?;

    // The ingestion thread is never joined: its blocking read is abandoned at exit.
    let mut exits = Some(ingestion_exit);
    while !control_handle.is_finished() {
        match exits.as_ref().map(|rx| rx.recv_timeout(SUPERVISE_POLL)) {
            Some(Ok(exit)) => {
                error!("[Main] Ingestion from {} stopped ({}); holding last command", exit.source, exit.reason);
                exits = None;
            }
            Some(Err(RecvTimeoutError::Disconnected)) => exits = None,
            Some(Err(RecvTimeoutError::Timeout)) => {}
            None => thread::sleep(SUPERVISE_POLL),
        }
    }

    let reason = control_handle
        .join()
        .map_err(|_| anyhow!("control thread panicked"))?;

    info!("[Main] Stopped: {:?}", reason);
    info!("[Main] {}", metrics.snapshot());
    info!("=== RC DRIVE FINISHED ===");
    Ok(())
}

fn open_port(config: &ActuatorConfig) -> anyhow::Result<Box<dyn ActuatorPort + Send>> {
    match config.backend {
        Backend::Log => {
            warn!("[Main] Logging actuator backend: no pins will be driven");
            Ok(Box::new(LoggingPort))
        }
        #[cfg(feature = "gpio")]
        Backend::Gpio => {
            let port = rc_drive::actuation::gpio::GpioPort::open(config).context("Failed to claim GPIO pins")?;
            Ok(Box::new(port))
        }
        #[cfg(not(feature = "gpio"))]
        Backend::Gpio => Err(anyhow!("GPIO backend requested but built without the `gpio` feature")),
    }
}

fn open_source(config: &SourceConfig) -> anyhow::Result<Box<dyn CommandSource>> {
    let source: Box<dyn CommandSource> = match config.kind {
        SourceKind::Multicast => Box::new(
            MulticastSource::join(config.group, config.port, config.interface, config.max_datagram)
                .with_context(|| format!("Failed to join multicast group {}:{}", config.group, config.port))?,
        ),
        SourceKind::Joystick => Box::new(
            JoystickSource::open(&config.device, config.axis_map())
                .with_context(|| format!("Failed to open input device {:?}", config.device))?,
        ),
    };
    Ok(source)
}
