//! steamgate-worker - hosts the Steamworks library for one executor.
//!
//! Spawned by `Executor::init`. Commands arrive as length-prefixed frames on
//! stdin, outcomes leave on stdout. Everything else the process or the native
//! library prints goes to stderr, which the parent inherits.
//!
//! Exit codes: 0 clean exit, 1 init failed, 2 a call failed, 3 startup
//! failure.

use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use steamgate_core::gateway::{NativeGateway, SimulatedConfig, SimulatedGateway, SteamworksGateway};
use steamgate_core::host::{LoopExit, run_worker, stdio};
use steamgate_core::ipc::{ExitSignal, RemoteError, bridge, channel_set};
use steamgate_core::paths::resolve_steam_library;

const STARTUP_FAILURE: i32 = 3;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendKind {
    Steamworks,
    Simulated,
}

#[derive(Parser)]
#[command(name = "steamgate-worker")]
#[command(about = "Worker process hosting the Steamworks library")]
#[command(version)]
struct Args {
    /// App id to initialize the library for
    #[arg(long, env = "SteamAppId")]
    app_id: u32,

    /// Upper bound on how long the loop blocks between exit checks
    #[arg(long, default_value_t = 50)]
    poll_tick_ms: u64,

    /// Native gateway to drive
    #[arg(long, value_enum, default_value = "steamworks")]
    backend: BackendKind,

    /// Path of libsteam_api
    #[arg(long)]
    library: Option<PathBuf>,

    /// Fixed server time for the simulated backend
    #[arg(long)]
    sim_server_time: Option<u64>,

    /// Make simulated init return false
    #[arg(long)]
    sim_refuse_init: bool,

    /// Make simulated init raise `Kind: message`
    #[arg(long)]
    sim_init_error: Option<RemoteError>,

    /// Detail attached to `--sim-init-error`
    #[arg(long, requires = "sim_init_error")]
    sim_init_error_detail: Option<String>,

    /// Stall simulated init this long
    #[arg(long)]
    sim_init_delay_ms: Option<u64>,

    /// Make every simulated call raise `Kind: message`
    #[arg(long)]
    sim_call_error: Option<RemoteError>,

    /// Detail attached to `--sim-call-error`
    #[arg(long, requires = "sim_call_error")]
    sim_call_error_detail: Option<String>,

    /// Stall each simulated call this long
    #[arg(long)]
    sim_call_delay_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn simulated_config(&self) -> SimulatedConfig {
        SimulatedConfig {
            server_time: self.sim_server_time,
            refuse_init: self.sim_refuse_init,
            init_error: with_detail(&self.sim_init_error, &self.sim_init_error_detail),
            init_delay: self.sim_init_delay_ms.map(Duration::from_millis),
            call_error: with_detail(&self.sim_call_error, &self.sim_call_error_detail),
            call_delay: self.sim_call_delay_ms.map(Duration::from_millis),
        }
    }

    fn open_gateway(&self) -> steamgate_core::Result<Box<dyn NativeGateway>> {
        Ok(match self.backend {
            BackendKind::Steamworks => {
                let path = resolve_steam_library(self.library.as_deref());
                tracing::debug!("Loading {}", path.display());
                Box::new(SteamworksGateway::load(&path)?)
            }
            BackendKind::Simulated => Box::new(SimulatedGateway::new(self.simulated_config())),
        })
    }
}

fn with_detail(error: &Option<RemoteError>, detail: &Option<String>) -> Option<RemoteError> {
    let error = error.clone()?;
    Some(match detail {
        Some(detail) => error.with_detail(detail.clone()),
        None => error,
    })
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let code = match run(&args) {
        Ok(exit) => {
            tracing::debug!("Worker finished: {:?}", exit);
            exit.exit_code()
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            STARTUP_FAILURE
        }
    };
    process::exit(code);
}

fn run(args: &Args) -> anyhow::Result<LoopExit> {
    // Nothing may reach fd 1 except IPC frames from here on.
    let output = stdio::claim_stdout().context("failed to claim stdout for IPC")?;

    let exit = ExitSignal::new();
    let (local, ends) = channel_set();
    let (commands, events) = local.into_parts();

    let router_exit = exit.clone();
    thread::Builder::new()
        .name("steamgate-commands".to_string())
        .spawn(move || bridge::route_commands(std::io::stdin().lock(), commands, router_exit))
        .context("failed to spawn command router")?;

    let pump = thread::Builder::new()
        .name("steamgate-events".to_string())
        .spawn(move || bridge::pump_events(events, output))
        .context("failed to spawn event pump")?;

    let outcome = match args.open_gateway() {
        Ok(mut gateway) => run_worker(
            &mut gateway,
            args.app_id,
            ends,
            &exit,
            Duration::from_millis(args.poll_tick_ms.max(1)),
        ),
        Err(e) => {
            tracing::warn!("Native library unavailable: {}", e);
            let _ = ends.init_error.send(RemoteError::new("LibraryLoad", e.to_string()));
            drop(ends);
            LoopExit::InitFailed
        }
    };

    // All event senders are gone; wait for the pump to flush them.
    if pump.join().is_err() {
        anyhow::bail!("event pump panicked");
    }
    Ok(outcome)
}
