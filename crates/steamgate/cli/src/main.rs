//! steamgate CLI - Steam Guard codes from an isolated Steamworks worker.

mod code;
mod colors;
mod device;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use steamgate_core::config::DEFAULT_APP_ID;
use steamgate_core::{Backend, ExecutorConfig, SimulatedConfig};

#[derive(Parser)]
#[command(name = "steamgate")]
#[command(about = "Steam Guard codes from an isolated Steamworks worker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// App id to initialize the Steamworks library for
    #[arg(long, global = true, env = "STEAMGATE_APP_ID", default_value_t = DEFAULT_APP_ID)]
    app_id: u32,

    /// Path of libsteam_api
    #[arg(long, global = true, env = "STEAMGATE_STEAM_LIBRARY")]
    library: Option<PathBuf>,

    /// Path of the steamgate-worker binary
    #[arg(long, global = true, env = "STEAMGATE_WORKER_PATH")]
    worker: Option<PathBuf>,

    /// Use the simulated backend, reporting this server time
    #[arg(long, global = true, value_name = "T")]
    simulate_time: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current Steam Guard code
    Code {
        /// Base64 shared secret of the account
        #[arg(long, env = "STEAMGATE_SHARED_SECRET", hide_env_values = true)]
        secret: String,

        /// Compute offline for this server time instead of asking Steam
        #[arg(long, value_name = "T")]
        at: Option<u64>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the Steam server time
    Time,

    /// Read Steam Guard data from a rooted Android phone
    Device {
        #[command(subcommand)]
        command: DeviceCommands,
    },
}

#[derive(Subcommand)]
enum DeviceCommands {
    /// Print Steam Guard secrets
    Secrets {
        /// Path of the adb binary
        #[arg(long)]
        adb: PathBuf,

        /// Field to print (repeatable; defaults to shared and identity secret)
        #[arg(long = "field", value_name = "NAME")]
        fields: Vec<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the device id registered by the mobile app
    Id {
        /// Path of the adb binary
        #[arg(long)]
        adb: PathBuf,
    },
}

impl Cli {
    fn executor_config(&self) -> ExecutorConfig {
        let backend = match self.simulate_time {
            Some(time) => Backend::Simulated(SimulatedConfig::default().with_server_time(time)),
            None => Backend::Steamworks {
                library: self.library.clone(),
            },
        };

        let mut config = ExecutorConfig::new(self.app_id).with_backend(backend);
        if let Some(worker) = &self.worker {
            config = config.with_worker_path(worker);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Helper to format steamgate-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<steamgate_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    let config = cli.executor_config();
    match cli.command {
        Commands::Code { secret, at, json } => {
            // The executor blocks in bounded waits; keep it off the runtime threads.
            tokio::task::spawn_blocking(move || code::execute(config, &secret, at, json))
                .await?
                .map_err(format_error)?;
        }

        Commands::Time => {
            tokio::task::spawn_blocking(move || code::server_time(config))
                .await?
                .map_err(format_error)?;
        }

        Commands::Device { command } => match command {
            DeviceCommands::Secrets { adb, fields, json } => {
                device::secrets(&adb, &fields, json).await.map_err(format_error)?;
            }
            DeviceCommands::Id { adb } => {
                device::id(&adb).await.map_err(format_error)?;
            }
        },
    }

    Ok(())
}
