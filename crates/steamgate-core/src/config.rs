//! Executor configuration.
//!
//! Everything the executor needs to spawn a worker: which app id to
//! initialize the native library for, which backend the worker should load,
//! where the worker binary lives, and the timeouts of the bounded waits.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::gateway::SimulatedConfig;
use crate::host::DEFAULT_POLL_TICK;
use crate::ipc::RemoteError;

/// Environment variable the Steamworks library reads its app id from.
/// Only ever set in the worker's environment.
pub const APP_ID_ENV: &str = "SteamAppId";

/// Overrides worker binary discovery.
pub const WORKER_PATH_ENV: &str = "STEAMGATE_WORKER_PATH";

/// Path of the Steamworks library to load.
pub const LIBRARY_ENV: &str = "STEAMGATE_STEAM_LIBRARY";

/// Default app id for [`ExecutorConfig::from_env`].
pub const DEFAULT_APP_ID_ENV: &str = "STEAMGATE_APP_ID";

/// Spacewar, the Steamworks example app every account can initialize.
pub const DEFAULT_APP_ID: u32 = 480;

/// Bounded wait for init and call outcomes.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded wait for the worker to exit during shutdown.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Which native gateway the worker process drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// The real Steamworks library; resolved by the worker when `None`.
    Steamworks { library: Option<PathBuf> },
    /// The in-memory simulation.
    Simulated(SimulatedConfig),
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Steamworks { library: None }
    }
}

impl Backend {
    /// Command-line arguments selecting this backend in `steamgate-worker`.
    pub fn worker_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            Backend::Steamworks { library } => {
                args.push("--backend".into());
                args.push("steamworks".into());
                if let Some(library) = library {
                    args.push("--library".into());
                    args.push(library.clone().into_os_string());
                }
            }
            Backend::Simulated(sim) => {
                args.push("--backend".into());
                args.push("simulated".into());
                if let Some(time) = sim.server_time {
                    args.push("--sim-server-time".into());
                    args.push(time.to_string().into());
                }
                if sim.refuse_init {
                    args.push("--sim-refuse-init".into());
                }
                if let Some(error) = &sim.init_error {
                    push_error(&mut args, "--sim-init-error", error);
                }
                if let Some(delay) = sim.init_delay {
                    args.push("--sim-init-delay-ms".into());
                    args.push(delay.as_millis().to_string().into());
                }
                if let Some(error) = &sim.call_error {
                    push_error(&mut args, "--sim-call-error", error);
                }
                if let Some(delay) = sim.call_delay {
                    args.push("--sim-call-delay-ms".into());
                    args.push(delay.as_millis().to_string().into());
                }
            }
        }
        args
    }
}

/// `--flag "Kind: message"`, plus `--flag-detail detail` when the error
/// carries one.
fn push_error(args: &mut Vec<OsString>, flag: &str, error: &RemoteError) {
    args.push(flag.into());
    args.push(format!("{}: {}", error.kind, error.message).into());
    if let Some(detail) = &error.detail {
        args.push(format!("{}-detail", flag).into());
        args.push(detail.into());
    }
}

/// Configuration of an [`Executor`](crate::execute::Executor).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Opaque identifier handed to the native library at init.
    pub app_id: u32,
    /// Gateway the worker drives.
    pub backend: Backend,
    /// Worker binary; discovered when `None`.
    pub worker_path: Option<PathBuf>,
    /// Bounded wait for init and call outcomes.
    pub response_timeout: Duration,
    /// Bounded wait for the worker to exit during shutdown.
    pub join_timeout: Duration,
    /// Upper bound on how long the worker loop blocks between exit checks.
    pub poll_tick: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_APP_ID)
    }
}

impl ExecutorConfig {
    pub fn new(app_id: u32) -> Self {
        Self {
            app_id,
            backend: Backend::default(),
            worker_path: None,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            poll_tick: DEFAULT_POLL_TICK,
        }
    }

    /// Build a configuration from `STEAMGATE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let app_id = match std::env::var(DEFAULT_APP_ID_ENV) {
            Ok(value) => value.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a number, got {:?}", DEFAULT_APP_ID_ENV, value))
            })?,
            Err(_) => DEFAULT_APP_ID,
        };

        let mut config = Self::new(app_id);
        if let Some(path) = std::env::var_os(WORKER_PATH_ENV) {
            config.worker_path = Some(PathBuf::from(path));
        }
        if let Some(path) = std::env::var_os(LIBRARY_ENV) {
            config.backend = Backend::Steamworks {
                library: Some(PathBuf::from(path)),
            };
        }
        Ok(config)
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_worker_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.worker_path = Some(path.into());
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn with_poll_tick(mut self, tick: Duration) -> Self {
        self.poll_tick = tick;
        self
    }

    /// Full argument list for `steamgate-worker`.
    pub fn worker_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--app-id".into(),
            self.app_id.to_string().into(),
            "--poll-tick-ms".into(),
            self.poll_tick.as_millis().max(1).to_string().into(),
        ];
        args.extend(self.backend.worker_args());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.app_id, 480);
        assert_eq!(config.response_timeout, Duration::from_secs(5));
        assert_eq!(config.join_timeout, Duration::from_secs(5));
        assert_eq!(config.backend, Backend::Steamworks { library: None });
    }

    #[test]
    fn test_steamworks_args() {
        let config = ExecutorConfig::new(730)
            .with_poll_tick(Duration::from_millis(20))
            .with_backend(Backend::Steamworks {
                library: Some(PathBuf::from("/opt/libsteam_api.so")),
            });

        assert_eq!(
            strings(config.worker_args()),
            [
                "--app-id",
                "730",
                "--poll-tick-ms",
                "20",
                "--backend",
                "steamworks",
                "--library",
                "/opt/libsteam_api.so"
            ]
        );
    }

    #[test]
    fn test_simulated_args() {
        let sim = SimulatedConfig::default()
            .with_server_time(30)
            .with_call_error(RemoteError::new("ValueError", "boom"))
            .with_call_delay(Duration::from_millis(250));
        let args = strings(Backend::Simulated(sim).worker_args());

        assert_eq!(
            args,
            [
                "--backend",
                "simulated",
                "--sim-server-time",
                "30",
                "--sim-call-error",
                "ValueError: boom",
                "--sim-call-delay-ms",
                "250"
            ]
        );
    }

    #[test]
    fn test_simulated_init_args_keep_detail() {
        let sim = SimulatedConfig::default()
            .with_init_error(
                RemoteError::new("SymbolMissing", "not exported").with_detail("SteamAPI_Init"),
            )
            .with_init_delay(Duration::from_secs(2));
        let args = strings(Backend::Simulated(sim).worker_args());

        assert_eq!(
            args,
            [
                "--backend",
                "simulated",
                "--sim-init-error",
                "SymbolMissing: not exported",
                "--sim-init-error-detail",
                "SteamAPI_Init",
                "--sim-init-delay-ms",
                "2000"
            ]
        );
    }

    #[test]
    fn test_sub_millisecond_tick_is_clamped() {
        let config = ExecutorConfig::default().with_poll_tick(Duration::from_micros(10));
        let args = strings(config.worker_args());
        assert_eq!(args[3], "1");
    }
}
