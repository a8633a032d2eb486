//! In-memory stand-in for the Steamworks library.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::ipc::{RemoteError, Request, Response};

use super::NativeGateway;

/// Steam id reported by the simulated user.
pub const SIMULATED_STEAM_ID: u64 = 76_561_197_960_265_728;

/// Behavior of a [`SimulatedGateway`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedConfig {
    /// Fixed server time; the wall clock when `None`.
    pub server_time: Option<u64>,
    /// Make `init` return `false`.
    pub refuse_init: bool,
    /// Make `init` raise this error.
    pub init_error: Option<RemoteError>,
    /// Sleep this long inside `init`.
    pub init_delay: Option<Duration>,
    /// Make every call raise this error.
    pub call_error: Option<RemoteError>,
    /// Sleep this long before answering each call.
    pub call_delay: Option<Duration>,
}

impl SimulatedConfig {
    pub fn with_server_time(mut self, server_time: u64) -> Self {
        self.server_time = Some(server_time);
        self
    }

    pub fn refusing_init(mut self) -> Self {
        self.refuse_init = true;
        self
    }

    pub fn with_init_error(mut self, error: RemoteError) -> Self {
        self.init_error = Some(error);
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = Some(delay);
        self
    }

    pub fn with_call_error(mut self, error: RemoteError) -> Self {
        self.call_error = Some(error);
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }
}

/// Gateway that answers from a [`SimulatedConfig`].
#[derive(Debug)]
pub struct SimulatedGateway {
    config: SimulatedConfig,
    app_id: Option<u32>,
}

impl SimulatedGateway {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            app_id: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.app_id.is_some()
    }

    fn server_time(&self) -> u64 {
        self.config.server_time.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default()
        })
    }
}

impl NativeGateway for SimulatedGateway {
    fn init(&mut self, app_id: u32) -> Result<bool, RemoteError> {
        if let Some(delay) = self.config.init_delay {
            std::thread::sleep(delay);
        }
        if let Some(error) = &self.config.init_error {
            return Err(error.clone());
        }
        if self.config.refuse_init {
            return Ok(false);
        }
        self.app_id = Some(app_id);
        Ok(true)
    }

    fn shutdown(&mut self) {
        self.app_id = None;
    }

    fn execute(&mut self, request: &Request) -> Result<Response, RemoteError> {
        if let Some(delay) = self.config.call_delay {
            std::thread::sleep(delay);
        }
        if let Some(error) = &self.config.call_error {
            return Err(error.clone());
        }
        let app_id = self.app_id.ok_or_else(|| {
            RemoteError::new("NotInitialized", "simulated library is not initialized")
        })?;

        Ok(match request {
            Request::ServerTime => Response::ServerTime(self.server_time()),
            Request::AppId => Response::AppId(app_id),
            Request::LoggedOn => Response::LoggedOn(true),
            Request::SteamId => Response::SteamId(SIMULATED_STEAM_ID),
        })
    }
}
