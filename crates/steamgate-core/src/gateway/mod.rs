//! Native library gateways.
//!
//! The worker only knows the native library through [`NativeGateway`]: an
//! init/shutdown pair with process-wide effect, plus a closed set of
//! operations described by [`Request`]. Anything that can be phrased as "run
//! this and report success or error" is schedulable through the executor.
//!
//! - [`SteamworksGateway`] loads `libsteam_api` and calls its flat C API.
//! - [`SimulatedGateway`] answers from configuration; used by tests and dry
//!   runs where no Steam client is available.

mod simulated;
mod steamworks;

pub use simulated::{SIMULATED_STEAM_ID, SimulatedConfig, SimulatedGateway};
pub use steamworks::SteamworksGateway;

use crate::ipc::{RemoteError, Request, Response};

/// A native library with process-wide state.
///
/// Implementations are driven by a single thread inside the worker process
/// and never need to be `Sync`.
pub trait NativeGateway {
    /// Initialize the library for `app_id`. `Ok(false)` means the library
    /// refused without raising.
    fn init(&mut self, app_id: u32) -> Result<bool, RemoteError>;

    /// Tear the library down. Callers guarantee at most one call per
    /// successful `init`.
    fn shutdown(&mut self);

    /// Execute one operation against the initialized library.
    fn execute(&mut self, request: &Request) -> Result<Response, RemoteError>;
}

impl<G: NativeGateway + ?Sized> NativeGateway for Box<G> {
    fn init(&mut self, app_id: u32) -> Result<bool, RemoteError> {
        (**self).init(app_id)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }

    fn execute(&mut self, request: &Request) -> Result<Response, RemoteError> {
        (**self).execute(request)
    }
}
