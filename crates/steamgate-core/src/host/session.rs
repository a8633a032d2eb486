//! Scoped ownership of the initialized native library.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::gateway::NativeGateway;
use crate::ipc::{RemoteError, Request, Response};

use super::panic_error;
use super::stdio::SilencedStderr;

/// An initialized native library.
///
/// Native shutdown runs exactly once: on [`NativeSession::shutdown`] or on
/// drop, whichever comes first. Execution after shutdown fails with
/// `LibraryShutDown` instead of reaching the library.
pub struct NativeSession<'g, G: NativeGateway> {
    gateway: &'g mut G,
    active: bool,
}

impl<'g, G: NativeGateway> NativeSession<'g, G> {
    /// Initialize the library with its diagnostic output silenced.
    pub fn open(gateway: &'g mut G, app_id: u32) -> Result<Self, RemoteError> {
        let initialized = {
            let _quiet = SilencedStderr::new();
            catch_unwind(AssertUnwindSafe(|| gateway.init(app_id)))
        };

        match initialized {
            Ok(Ok(true)) => Ok(Self {
                gateway,
                active: true,
            }),
            Ok(Ok(false)) => Err(RemoteError::new(
                "InitializationRefused",
                format!("native library refused to initialize for app {}", app_id),
            )),
            Ok(Err(error)) => Err(error),
            Err(payload) => Err(panic_error(payload)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Run one request. Panics inside the gateway become `panic` errors.
    pub fn execute(&mut self, request: &Request) -> Result<Response, RemoteError> {
        if !self.active {
            return Err(RemoteError::new(
                "LibraryShutDown",
                format!("cannot run {}: native library was shut down", request.name()),
            ));
        }

        let gateway = &mut *self.gateway;
        match catch_unwind(AssertUnwindSafe(|| gateway.execute(request))) {
            Ok(outcome) => outcome,
            Err(payload) => Err(panic_error(payload)),
        }
    }

    /// Shut the library down. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        tracing::debug!("Shutting down native library");
        if catch_unwind(AssertUnwindSafe(|| self.gateway.shutdown())).is_err() {
            tracing::warn!("Native library panicked during shutdown");
        }
    }
}

impl<G: NativeGateway> Drop for NativeSession<'_, G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
