//! Error types for steamgate-core.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::execute::Lifecycle;
use crate::ipc::RemoteError;

/// Result type for steamgate-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in steamgate-core.
#[derive(Debug, Error)]
pub enum Error {
    /// The native library refused to initialize inside the worker.
    #[error("native library failed to initialize: {0}")]
    InitializationFailed(RemoteError),

    /// The worker executed a request and the native library raised.
    #[error("remote error: {0}")]
    Remote(RemoteError),

    /// Neither a result nor an error arrived in time.
    #[error("no response from worker after {waited:?}")]
    NoResponse { waited: Duration },

    /// A call was issued while the executor was not ready.
    #[error("executor is not ready (state: {0})")]
    NotReady(Lifecycle),

    /// `init` was issued on an executor that is already running.
    #[error("executor already started (state: {0})")]
    AlreadyStarted(Lifecycle),

    /// Failed to spawn the worker process.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// IPC communication error with the worker process.
    #[error("IPC error: {0}")]
    Ipc(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The worker answered with a response of the wrong kind.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The shared secret is not valid base64.
    #[error("invalid shared secret: {0}")]
    InvalidSecret(String),

    /// Failed to load the native library.
    #[error("failed to load library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// Device bridge failure.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the only way forward is `shutdown()` followed by `init()`.
    pub fn requires_restart(&self) -> bool {
        matches!(self, Error::NoResponse { .. } | Error::Remote(_))
    }

    /// Render the error with a recovery hint for interactive use.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Error::InitializationFailed(_) => {
                Some("check that Steam is running and that the app id is valid")
            }
            Error::Remote(_) => Some("the worker has exited; restart the executor"),
            Error::NoResponse { .. } => {
                Some("the worker hung or crashed; call shutdown() and init() again")
            }
            Error::NotReady(_) => Some("call init() before issuing requests"),
            Error::Spawn(_) => {
                Some("set STEAMGATE_WORKER_PATH or install steamgate-worker next to steamgate")
            }
            Error::LibraryLoad(_) => {
                Some("set STEAMGATE_STEAM_LIBRARY to the path of libsteam_api")
            }
            Error::InvalidSecret(_) => Some("the shared secret must be standard base64"),
            Error::Device(DeviceError::DeviceNotFound) => {
                Some("connect the phone and enable USB debugging")
            }
            Error::Device(DeviceError::RootUnavailable) => {
                Some("the phone may reconnect while adb switches to root mode")
            }
            _ => None,
        };

        match hint {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}

/// Errors raised by the Android debug bridge helper.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("unable to find adb at {}", .0.display())]
    AdbNotFound(PathBuf),

    #[error("phone is not connected")]
    DeviceNotFound,

    #[error("root is not available")]
    RootUnavailable,

    #[error("user is not logged in on the mobile authenticator")]
    NotLoggedIn,

    #[error("Steam Guard is not enabled")]
    GuardNotEnabled,

    #[error("file not found on device: {0}")]
    FileMissing(String),

    #[error("field `{0}` not present in Steam Guard data")]
    MissingField(String),

    #[error("malformed device file: {0}")]
    Malformed(String),

    #[error("adb {args:?} exited with {status}: {stderr}")]
    Command {
        args: Vec<String>,
        status: String,
        stderr: String,
    },

    #[error("failed to run adb: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_classification() {
        let remote = Error::Remote(RemoteError::new("ValueError", "boom"));
        let timeout = Error::NoResponse {
            waited: Duration::from_secs(5),
        };
        let not_ready = Error::NotReady(Lifecycle::Created);

        assert!(remote.requires_restart());
        assert!(timeout.requires_restart());
        assert!(!not_ready.requires_restart());
    }

    #[test]
    fn test_hint_rendering() {
        let err = Error::NoResponse {
            waited: Duration::from_millis(200),
        };
        let rendered = err.with_hint();
        assert!(rendered.starts_with("no response from worker"));
        assert!(rendered.contains("hint: "));

        let plain = Error::Ipc("closed".to_string());
        assert_eq!(plain.with_hint(), "IPC error: closed");
    }
}
