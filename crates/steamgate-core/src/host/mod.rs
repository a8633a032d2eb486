//! Worker-side runtime: owns the native library and runs the message loop.
//!
//! The loop is transport-agnostic. It talks to [`WorkerEnds`] only; the
//! `steamgate-worker` binary wires those ends to stdin/stdout through the
//! bridge, and tests drive them directly from another thread.

mod session;
pub mod stdio;

pub use session::NativeSession;

use std::any::Any;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use crate::gateway::NativeGateway;
use crate::ipc::{ExitSignal, InitReport, RemoteError, WorkerCommand, WorkerEnds};

/// Default upper bound on how long the loop blocks between exit checks.
pub const DEFAULT_POLL_TICK: Duration = Duration::from_millis(50);

/// Why the message loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Native init failed; the loop never ran.
    InitFailed,
    /// The exit signal was observed.
    ExitSignaled,
    /// A call failed; the error was delivered and the worker stops.
    CallFailed,
    /// The command channel closed.
    Disconnected,
}

impl LoopExit {
    /// Process exit code for the worker binary.
    pub fn exit_code(self) -> i32 {
        match self {
            LoopExit::ExitSignaled | LoopExit::Disconnected => 0,
            LoopExit::InitFailed => 1,
            LoopExit::CallFailed => 2,
        }
    }
}

/// Initialize the native library and serve requests until told to stop.
///
/// Exactly one init outcome is sent. After a successful init, every `Call`
/// produces exactly one outcome; a failed call ends the loop. Native
/// shutdown runs on every path that initialized the library.
pub fn run_worker<G: NativeGateway>(
    gateway: &mut G,
    app_id: u32,
    ends: WorkerEnds,
    exit: &ExitSignal,
    tick: Duration,
) -> LoopExit {
    let WorkerEnds {
        call_request,
        init_result,
        init_error,
        call_result,
        call_error,
    } = ends;

    let mut session = match NativeSession::open(gateway, app_id) {
        Ok(session) => session,
        Err(error) => {
            tracing::warn!("Native init failed: {}", error);
            let _ = init_error.send(error);
            return LoopExit::InitFailed;
        }
    };
    let _ = init_result.send(InitReport { app_id });
    tracing::info!("Native library ready for app {}", app_id);

    loop {
        if exit.is_set() {
            tracing::debug!("Exit signal observed");
            return LoopExit::ExitSignaled;
        }

        match call_request.recv_timeout(tick) {
            Ok(WorkerCommand::Call(request)) => {
                tracing::debug!("Executing {}", request.name());
                match session.execute(&request) {
                    Ok(response) => {
                        if call_result.send(response).is_err() {
                            return LoopExit::Disconnected;
                        }
                    }
                    Err(error) => {
                        tracing::warn!("{} failed: {}", request.name(), error);
                        let _ = call_error.send(error);
                        return LoopExit::CallFailed;
                    }
                }
            }
            Ok(WorkerCommand::Teardown) => session.shutdown(),
            Ok(WorkerCommand::Exit) => exit.set(),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return LoopExit::Disconnected,
        }
    }
}

/// Convert a caught panic payload into a transportable error.
pub(crate) fn panic_error(payload: Box<dyn Any + Send>) -> RemoteError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    RemoteError::new("panic", message)
}
