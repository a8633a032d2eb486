//! Process-isolated executor for the native library.

use std::fmt;
use std::time::Duration;

use crate::config::ExecutorConfig;
use crate::error::{Error, Result};
use crate::ipc::{
    ExecutorEnds, ExitSignal, InitReport, Request, Response, WorkerCommand, WorkerHandle,
    bounded_wait, channel_set, discard_stale,
};

use super::operation::{Operation, ServerTime};

/// Lifecycle of an [`Executor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, no worker yet.
    Created,
    /// Worker spawned, init in flight.
    Started,
    /// Init succeeded; calls are accepted.
    Ready,
    /// Init failed or timed out; only `shutdown` is meaningful.
    Faulted,
    /// Exit has been signaled.
    ShuttingDown,
    /// Worker joined and resources released.
    Stopped,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Created => "created",
            Lifecycle::Started => "started",
            Lifecycle::Ready => "ready",
            Lifecycle::Faulted => "faulted",
            Lifecycle::ShuttingDown => "shutting-down",
            Lifecycle::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Runs native operations in an isolated worker process.
///
/// The native library keeps process-wide state and is not reentrant, so it
/// lives in a dedicated `steamgate-worker` process for the whole lifecycle:
///
/// - `init` spawns the worker and waits (bounded) for the library to come up
/// - `call` sends one request and waits (bounded) for its outcome
/// - `shutdown` signals exit, joins the worker (bounded) and releases it
///
/// Only one call may be in flight: the protocol carries no request ids.
/// `call` takes `&mut self`, so sharing an executor between threads needs a
/// `Mutex` around it.
///
/// After a `Remote` error the worker has exited, and after `NoResponse` its
/// state is unknown. Either way recovery is `shutdown()` then `init()`. A
/// late answer to a call that timed out is discarded by the next call.
pub struct Executor {
    config: ExecutorConfig,
    exit: ExitSignal,
    state: Lifecycle,
    /// Executor-side channel ends; present between init and shutdown.
    ends: Option<ExecutorEnds>,
    worker: Option<WorkerHandle>,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            exit: ExitSignal::new(),
            state: Lifecycle::Created,
            ends: None,
            worker: None,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn exit_signal(&self) -> &ExitSignal {
        &self.exit
    }

    /// Process ID of the current worker, if one is attached.
    pub fn pid(&self) -> Option<u32> {
        self.worker.as_ref().map(WorkerHandle::pid)
    }

    /// Whether the worker process is still running.
    pub fn is_worker_alive(&mut self) -> bool {
        self.worker.as_mut().is_some_and(WorkerHandle::is_alive)
    }

    /// Spawn the worker and wait for the native library to initialize.
    pub fn init(&mut self) -> Result<InitReport> {
        match self.state {
            Lifecycle::Created | Lifecycle::Stopped => {}
            state => return Err(Error::AlreadyStarted(state)),
        }

        self.exit.clear();
        let (ends, worker_ends) = channel_set();
        let worker = match WorkerHandle::spawn(&self.config, worker_ends) {
            Ok(worker) => worker,
            Err(e) => {
                self.state = Lifecycle::Faulted;
                return Err(e);
            }
        };
        self.state = Lifecycle::Started;
        tracing::debug!("Worker {} {}, waiting for init", worker.pid(), self.state);

        let outcome = bounded_wait(
            &ends.init_result,
            &ends.init_error,
            self.config.response_timeout,
        );
        self.ends = Some(ends);
        self.worker = Some(worker);

        match outcome {
            Ok(Ok(report)) => {
                tracing::info!("Worker ready for app {}", report.app_id);
                self.state = Lifecycle::Ready;
                Ok(report)
            }
            Ok(Err(remote)) => {
                tracing::warn!("Worker failed to initialize: {}", remote);
                self.state = Lifecycle::Faulted;
                // The worker exits on its own after reporting.
                self.release_worker(self.config.join_timeout);
                Err(Error::InitializationFailed(remote))
            }
            Err(e) => {
                tracing::warn!("Worker did not report init: {}", e);
                self.state = Lifecycle::Faulted;
                self.release_worker(Duration::ZERO);
                Err(e)
            }
        }
    }

    /// Run a typed operation in the worker.
    pub fn call<O: Operation>(&mut self, operation: O) -> Result<O::Output> {
        let response = self.call_request(operation.request())?;
        O::decode(response)
    }

    /// Send one request and wait for its outcome.
    ///
    /// The caller must not issue another call until this one returns.
    pub fn call_request(&mut self, request: Request) -> Result<Response> {
        if self.state != Lifecycle::Ready {
            return Err(Error::NotReady(self.state));
        }
        let ends = self.ends.as_ref().ok_or(Error::NotReady(self.state))?;

        // A previous call may have timed out and been answered since.
        let stale = discard_stale(&ends.call_result, &ends.call_error);
        if stale > 0 {
            tracing::warn!("Discarded {} late outcome(s) from an abandoned call", stale);
        }

        tracing::debug!("Calling {}", request.name());
        if ends.call_request.send(WorkerCommand::Call(request)).is_err() {
            // The outcome wait below observes the dead worker.
            tracing::debug!("Worker command channel is closed");
        }

        match bounded_wait(
            &ends.call_result,
            &ends.call_error,
            self.config.response_timeout,
        )? {
            Ok(response) => Ok(response),
            Err(remote) => {
                tracing::warn!("Worker call failed: {}", remote);
                Err(Error::Remote(remote))
            }
        }
    }

    /// Ask the worker for the authoritative server time.
    pub fn server_time(&mut self) -> Result<u64> {
        self.call(ServerTime)
    }

    /// Shut the native library down, signal exit and join the worker.
    ///
    /// Never fails. A no-op before `init` and after a previous `shutdown`;
    /// safe when the worker already exited on its own.
    pub fn shutdown(&mut self) {
        match self.state {
            Lifecycle::Created | Lifecycle::Stopped => return,
            _ => {}
        }

        tracing::info!("Shutting down worker (state: {})", self.state);
        self.state = Lifecycle::ShuttingDown;

        if let Some(ends) = &self.ends {
            let _ = ends.call_request.send(WorkerCommand::Teardown);
        }
        self.exit.set();
        if let Some(ends) = &self.ends {
            let _ = ends.call_request.send(WorkerCommand::Exit);
        }

        self.release_worker(self.config.join_timeout);
        self.state = Lifecycle::Stopped;
    }

    /// Drop the channel ends, closing the worker's stdin, then reap it.
    fn release_worker(&mut self, grace: Duration) {
        self.ends = None;
        if let Some(worker) = self.worker.take() {
            let pid = worker.pid();
            match worker.reap(grace) {
                Some(status) => tracing::debug!("Worker {} exited with {}", pid, status),
                None => tracing::warn!("Worker {} could not be reaped", pid),
            }
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
