//! Worker process management.
//!
//! Provides `WorkerHandle` for spawning the `steamgate-worker` binary and
//! bridging its stdio to a set of channel ends.

use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::{APP_ID_ENV, ExecutorConfig, WORKER_PATH_ENV};
use crate::error::{Error, Result};

use super::bridge::{pump_commands, route_events};
use super::channel::WorkerEnds;

const WORKER_NAME: &str = if cfg!(windows) {
    "steamgate-worker.exe"
} else {
    "steamgate-worker"
};

/// Interval between liveness checks while waiting for the worker to exit.
const REAP_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a worker process.
///
/// Owns the child and the two bridge threads that carry its stdin and
/// stdout.
pub struct WorkerHandle {
    /// The child process.
    child: Child,
    /// Forwards the call-request channel to the child's stdin.
    stdin_pump: Option<JoinHandle<()>>,
    /// Routes the child's stdout into the outcome channels.
    stdout_router: Option<JoinHandle<()>>,
    /// Exit status once reaped.
    status: Option<ExitStatus>,
}

impl WorkerHandle {
    /// Spawn a worker process wired to `ends`.
    ///
    /// The app id is placed in the child's environment only; the parent's
    /// environment is never modified.
    pub fn spawn(config: &ExecutorConfig, ends: WorkerEnds) -> Result<Self> {
        let worker_path = match &config.worker_path {
            Some(path) => path.clone(),
            None => Self::find_worker_binary()?,
        };

        let mut child = Command::new(&worker_path)
            .args(config.worker_args())
            .env(APP_ID_ENV, config.app_id.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()) // Let worker stderr pass through for debugging
            .spawn()
            .map_err(|e| {
                Error::Spawn(format!(
                    "failed to spawn worker process '{}': {}",
                    worker_path.display(),
                    e
                ))
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Spawn("worker stdio was not captured".to_string()));
            }
        };

        tracing::info!(
            "Spawned worker {} (pid {}) for app {}",
            worker_path.display(),
            child.id(),
            config.app_id
        );

        // From here on, dropping `handle` on an error path kills the child.
        let mut handle = Self {
            child,
            stdin_pump: None,
            stdout_router: None,
            status: None,
        };

        let (commands, events) = ends.into_parts();
        handle.stdin_pump = Some(
            std::thread::Builder::new()
                .name("steamgate-stdin".to_string())
                .spawn(move || pump_commands(commands, BufWriter::new(stdin)))?,
        );
        handle.stdout_router = Some(
            std::thread::Builder::new()
                .name("steamgate-stdout".to_string())
                .spawn(move || route_events(BufReader::new(stdout), events))?,
        );

        Ok(handle)
    }

    /// Find the steamgate-worker binary path.
    ///
    /// Looks in the following order:
    /// 1. `STEAMGATE_WORKER_PATH` environment variable
    /// 2. Same directory as the current executable (and its parent, for test
    ///    binaries under `target/<profile>/deps`)
    /// 3. System PATH
    pub fn find_worker_binary() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(WORKER_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(path);
            }
            tracing::warn!(
                "{} points to missing file {}",
                WORKER_PATH_ENV,
                path.display()
            );
        }

        if let Ok(exe_path) = std::env::current_exe() {
            for dir in exe_path.ancestors().skip(1).take(2) {
                let candidate = dir.join(WORKER_NAME);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }

        if let Ok(path) = which::which(WORKER_NAME) {
            return Ok(path);
        }

        Err(Error::Spawn(format!(
            "could not find {}. Set {} or ensure it's in PATH.",
            WORKER_NAME, WORKER_PATH_ENV
        )))
    }

    /// Get the process ID of the worker.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Check if the worker process is still running. Reaps it if not.
    pub fn is_alive(&mut self) -> bool {
        if self.status.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!("Worker {} exited with {}", self.child.id(), status);
                self.status = Some(status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!("Failed to poll worker {}: {}", self.child.id(), e);
                false
            }
        }
    }

    /// Wait up to `timeout` for the worker to exit on its own.
    ///
    /// Returns the exit status, or `None` if it is still running. Waiting on
    /// an already-exited worker returns immediately.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_alive() {
                return self.status;
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(REAP_INTERVAL);
        }
    }

    /// Kill the worker process immediately and reap it.
    pub fn kill(&mut self) {
        if !self.is_alive() {
            return;
        }

        if let Err(e) = self.child.kill() {
            // The process may have exited between the check and the kill
            if e.kind() != std::io::ErrorKind::InvalidInput {
                tracing::warn!("Failed to kill worker: {}", e);
            }
        }

        match self.child.wait() {
            Ok(status) => self.status = Some(status),
            Err(e) => tracing::warn!("Failed to reap worker: {}", e),
        }
    }

    /// Join the bridge threads once the worker is gone.
    ///
    /// The stdin pump only returns after every command sender is dropped.
    fn join_bridge(&mut self) {
        for handle in [self.stdout_router.take(), self.stdin_pump.take()]
            .into_iter()
            .flatten()
        {
            if handle.join().is_err() {
                tracing::warn!("Worker bridge thread panicked");
            }
        }
    }

    /// Wait for the worker to exit, killing it after `timeout`, then release
    /// the bridge threads.
    pub fn reap(mut self, timeout: Duration) -> Option<ExitStatus> {
        if self.wait_timeout(timeout).is_none() {
            tracing::warn!(
                "Worker {} did not exit within {:?}; killing it",
                self.child.id(),
                timeout
            );
            self.kill();
        }
        self.join_bridge();
        self.status
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // Ensure worker is killed when handle is dropped
        self.kill();
    }
}
