//! Standard stream plumbing for the worker process.
//!
//! The worker's stdout carries IPC frames, so nothing else may write to it,
//! and the native library prints diagnostics during init that would
//! interleave with the parent's output.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

#[cfg(unix)]
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

/// Take exclusive ownership of the process's stdout for IPC.
///
/// Returns a writer on a private duplicate of the original stdout and points
/// file descriptor 1 at stderr, so later prints (ours or the native
/// library's) cannot corrupt the frame stream.
#[cfg(unix)]
pub fn claim_stdout() -> io::Result<Box<dyn Write + Send>> {
    io::stdout().flush()?;

    // SAFETY: plain descriptor duplication; every result is checked.
    let private = unsafe { libc::dup(libc::STDOUT_FILENO) };
    if private < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `private` is a fresh descriptor owned by nobody else.
    let private = unsafe { std::fs::File::from_raw_fd(private) };

    if unsafe { libc::dup2(libc::STDERR_FILENO, libc::STDOUT_FILENO) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(Box::new(io::BufWriter::new(private)))
}

#[cfg(not(unix))]
pub fn claim_stdout() -> io::Result<Box<dyn Write + Send>> {
    Ok(Box::new(io::BufWriter::new(io::stdout())))
}

/// Descriptor 2 is process-wide; silencers must not interleave.
static STDERR_LOCK: Mutex<()> = Mutex::new(());

/// Silences stderr for as long as the guard lives.
///
/// The original descriptor is restored on drop, including during unwind.
/// If redirection fails the guard does nothing. Guards are serialized
/// process-wide, so they must not be nested on one thread.
pub struct SilencedStderr {
    #[cfg(unix)]
    saved: Option<OwnedFd>,
    _lock: MutexGuard<'static, ()>,
}

impl SilencedStderr {
    #[cfg(unix)]
    pub fn new() -> Self {
        let lock = STDERR_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = match Self::redirect() {
            Ok(saved) => Some(saved),
            Err(e) => {
                tracing::debug!("Leaving stderr untouched: {}", e);
                None
            }
        };
        Self { saved, _lock: lock }
    }

    #[cfg(not(unix))]
    pub fn new() -> Self {
        let lock = STDERR_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Self { _lock: lock }
    }

    #[cfg(unix)]
    fn redirect() -> io::Result<OwnedFd> {
        let null = std::fs::OpenOptions::new().write(true).open("/dev/null")?;
        io::stderr().flush()?;

        // SAFETY: plain descriptor duplication; every result is checked.
        let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
        if saved < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `saved` is a fresh descriptor owned by nobody else.
        let saved = unsafe { OwnedFd::from_raw_fd(saved) };

        if unsafe { libc::dup2(null.as_raw_fd(), libc::STDERR_FILENO) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(saved)
    }
}

impl Default for SilencedStderr {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SilencedStderr {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(saved) = self.saved.take() {
            // SAFETY: `saved` is a valid descriptor we own.
            if unsafe { libc::dup2(saved.as_raw_fd(), libc::STDERR_FILENO) } < 0 {
                tracing::warn!("Failed to restore stderr: {}", io::Error::last_os_error());
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn stderr_target() -> std::path::PathBuf {
        std::fs::read_link("/proc/self/fd/2").unwrap_or_default()
    }

    #[test]
    fn test_silencer_restores_stderr() {
        if !std::path::Path::new("/proc/self/fd/2").exists() {
            return;
        }
        let before = stderr_target();
        {
            let _quiet = SilencedStderr::new();
            assert_eq!(stderr_target(), std::path::PathBuf::from("/dev/null"));
        }
        assert_eq!(stderr_target(), before);
    }
}
