//! Cooperative shutdown flag shared with the worker's message loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Handle for cooperative shutdown of the worker loop.
///
/// `ExitSignal` can be cloned and shared across threads; setting any clone is
/// visible to all others. The executor clears it at `init` and sets it at
/// `shutdown`. In the worker process the stdin bridge sets its own copy when
/// an `Exit` command arrives, and the message loop checks it at every tick.
///
/// # Example
///
/// ```
/// use steamgate_core::ipc::ExitSignal;
///
/// let signal = ExitSignal::new();
/// let observer = signal.clone();
///
/// assert!(!observer.is_set());
/// signal.set();
/// assert!(observer.is_set());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExitSignal {
    flag: Arc<AtomicBool>,
}

impl ExitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request exit. Idempotent.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Reset the flag before a new lifecycle.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
