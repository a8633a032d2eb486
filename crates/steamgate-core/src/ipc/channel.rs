//! Typed channel pairs between the executor and the worker loop.
//!
//! Both processes hold a full set of five channel pairs; the wire bridge
//! (`super::bridge`) forwards traffic between the two sets. Inside a process
//! the executor and the message loop only ever see channel ends.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Select, Sender, TryRecvError};

use crate::error::{Error, Result};

use super::protocol::{InitReport, RemoteError, Response, WorkerCommand};

/// Success value or captured remote error, delivered exactly once per init
/// or call.
pub type Outcome<T> = std::result::Result<T, RemoteError>;

/// A unidirectional channel with a sender and a receiver end.
pub struct ChannelPair<T> {
    pub sender: Sender<T>,
    pub receiver: Receiver<T>,
}

impl<T> ChannelPair<T> {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }
}

impl<T> Default for ChannelPair<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Executor-side ends of the five channel pairs.
pub struct ExecutorEnds {
    pub call_request: Sender<WorkerCommand>,
    pub init_result: Receiver<InitReport>,
    pub init_error: Receiver<RemoteError>,
    pub call_result: Receiver<Response>,
    pub call_error: Receiver<RemoteError>,
}

/// Worker-side ends of the five channel pairs.
pub struct WorkerEnds {
    pub call_request: Receiver<WorkerCommand>,
    pub init_result: Sender<InitReport>,
    pub init_error: Sender<RemoteError>,
    pub call_result: Sender<Response>,
    pub call_error: Sender<RemoteError>,
}

/// Sending ends of the four worker → executor channels.
pub struct EventSenders {
    pub init_result: Sender<InitReport>,
    pub init_error: Sender<RemoteError>,
    pub call_result: Sender<Response>,
    pub call_error: Sender<RemoteError>,
}

/// Receiving ends of the four worker → executor channels.
pub struct EventReceivers {
    pub init_result: Receiver<InitReport>,
    pub init_error: Receiver<RemoteError>,
    pub call_result: Receiver<Response>,
    pub call_error: Receiver<RemoteError>,
}

impl ExecutorEnds {
    pub fn into_parts(self) -> (Sender<WorkerCommand>, EventReceivers) {
        (
            self.call_request,
            EventReceivers {
                init_result: self.init_result,
                init_error: self.init_error,
                call_result: self.call_result,
                call_error: self.call_error,
            },
        )
    }
}

impl WorkerEnds {
    pub fn into_parts(self) -> (Receiver<WorkerCommand>, EventSenders) {
        (
            self.call_request,
            EventSenders {
                init_result: self.init_result,
                init_error: self.init_error,
                call_result: self.call_result,
                call_error: self.call_error,
            },
        )
    }
}

/// Create a fresh set of channel pairs and split it into its two sides.
pub fn channel_set() -> (ExecutorEnds, WorkerEnds) {
    let call_request = ChannelPair::new();
    let init_result = ChannelPair::new();
    let init_error = ChannelPair::new();
    let call_result = ChannelPair::new();
    let call_error = ChannelPair::new();

    (
        ExecutorEnds {
            call_request: call_request.sender,
            init_result: init_result.receiver,
            init_error: init_error.receiver,
            call_result: call_result.receiver,
            call_error: call_error.receiver,
        },
        WorkerEnds {
            call_request: call_request.receiver,
            init_result: init_result.sender,
            init_error: init_error.sender,
            call_result: call_result.sender,
            call_error: call_error.sender,
        },
    )
}

/// Wait for exactly one outcome on a result/error channel pair.
///
/// The result channel is checked first, then the error channel. If neither
/// has data, blocks on both until `timeout` elapses. When both channels are
/// disconnected and empty the peer is gone and no answer can ever arrive, so
/// this returns [`Error::NoResponse`] without waiting out the deadline.
pub fn bounded_wait<T>(
    results: &Receiver<T>,
    errors: &Receiver<RemoteError>,
    timeout: Duration,
) -> Result<Outcome<T>> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut results_open = true;
    let mut errors_open = true;

    loop {
        match results.try_recv() {
            Ok(value) => return Ok(Ok(value)),
            Err(TryRecvError::Disconnected) => results_open = false,
            Err(TryRecvError::Empty) => {}
        }
        match errors.try_recv() {
            Ok(error) => return Ok(Err(error)),
            Err(TryRecvError::Disconnected) => errors_open = false,
            Err(TryRecvError::Empty) => {}
        }

        if !results_open && !errors_open {
            tracing::debug!("Outcome channels closed without an answer");
            return Err(Error::NoResponse {
                waited: started.elapsed(),
            });
        }

        let mut select = Select::new();
        if results_open {
            select.recv(results);
        }
        if errors_open {
            select.recv(errors);
        }
        if select.ready_deadline(deadline).is_err() {
            return Err(Error::NoResponse {
                waited: started.elapsed(),
            });
        }
    }
}

/// Throw away outcomes left over from an earlier wait that gave up.
///
/// Returns how many were dropped.
pub fn discard_stale<T>(results: &Receiver<T>, errors: &Receiver<RemoteError>) -> usize {
    results.try_iter().count() + errors.try_iter().count()
}
