//! Inter-process communication with the steamgate worker process.
//!
//! This module provides the wire protocol, the typed channel pairs each side
//! works against, the bridge that carries channel traffic over the worker's
//! stdio, and the handle that owns the worker process.

pub mod bridge;
pub mod channel;
pub mod protocol;
mod signal;
mod worker;

pub use channel::{
    ChannelPair, EventReceivers, EventSenders, ExecutorEnds, Outcome, WorkerEnds, bounded_wait,
    channel_set, discard_stale,
};
pub use protocol::{
    InitReport, RemoteError, Request, Response, WorkerCommand, WorkerEvent, read_message,
    write_message,
};
pub use signal::ExitSignal;
pub use worker::WorkerHandle;
