//! Forwarding between local channel ends and the worker's stdio streams.
//!
//! ```text
//! Executor process                          Worker process
//!   call_request ─► pump_commands ─stdin──► route_commands ─► call_request
//!                                                        └──► ExitSignal
//!   init_*/call_* ◄─ route_events ◄─stdout─ pump_events ◄─── init_*/call_*
//! ```
//!
//! Every forwarder ends when its input closes and drops its outputs, so a
//! dead peer surfaces as disconnected channels on the other side.

use std::io::{Read, Write};

use crossbeam_channel::{Receiver, Sender};

use super::channel::{EventReceivers, EventSenders};
use super::protocol::{WorkerCommand, WorkerEvent, read_message, write_message};
use super::signal::ExitSignal;

/// Forward commands from the executor's call-request channel to the worker.
///
/// Returns when every sender is dropped or the stream breaks; dropping the
/// writer closes the worker's stdin.
pub fn pump_commands<W: Write>(commands: Receiver<WorkerCommand>, mut writer: W) {
    for command in commands.iter() {
        tracing::debug!("-> worker: {:?}", command);
        if let Err(e) = write_message(&mut writer, &command) {
            tracing::debug!("Command stream closed: {}", e);
            break;
        }
    }
}

/// Route worker events from its stdout into the executor's outcome channels.
pub fn route_events<R: Read>(mut reader: R, senders: EventSenders) {
    loop {
        let event = match read_message::<_, WorkerEvent>(&mut reader) {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!("Worker closed its event stream");
                break;
            }
            Err(e) => {
                tracing::warn!("Dropping worker event stream: {}", e);
                break;
            }
        };

        tracing::debug!("<- worker: {:?}", event);
        let delivered = match event {
            WorkerEvent::InitResult(report) => senders.init_result.send(report).is_ok(),
            WorkerEvent::InitError(error) => senders.init_error.send(error).is_ok(),
            WorkerEvent::CallResult(response) => senders.call_result.send(response).is_ok(),
            WorkerEvent::CallError(error) => senders.call_error.send(error).is_ok(),
        };
        if !delivered {
            tracing::debug!("Executor dropped its outcome channels");
            break;
        }
    }
}

/// Route parent commands from stdin into the worker's call-request channel.
///
/// `Exit` sets the exit signal instead of queueing. End of stream means the
/// parent is gone, which also sets the exit signal.
pub fn route_commands<R: Read>(mut reader: R, commands: Sender<WorkerCommand>, exit: ExitSignal) {
    loop {
        match read_message::<_, WorkerCommand>(&mut reader) {
            Ok(Some(WorkerCommand::Exit)) => {
                tracing::debug!("Exit requested by parent");
                exit.set();
            }
            Ok(Some(command)) => {
                if commands.send(command).is_err() {
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!("Parent closed the command stream");
                exit.set();
                break;
            }
            Err(e) => {
                tracing::warn!("Dropping parent command stream: {}", e);
                exit.set();
                break;
            }
        }
    }
}

/// Forward worker outcomes to the parent until every sender is dropped.
pub fn pump_events<W: Write>(receivers: EventReceivers, mut writer: W) {
    let EventReceivers {
        init_result,
        init_error,
        call_result,
        call_error,
    } = receivers;

    let mut init_result = Some(init_result);
    let mut init_error = Some(init_error);
    let mut call_result = Some(call_result);
    let mut call_error = Some(call_error);

    let never_report = crossbeam_channel::never();
    let never_error = crossbeam_channel::never();
    let never_response = crossbeam_channel::never();

    while init_result.is_some() || init_error.is_some() || call_result.is_some() || call_error.is_some() {
        let event = crossbeam_channel::select! {
            recv(init_result.as_ref().unwrap_or(&never_report)) -> msg => match msg {
                Ok(report) => WorkerEvent::InitResult(report),
                Err(_) => { init_result = None; continue; }
            },
            recv(init_error.as_ref().unwrap_or(&never_error)) -> msg => match msg {
                Ok(error) => WorkerEvent::InitError(error),
                Err(_) => { init_error = None; continue; }
            },
            recv(call_result.as_ref().unwrap_or(&never_response)) -> msg => match msg {
                Ok(response) => WorkerEvent::CallResult(response),
                Err(_) => { call_result = None; continue; }
            },
            recv(call_error.as_ref().unwrap_or(&never_error)) -> msg => match msg {
                Ok(error) => WorkerEvent::CallError(error),
                Err(_) => { call_error = None; continue; }
            },
        };

        if let Err(e) = write_message(&mut writer, &event) {
            tracing::warn!("Event stream closed: {}", e);
            break;
        }
    }
}
