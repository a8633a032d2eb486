//! IPC protocol messages for steamgate worker processes.
//!
//! Uses length-prefixed rkyv messages over stdin/stdout.
//! Format: 4-byte length (u32 LE) + rkyv-encoded message.
//!
//! Commands flow parent → worker on stdin, events flow worker → parent on
//! stdout. The event variant doubles as the logical channel id.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound on a single frame.
const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

/// A native operation the worker knows how to execute.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum Request {
    /// Authoritative server time, in seconds since the epoch.
    ServerTime,
    /// App id the library was initialized for.
    AppId,
    /// Whether the local user is logged on to Steam.
    LoggedOn,
    /// 64-bit Steam id of the local user.
    SteamId,
}

impl Request {
    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Request::ServerTime => "server-time",
            Request::AppId => "app-id",
            Request::LoggedOn => "logged-on",
            Request::SteamId => "steam-id",
        }
    }
}

/// Result of a successfully executed [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum Response {
    ServerTime(u64),
    AppId(u32),
    LoggedOn(bool),
    SteamId(u64),
}

/// An error captured inside the worker, carried across the process boundary
/// as data.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct RemoteError {
    /// Error kind, e.g. `ValueError` or `panic`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured payload (symbol name, panic location, ...).
    pub detail: Option<String>,
}

impl RemoteError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

/// Parses `Kind: message`. A string without a colon becomes an `Error` kind.
impl FromStr for RemoteError {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.split_once(':') {
            Some((kind, message)) if !kind.trim().is_empty() => {
                RemoteError::new(kind.trim(), message.trim())
            }
            _ => RemoteError::new("Error", s.trim()),
        })
    }
}

/// Payload of a successful init.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct InitReport {
    /// App id the native library was initialized with.
    pub app_id: u32,
}

/// Command sent from parent to worker process.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum WorkerCommand {
    /// Execute a native operation.
    Call(Request),

    /// Shut the native library down; the worker keeps running.
    Teardown,

    /// Set the worker's exit signal.
    Exit,
}

/// Event sent from worker to parent process.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum WorkerEvent {
    InitResult(InitReport),
    InitError(RemoteError),
    CallResult(Response),
    CallError(RemoteError),
}

/// Write a message to a writer using length-prefixed rkyv encoding.
pub fn write_message<W: Write>(
    writer: &mut W,
    message: &impl for<'a> Serialize<
        rkyv::rancor::Strategy<
            rkyv::ser::Serializer<
                AlignedVec,
                rkyv::ser::allocator::ArenaHandle<'a>,
                rkyv::ser::sharing::Share,
            >,
            rkyv::rancor::Error,
        >,
    >,
) -> Result<()> {
    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(message)
        .map_err(|e| Error::Serialization(format!("Failed to encode IPC message: {}", e)))?;

    let len = u32::try_from(bytes.len())
        .map_err(|_| Error::Ipc(format!("IPC message too large: {} bytes", bytes.len())))?;
    writer
        .write_all(&len.to_le_bytes())
        .map_err(|e| Error::Ipc(format!("Failed to write IPC message length: {}", e)))?;
    writer
        .write_all(&bytes)
        .map_err(|e| Error::Ipc(format!("Failed to write IPC message body: {}", e)))?;
    writer
        .flush()
        .map_err(|e| Error::Ipc(format!("Failed to flush IPC stream: {}", e)))?;

    Ok(())
}

/// Read a message from a reader using length-prefixed rkyv encoding.
///
/// Returns `Ok(None)` on a clean end of stream (no partial frame).
///
/// # Safety
///
/// Uses unchecked deserialization. Only safe when reading from trusted
/// sources (our own worker or parent process).
pub fn read_message<R: Read, T>(reader: &mut R) -> Result<Option<T>>
where
    T: Archive,
    T::Archived: Deserialize<T, rkyv::rancor::Strategy<rkyv::de::Pool, rkyv::rancor::Error>>,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => {
            return Err(Error::Ipc(format!(
                "Failed to read IPC message length: {}",
                e
            )));
        }
    }
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_MESSAGE_LEN {
        return Err(Error::Ipc(format!("IPC message too large: {} bytes", len)));
    }

    let mut bytes = AlignedVec::<16>::with_capacity(len);
    bytes.resize(len, 0);
    reader
        .read_exact(&mut bytes)
        .map_err(|e| Error::Ipc(format!("Failed to read IPC message body: {}", e)))?;

    // SAFETY: frames only ever come from our own worker or parent process,
    // and the buffer is aligned for the archived root.
    let message = unsafe { rkyv::from_bytes_unchecked::<T, rkyv::rancor::Error>(&bytes) }
        .map_err(|e| Error::Serialization(format!("Failed to decode IPC message: {}", e)))?;

    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_command_roundtrip() {
        let mut buf = Vec::new();
        write_message(&mut buf, &WorkerCommand::Call(Request::ServerTime)).unwrap();
        write_message(&mut buf, &WorkerCommand::Exit).unwrap();

        let mut cursor = Cursor::new(buf);
        let first: Option<WorkerCommand> = read_message(&mut cursor).unwrap();
        let second: Option<WorkerCommand> = read_message(&mut cursor).unwrap();
        let end: Option<WorkerCommand> = read_message(&mut cursor).unwrap();

        assert_eq!(first, Some(WorkerCommand::Call(Request::ServerTime)));
        assert_eq!(second, Some(WorkerCommand::Exit));
        assert_eq!(end, None);
    }

    #[test]
    fn test_error_event_keeps_detail() {
        let event = WorkerEvent::CallError(
            RemoteError::new("ValueError", "boom").with_detail("worker.rs:12"),
        );

        let mut buf = Vec::new();
        write_message(&mut buf, &event).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded: WorkerEvent = read_message(&mut cursor).unwrap().unwrap();

        match decoded {
            WorkerEvent::CallError(err) => {
                assert_eq!(err.kind, "ValueError");
                assert_eq!(err.message, "boom");
                assert_eq!(err.detail.as_deref(), Some("worker.rs:12"));
            }
            other => panic!("Wrong event type: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let mut buf = Vec::new();
        write_message(&mut buf, &WorkerEvent::CallResult(Response::ServerTime(42))).unwrap();
        buf.truncate(buf.len() - 1);

        let mut cursor = Cursor::new(buf);
        let result: Result<Option<WorkerEvent>> = read_message(&mut cursor);
        assert!(matches!(result, Err(Error::Ipc(_))));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut cursor = Cursor::new(u32::MAX.to_le_bytes().to_vec());
        let result: Result<Option<WorkerCommand>> = read_message(&mut cursor);
        assert!(matches!(result, Err(Error::Ipc(msg)) if msg.contains("too large")));
    }

    #[test]
    fn test_remote_error_parsing() {
        let parsed: RemoteError = "ValueError: boom".parse().unwrap();
        assert_eq!(parsed, RemoteError::new("ValueError", "boom"));

        let bare: RemoteError = "something broke".parse().unwrap();
        assert_eq!(bare.kind, "Error");
        assert_eq!(bare.message, "something broke");
        assert_eq!(bare.to_string(), "Error: something broke");
    }
}
