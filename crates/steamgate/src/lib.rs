//! steamgate - run the Steamworks client library in an isolated worker
//! process.
//!
//! The library keeps process-wide state, may hang, and cannot be cleanly
//! re-initialized within one process. [`Executor`] confines it to a
//! `steamgate-worker` child and talks to it over typed channels with bounded
//! waits.
//!
//! ```no_run
//! use steamgate::{Executor, ExecutorConfig, ServerTime};
//!
//! let mut executor = Executor::new(ExecutorConfig::new(480));
//! executor.init()?;
//! let server_time = executor.call(ServerTime)?;
//! let code = steamgate::generate_code("AAAAAAAAAAAAAAAA", server_time)?;
//! println!("{}", code.code);
//! executor.shutdown();
//! # Ok::<(), steamgate::Error>(())
//! ```

pub use steamgate_core::{
    AppId, AuthCode, Backend, DebugBridge, DeviceError, Error, Executor, ExecutorConfig, Lifecycle,
    LoggedOn, Operation, RemoteError, Request, Response, Result, ServerTime, SimulatedConfig,
    SteamId, current_code, generate_code,
};

/// Lower-level building blocks: IPC, gateways, the worker runtime.
pub use steamgate_core::{config, device, gateway, host, ipc};
