//! Core engine for steamgate.
//!
//! This crate provides:
//! - Process-isolated execution of the Steamworks client library
//! - The worker-side message loop and native session guard
//! - Length-prefixed IPC between executor and worker
//! - Steam Guard one-time code generation
//! - Extraction of Steam Guard data from an Android phone over adb

pub mod auth;
pub mod config;
pub mod device;
pub mod error;
pub mod execute;
pub mod gateway;
pub mod host;
pub mod ipc;
pub mod paths;

pub use auth::{AuthCode, current_code, generate_code};
pub use config::{Backend, ExecutorConfig};
pub use device::DebugBridge;
pub use error::{DeviceError, Error, Result};
pub use execute::{AppId, Executor, Lifecycle, LoggedOn, Operation, ServerTime, SteamId};
pub use gateway::{NativeGateway, SimulatedConfig, SimulatedGateway, SteamworksGateway};
pub use host::{LoopExit, NativeSession, run_worker};
pub use ipc::{ExitSignal, InitReport, RemoteError, Request, Response};
pub use paths::resolve_steam_library;
