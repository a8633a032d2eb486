//! Process-isolated execution of the native library.
//!
//! ```text
//! Executor (caller process)
//!     │
//!     ├── call-request ──► stdin pump ──► frames ──► steamgate-worker
//!     │                                                  │
//!     │                                                  └── message loop
//!     │                                                        │
//!     └── init/call result|error ◄── stdout router ◄── frames ◄┘
//! ```
//!
//! The caller sees typed [`Operation`]s and the [`Lifecycle`] of its
//! [`Executor`]; everything below the channel pairs lives in `ipc`.

mod executor;
mod operation;

pub use executor::{Executor, Lifecycle};
pub use operation::{AppId, LoggedOn, Operation, ServerTime, SteamId};
