//! Steamworks flat C API loaded at runtime.

use std::ffi::c_void;
use std::path::Path;

use libloading::{Library, Symbol};

use crate::error::Result;
use crate::ipc::{RemoteError, Request, Response};

use super::NativeGateway;

type InitFn = unsafe extern "C" fn() -> bool;
type ShutdownFn = unsafe extern "C" fn();
type AccessorFn = unsafe extern "C" fn() -> *mut c_void;
type UtilsU32Fn = unsafe extern "C" fn(*mut c_void) -> u32;
type UserBoolFn = unsafe extern "C" fn(*mut c_void) -> bool;
type UserU64Fn = unsafe extern "C" fn(*mut c_void) -> u64;

const INIT: &[u8] = b"SteamAPI_Init\0";
const SHUTDOWN: &[u8] = b"SteamAPI_Shutdown\0";
const STEAM_UTILS: &[u8] = b"SteamAPI_SteamUtils_v010\0";
const STEAM_USER: &[u8] = b"SteamAPI_SteamUser_v023\0";
const GET_SERVER_REAL_TIME: &[u8] = b"SteamAPI_ISteamUtils_GetServerRealTime\0";
const GET_APP_ID: &[u8] = b"SteamAPI_ISteamUtils_GetAppID\0";
const LOGGED_ON: &[u8] = b"SteamAPI_ISteamUser_BLoggedOn\0";
const GET_STEAM_ID: &[u8] = b"SteamAPI_ISteamUser_GetSteamID\0";

/// Gateway backed by a dynamically loaded `libsteam_api`.
///
/// The library reads `SteamAppId` from the process environment during
/// `SteamAPI_Init`, which is why it only ever lives inside the worker.
pub struct SteamworksGateway {
    library: Library,
}

impl SteamworksGateway {
    /// Load the library from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Loading Steamworks library from {}", path.display());
        // SAFETY: loading runs the library's initializers; libsteam_api has
        // none with preconditions beyond being loaded once per process.
        let library = unsafe { Library::new(path) }?;
        Ok(Self { library })
    }

    fn symbol<T>(&self, name: &[u8]) -> std::result::Result<Symbol<'_, T>, RemoteError> {
        // SAFETY: every `T` used with this helper matches the C signature of
        // the named export in steam_api_flat.h.
        unsafe { self.library.get::<T>(name) }.map_err(|e| {
            RemoteError::new("SymbolMissing", e.to_string())
                .with_detail(String::from_utf8_lossy(&name[..name.len() - 1]).into_owned())
        })
    }

    fn interface(&self, accessor: &[u8]) -> std::result::Result<*mut c_void, RemoteError> {
        let accessor = self.symbol::<AccessorFn>(accessor)?;
        // SAFETY: accessor functions take no arguments and return null when
        // the interface is unavailable.
        let pointer = unsafe { accessor() };
        if pointer.is_null() {
            return Err(RemoteError::new(
                "InterfaceUnavailable",
                "Steam interface is not available (is the library initialized?)",
            ));
        }
        Ok(pointer)
    }
}

impl NativeGateway for SteamworksGateway {
    fn init(&mut self, app_id: u32) -> std::result::Result<bool, RemoteError> {
        tracing::debug!("SteamAPI_Init for app {}", app_id);
        let init = self.symbol::<InitFn>(INIT)?;
        // SAFETY: called once, from the worker's main thread.
        Ok(unsafe { init() })
    }

    fn shutdown(&mut self) {
        match self.symbol::<ShutdownFn>(SHUTDOWN) {
            // SAFETY: called at most once after a successful init.
            Ok(shutdown) => unsafe { shutdown() },
            Err(e) => tracing::warn!("Cannot shut down Steamworks: {}", e),
        }
    }

    fn execute(&mut self, request: &Request) -> std::result::Result<Response, RemoteError> {
        match request {
            Request::ServerTime => {
                let utils = self.interface(STEAM_UTILS)?;
                let get_time = self.symbol::<UtilsU32Fn>(GET_SERVER_REAL_TIME)?;
                // SAFETY: `utils` is a live ISteamUtils pointer.
                Ok(Response::ServerTime(u64::from(unsafe { get_time(utils) })))
            }
            Request::AppId => {
                let utils = self.interface(STEAM_UTILS)?;
                let get_app_id = self.symbol::<UtilsU32Fn>(GET_APP_ID)?;
                // SAFETY: `utils` is a live ISteamUtils pointer.
                Ok(Response::AppId(unsafe { get_app_id(utils) }))
            }
            Request::LoggedOn => {
                let user = self.interface(STEAM_USER)?;
                let logged_on = self.symbol::<UserBoolFn>(LOGGED_ON)?;
                // SAFETY: `user` is a live ISteamUser pointer.
                Ok(Response::LoggedOn(unsafe { logged_on(user) }))
            }
            Request::SteamId => {
                let user = self.interface(STEAM_USER)?;
                let get_steam_id = self.symbol::<UserU64Fn>(GET_STEAM_ID)?;
                // SAFETY: `user` is a live ISteamUser pointer.
                Ok(Response::SteamId(unsafe { get_steam_id(user) }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_a_load_error() {
        let result = SteamworksGateway::load(Path::new("/nonexistent/libsteam_api.so"));
        assert!(matches!(result, Err(crate::Error::LibraryLoad(_))));
    }

    #[test]
    fn test_symbol_names_are_nul_terminated() {
        for name in [
            INIT,
            SHUTDOWN,
            STEAM_UTILS,
            STEAM_USER,
            GET_SERVER_REAL_TIME,
            GET_APP_ID,
            LOGGED_ON,
            GET_STEAM_ID,
        ] {
            assert_eq!(name.last(), Some(&0));
            assert!(!name[..name.len() - 1].contains(&0));
        }
    }
}
