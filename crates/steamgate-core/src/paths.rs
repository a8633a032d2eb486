//! Native library discovery.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::LIBRARY_ENV;

/// Platform file name of the Steamworks client library, e.g.
/// `libsteam_api.so` on Linux.
pub fn steam_library_name() -> OsString {
    libloading::library_filename("steam_api")
}

/// Resolve the Steamworks library to load.
///
/// Order:
/// 1. `explicit`, when given
/// 2. `STEAMGATE_STEAM_LIBRARY` environment variable
/// 3. `~/.steam/sdk64/<libname>` if it exists
/// 4. the bare library name, left to the dynamic loader's search path
pub fn resolve_steam_library(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Some(path) = env::var_os(LIBRARY_ENV) {
        return PathBuf::from(path);
    }

    let name = steam_library_name();
    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(".steam").join("sdk64").join(&name);
        if candidate.is_file() {
            return candidate;
        }
    }

    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = Path::new("/opt/steam/libsteam_api.so");
        assert_eq!(resolve_steam_library(Some(path)), path);
    }

    #[test]
    fn test_library_name_mentions_steam_api() {
        let name = steam_library_name();
        assert!(name.to_string_lossy().contains("steam_api"));
    }
}
