//! Steam Guard data from a rooted Android phone, read over `adb`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde_json::Value;
use tokio::process::Command;

use crate::error::DeviceError;

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Data directory of the Steam mobile app.
pub const DEFAULT_APP_PATH: &str = "/data/data/com.valvesoftware.android.steam.community/";

/// Steam Guard secrets, relative to the app directory.
pub const GUARD_FILE: &str = "files/Steamguard-*";

/// Present once the user logged in to the app.
pub const LOGIN_FILE: &str = "app_cache_i/login.json";

/// Android preferences holding the device id.
pub const UUID_FILE: &str = "shared_prefs/steam.uuid.xml";

const DEVICE_ID_PREFIX: &str = "android:";

/// Drives an `adb` binary against the connected phone.
#[derive(Debug, Clone)]
pub struct DebugBridge {
    adb: PathBuf,
    app_path: String,
}

impl DebugBridge {
    pub fn new(adb: impl Into<PathBuf>) -> DeviceResult<Self> {
        Self::with_app_path(adb, DEFAULT_APP_PATH)
    }

    pub fn with_app_path(adb: impl Into<PathBuf>, app_path: impl Into<String>) -> DeviceResult<Self> {
        let adb = adb.into();
        if !adb.is_file() {
            return Err(DeviceError::AdbNotFound(adb));
        }
        Ok(Self {
            adb,
            app_path: app_path.into(),
        })
    }

    pub fn adb_path(&self) -> &Path {
        &self.adb
    }

    /// Check the phone is connected, rooted, logged in and has Steam Guard.
    ///
    /// `adb root` restarts the daemon, so the phone may briefly disconnect.
    pub async fn preflight(&self) -> DeviceResult<()> {
        tracing::info!("Your phone can be reconnected to switch adb to root mode");

        let (connected, root) = tokio::join!(self.run(&["shell", "true"]), self.run(&["root"]));
        if let Err(e) = connected {
            tracing::debug!("Connectivity check failed: {}", e);
            return Err(DeviceError::DeviceNotFound);
        }
        if let Err(e) = root {
            tracing::debug!("adb root failed: {}", e);
            return Err(DeviceError::RootUnavailable);
        }

        self.run(&["wait-for-device"]).await?;

        let login = self.su_cat(LOGIN_FILE);
        let guard = self.su_cat(GUARD_FILE);
        let (su, login, guard) = tokio::join!(
            self.run(&["shell", "su", "-c", "true"]),
            self.run(&login),
            self.run(&guard),
        );
        if su.is_err() {
            return Err(DeviceError::RootUnavailable);
        }
        if login.is_err() {
            return Err(DeviceError::NotLoggedIn);
        }
        if guard.is_err() {
            return Err(DeviceError::GuardNotEnabled);
        }
        Ok(())
    }

    /// Read a file below the app directory as root.
    pub async fn read_file(&self, relative: &str) -> DeviceResult<String> {
        self.preflight().await?;

        let data = self.run(&self.su_cat(relative)).await?;
        if data.is_empty() || data.contains("No such file") {
            return Err(DeviceError::FileMissing(relative.to_string()));
        }
        Ok(data)
    }

    /// Requested fields of the Steam Guard data, in request order.
    pub async fn guard_secrets<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> DeviceResult<Vec<(String, String)>> {
        let data = self.read_file(GUARD_FILE).await?;
        parse_guard_fields(&data, names)
    }

    /// The id the mobile app registered the phone with.
    pub async fn device_id(&self) -> DeviceResult<String> {
        let data = self.read_file(UUID_FILE).await?;
        parse_device_id(&data)
    }

    fn su_cat(&self, relative: &str) -> Vec<String> {
        let path = if self.app_path.ends_with('/') {
            format!("{}{}", self.app_path, relative)
        } else {
            format!("{}/{}", self.app_path, relative)
        };
        vec![
            "shell".to_string(),
            "su".to_string(),
            "-c".to_string(),
            format!("\"cat {}\"", path),
        ]
    }

    async fn run<S: AsRef<str>>(&self, args: &[S]) -> DeviceResult<String> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        tracing::debug!("adb {}", args.join(" "));

        let output = Command::new(&self.adb)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(DeviceError::Command {
                args,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

/// Pick `names` out of the first JSON document in `data`.
///
/// The guard file glob can match several files; only the first counts.
/// Non-string values are rendered as JSON.
pub fn parse_guard_fields<S: AsRef<str>>(
    data: &str,
    names: &[S],
) -> DeviceResult<Vec<(String, String)>> {
    let document = serde_json::Deserializer::from_str(data)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| DeviceError::Malformed("empty Steam Guard data".to_string()))?
        .map_err(|e| DeviceError::Malformed(e.to_string()))?;

    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let value = match document.get(name) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => return Err(DeviceError::MissingField(name.to_string())),
            };
            Ok((name.to_string(), value))
        })
        .collect()
}

/// Device id from `steam.uuid.xml`: the text of the root's first child,
/// without its `android:` prefix.
pub fn parse_device_id(xml: &str) -> DeviceResult<String> {
    let text = first_child_text(xml)
        .ok_or_else(|| DeviceError::Malformed("no device id in steam.uuid.xml".to_string()))?;
    let id = text
        .strip_prefix(DEVICE_ID_PREFIX)
        .ok_or_else(|| DeviceError::Malformed(format!("unexpected device id {:?}", text)))?;
    Ok(unescape(id))
}

/// Text content of the first element nested in the root element.
fn first_child_text(xml: &str) -> Option<&str> {
    let mut rest = xml;
    let mut depth = 0;

    loop {
        let open = rest.find('<')?;
        rest = &rest[open..];

        if let Some(body) = rest.strip_prefix("<?") {
            rest = &body[body.find("?>")? + 2..];
        } else if let Some(body) = rest.strip_prefix("<!--") {
            rest = &body[body.find("-->")? + 3..];
        } else if rest.starts_with("<!") || rest.starts_with("</") {
            rest = &rest[rest.find('>')? + 1..];
        } else {
            let close = rest.find('>')?;
            let self_closing = rest[..close].ends_with('/');
            rest = &rest[close + 1..];
            depth += 1;
            if depth == 2 {
                if self_closing {
                    return None;
                }
                let end = rest.find('<')?;
                return Some(rest[..end].trim());
            }
            if self_closing {
                return None;
            }
        }
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
