//! `device` commands: read Steam Guard data off a rooted phone.

use std::path::Path;

use steamgate_core::{DebugBridge, Error};

use crate::colors;

/// Fields printed when none are requested.
pub const DEFAULT_FIELDS: &[&str] = &["shared_secret", "identity_secret"];

/// Print the requested Steam Guard fields as `name<TAB>value` lines.
pub async fn secrets(adb: &Path, fields: &[String], json: bool) -> anyhow::Result<()> {
    let bridge = DebugBridge::new(adb).map_err(Error::from)?;
    let fields: Vec<&str> = if fields.is_empty() {
        DEFAULT_FIELDS.to_vec()
    } else {
        fields.iter().map(String::as_str).collect()
    };

    let values = bridge.guard_secrets(&fields).await.map_err(Error::from)?;

    if json {
        let map: serde_json::Map<String, serde_json::Value> = values
            .into_iter()
            .map(|(name, value)| (name, serde_json::Value::String(value)))
            .collect();
        println!("{}", serde_json::Value::Object(map));
    } else {
        for (name, value) in values {
            println!("{}{}{}\t{}", colors::BOLD, name, colors::RESET, value);
        }
    }
    Ok(())
}

/// Print the id the mobile app registered the phone with.
pub async fn id(adb: &Path) -> anyhow::Result<()> {
    let bridge = DebugBridge::new(adb).map_err(Error::from)?;
    let id = bridge.device_id().await.map_err(Error::from)?;
    println!("{}", id);
    Ok(())
}
