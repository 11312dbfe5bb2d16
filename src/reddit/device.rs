//! Per-machine device identifier for the installed-client grant.

use crate::reddit::error::AuthError;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Reddit rejects device ids outside 20..=30 characters.
pub const DEVICE_ID_MIN_LEN: usize = 20;
pub const DEVICE_ID_MAX_LEN: usize = 30;

const APP_ID: &str = "reddit-exporter";

/// Bring `raw` into the accepted length range: repeat it until it has at least
/// 20 characters, then cut it to at most 30.
pub fn normalize_device_id(raw: &str) -> Result<String, AuthError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AuthError::DeviceId {
            reason: "device id is empty".to_string(),
        });
    }
    let mut id = raw.to_string();
    while id.chars().count() < DEVICE_ID_MIN_LEN {
        id = id.repeat(2);
    }
    Ok(id.chars().take(DEVICE_ID_MAX_LEN).collect())
}

/// Stable id for this machine, scoped to this app so the raw machine id is never sent.
///
/// The machine id comes from the OS: `/etc/machine-id` on Linux, `IOPlatformUUID` on macOS,
/// `MachineGuid` on Windows.
pub fn machine_device_id() -> Result<String, AuthError> {
    let machine_id = machine_uid::get().map_err(|e| AuthError::DeviceId {
        reason: format!("read machine id: {}", e),
    })?;
    device_id_for_machine(&machine_id)
}

fn device_id_for_machine(machine_id: &str) -> Result<String, AuthError> {
    let machine_id = machine_id.trim();
    if machine_id.is_empty() {
        return Err(AuthError::DeviceId {
            reason: "machine id is empty".to_string(),
        });
    }
    normalize_device_id(&app_scoped_id(machine_id))
}

fn app_scoped_id(machine_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(machine_id.as_bytes());
    hasher.update(APP_ID.as_bytes());
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{:02x}", b);
            out
        })
}
