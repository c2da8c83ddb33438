//! Android SDK and device discovery.

use std::env;
use std::path::Path;
use std::process::Command;

/// Detects Android SDK location from environment variables or common paths.
pub fn detect_android_sdk() -> Option<String> {
    let mut sdk_paths = Vec::new();

    // Check environment variables first
    if let Ok(path) = env::var("ANDROID_SDK_ROOT") {
        sdk_paths.push(path);
    }
    if let Ok(path) = env::var("ANDROID_HOME") {
        if !sdk_paths.contains(&path) {
            sdk_paths.push(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let default = match env::consts::OS {
            "windows" => home.join("AppData").join("Local").join("Android").join("Sdk"),
            "macos" => home.join("Library").join("Android").join("sdk"),
            _ => home.join("Android").join("Sdk"),
        };
        sdk_paths.push(default.to_string_lossy().to_string());
    }

    sdk_paths.retain(|p| !p.is_empty());
    sdk_paths.into_iter().find(|p| Path::new(p).exists())
}

/// Finds adb executable from PATH or SDK platform-tools.
pub fn find_adb() -> Option<String> {
    if let Ok(output) = Command::new("adb").arg("version").output() {
        if output.status.success() {
            return Some("adb".to_string());
        }
    }

    let sdk = detect_android_sdk()?;
    let adb_path = if cfg!(windows) {
        Path::new(&sdk).join("platform-tools").join("adb.exe")
    } else {
        Path::new(&sdk).join("platform-tools").join("adb")
    };
    adb_path
        .exists()
        .then(|| adb_path.to_string_lossy().to_string())
}

/// Device information structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub model: String,
    pub is_physical: bool,
}

/// Parses `adb devices -l` output, keeping only devices in the ready state.
pub fn parse_devices(output: &str) -> Vec<DeviceInfo> {
    output
        .lines()
        .skip(1) // "List of devices attached"
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let (id, state) = (parts.first()?, parts.get(1)?);
            if *state != "device" {
                return None;
            }

            let model = parts
                .iter()
                .skip(2)
                .find_map(|part| part.strip_prefix("model:"))
                .unwrap_or("Unknown")
                .to_string();
            let lowered = model.to_lowercase();
            let is_physical =
                !id.starts_with("emulator-") && !lowered.contains("sdk") && !lowered.contains("emulator");

            Some(DeviceInfo {
                id: id.to_string(),
                model,
                is_physical,
            })
        })
        .collect()
}

/// Gets the first physical device, or any ready device if there is none.
pub fn get_preferred_device(adb: &str) -> Option<DeviceInfo> {
    let output = Command::new(adb).args(["devices", "-l"]).output().ok()?;
    let devices = parse_devices(&String::from_utf8_lossy(&output.stdout));

    devices
        .iter()
        .find(|d| d.is_physical)
        .or_else(|| devices.first())
        .cloned()
}
