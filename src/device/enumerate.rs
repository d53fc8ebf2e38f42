//! Discovery of attached cameras.
//!
//! Only the presence of a plausible camera matters here; which index it
//! opens at is found later by probing.

use super::backend::DeviceInfo;

/// Whether a reported device looks like an external camera.
pub fn is_camera_candidate(info: &DeviceInfo) -> bool {
    let name = info.name.to_lowercase();
    let description = info.description.to_lowercase();
    let mentions_camera = |s: &str| s.contains("camera") || s.contains("webcam");

    mentions_camera(&name) || mentions_camera(&description) || info.bus_path.contains("/usb")
}

/// Lists attached video devices that look like cameras.
pub fn list_usb_cameras() -> Vec<DeviceInfo> {
    let cameras: Vec<DeviceInfo> = enumerate_video_devices()
        .into_iter()
        .filter(|info| {
            let candidate = is_camera_candidate(info);
            if candidate {
                tracing::debug!(name = %info.name, description = %info.description, "Detected camera");
            }
            candidate
        })
        .collect();

    tracing::debug!(count = cameras.len(), "Total cameras detected");
    cameras
}

/// Reads `/sys/class/video4linux`.
#[cfg(target_os = "linux")]
pub fn enumerate_video_devices() -> Vec<DeviceInfo> {
    use std::fs;
    use std::path::Path;

    let root = Path::new("/sys/class/video4linux");
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::trace!(?e, "video4linux not available");
            return Vec::new();
        }
    };

    let read_trimmed = |path: &Path| {
        fs::read_to_string(path)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let path = entry.path();
            let bus_path = fs::canonicalize(path.join("device"))
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            DeviceInfo {
                name: read_trimmed(&path.join("name")),
                description: read_trimmed(&path.join("device").join("interface")),
                bus_path,
            }
        })
        .collect()
}

/// Platforms without an enumerator report one placeholder so probing runs.
#[cfg(not(target_os = "linux"))]
pub fn enumerate_video_devices() -> Vec<DeviceInfo> {
    vec![DeviceInfo::unenumerated()]
}
