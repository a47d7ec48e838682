use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::backend::CameraBackend;
use super::types::{Capabilities, DeviceDescriptor, DeviceKind, Dimensions, StreamConstraints};
use super::CameraError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const PROBE_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Result of one enumeration pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enumeration {
    /// False when the permission probe was refused; `devices` is then empty.
    pub permission: bool,
    pub devices: Vec<DeviceDescriptor>,
    pub default_device_id: Option<String>,
}

/// How the session picks its starting device. Resolved once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum DeviceSelectionPolicy {
    /// Start on the enumeration default and honour every explicit switch.
    #[default]
    Explicit,
    /// Start on the first device whose label contains `label`, if present.
    PreferLabel { label: String },
}

impl DeviceSelectionPolicy {
    pub fn resolve(&self, devices: &[DeviceDescriptor], default: Option<&str>) -> Option<String> {
        if let DeviceSelectionPolicy::PreferLabel { label } = self {
            if let Some(device) = devices.iter().find(|d| d.label.contains(label.as_str())) {
                return Some(device.device_id.clone());
            }
            log_warn!("Preferred video device '{label}' not found, using default");
        }
        default.map(str::to_string)
    }
}

/// Front-facing device if any (label says "front" or it faces the user),
/// otherwise the first one.
pub fn select_default(devices: &[DeviceDescriptor]) -> Option<&DeviceDescriptor> {
    devices
        .iter()
        .find(|d| {
            d.label.to_lowercase().contains("front") || d.facing_modes().iter().any(|m| m == "user")
        })
        .or_else(|| devices.first())
}

/// The device after `current`, wrapping around. An unknown current id starts
/// over at the first device.
pub fn next_device_id(devices: &[DeviceDescriptor], current: Option<&str>) -> Option<String> {
    if devices.is_empty() {
        return None;
    }
    let next = match current.and_then(|id| devices.iter().position(|d| d.device_id == id)) {
        Some(index) => (index + 1) % devices.len(),
        None => 0,
    };
    Some(devices[next].device_id.clone())
}

/// Lists video inputs and picks the default.
///
/// `probe_permission` is false while the caller already holds a live stream:
/// that stream is proof of permission, and a second open may find the device
/// busy.
pub async fn enumerate(
    backend: Arc<dyn CameraBackend>,
    ideal: Dimensions,
    probe_retries: u32,
    probe_permission: bool,
) -> Enumeration {
    if probe_permission {
        if let Err(err) = request_permission(Arc::clone(&backend), ideal).await {
            log_error!("Error accessing media devices: {err}");
            return Enumeration::default();
        }
    }

    let listing = {
        let backend = Arc::clone(&backend);
        tokio::task::spawn_blocking(move || backend.list_devices()).await
    };
    let listed = match listing {
        Ok(Ok(listed)) => listed,
        Ok(Err(err)) => {
            log_error!("Device enumeration failed: {err}");
            Vec::new()
        }
        Err(err) => {
            log_error!("Device enumeration worker failed: {err}");
            Vec::new()
        }
    };

    let mut devices = Vec::new();
    for info in listed {
        if info.kind != DeviceKind::VideoInput || info.device_id.is_empty() {
            continue;
        }
        let capabilities =
            probe_capabilities(Arc::clone(&backend), &info.device_id, &info.label, probe_retries)
                .await;
        devices.push(DeviceDescriptor {
            device_id: info.device_id,
            label: info.label,
            capabilities,
        });
    }

    let default_device_id = select_default(&devices).map(|d| d.device_id.clone());
    log_info!(
        "Enumerated {} video device(s) on {} backend, default {:?}",
        devices.len(),
        backend.name(),
        default_device_id
    );

    Enumeration {
        permission: true,
        devices,
        default_device_id,
    }
}

/// Opens and immediately stops a throwaway stream so later listings carry
/// real labels.
async fn request_permission(
    backend: Arc<dyn CameraBackend>,
    ideal: Dimensions,
) -> Result<(), CameraError> {
    let handle = tokio::task::spawn_blocking(move || {
        backend.open_stream(&StreamConstraints::any(ideal))
    })
    .await
    .map_err(|e| CameraError::Backend(e.to_string()))??;
    handle.stop();
    Ok(())
}

/// Capability read for one device. Failures are swallowed into an empty set.
async fn probe_capabilities(
    backend: Arc<dyn CameraBackend>,
    device_id: &str,
    label: &str,
    retries: u32,
) -> Capabilities {
    let mut attempt = 0;
    loop {
        let result = {
            let backend = Arc::clone(&backend);
            let device_id = device_id.to_string();
            tokio::task::spawn_blocking(move || backend.capabilities(&device_id)).await
        };

        let err = match result {
            Ok(Ok(capabilities)) => return capabilities,
            Ok(Err(err)) => err.to_string(),
            Err(join_err) => join_err.to_string(),
        };

        if attempt >= retries {
            log_warn!("Error getting capabilities for device {label}: {err}");
            return Capabilities::new();
        }
        attempt += 1;
        tokio::time::sleep(PROBE_RETRY_BACKOFF).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::types::{Capability, FACING_MODE};
    use crate::camera::virtual_camera::{VirtualCamera, VirtualDevice};
    use std::time::Instant;

    const IDEAL: Dimensions = Dimensions {
        width: 640,
        height: 480,
    };

    fn mixed_devices() -> Arc<dyn CameraBackend> {
        Arc::new(VirtualCamera::new(vec![
            VirtualDevice::new("mic", "Built-in Microphone").kind(DeviceKind::AudioInput),
            VirtualDevice::new("", "Unnamed Camera"),
            VirtualDevice::new("usb", "USB Camera").failing_probe(),
            VirtualDevice::new("cam", "Integrated Camera").facing("user"),
        ]))
    }

    fn device(id: &str, label: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            device_id: id.into(),
            label: label.into(),
            capabilities: Capabilities::new(),
        }
    }

    #[test]
    fn front_label_wins_regardless_of_position() {
        let devices = vec![device("b", "Rear Camera"), device("a", "FRONT Camera")];
        assert_eq!(select_default(&devices).unwrap().device_id, "a");
    }

    #[test]
    fn user_facing_capability_counts_as_front() {
        let mut user = device("u", "Integrated");
        user.capabilities
            .insert(FACING_MODE.into(), Capability::Values(vec!["user".into()]));
        let devices = vec![device("x", "USB"), user];
        assert_eq!(select_default(&devices).unwrap().device_id, "u");
    }

    #[test]
    fn first_device_without_front_hint() {
        let devices = vec![device("x", "USB"), device("y", "Other")];
        assert_eq!(select_default(&devices).unwrap().device_id, "x");
        assert!(select_default(&[]).is_none());
    }

    #[test]
    fn switching_k_times_cycles_back() {
        let devices = vec![device("a", "A"), device("b", "B"), device("c", "C")];
        let mut current = Some("a".to_string());
        for _ in 0..devices.len() {
            current = next_device_id(&devices, current.as_deref());
        }
        assert_eq!(current.as_deref(), Some("a"));
        assert_eq!(next_device_id(&devices, Some("gone")).as_deref(), Some("a"));
        assert_eq!(next_device_id(&[], Some("a")), None);
    }

    #[test]
    fn prefer_label_overrides_default_only_when_present() {
        let devices = vec![device("a", "Front Camera"), device("c920", "HD Pro Webcam C920")];
        let policy = DeviceSelectionPolicy::PreferLabel {
            label: "C920".into(),
        };
        assert_eq!(policy.resolve(&devices, Some("a")).as_deref(), Some("c920"));

        let without = vec![device("a", "Front Camera")];
        assert_eq!(policy.resolve(&without, Some("a")).as_deref(), Some("a"));
        assert_eq!(
            DeviceSelectionPolicy::Explicit.resolve(&devices, Some("a")).as_deref(),
            Some("a")
        );
    }

    #[test]
    fn policy_round_trips_through_config_json() {
        let policy: DeviceSelectionPolicy =
            serde_json::from_str(r#"{"mode":"preferLabel","label":"C920"}"#).unwrap();
        assert_eq!(
            policy,
            DeviceSelectionPolicy::PreferLabel {
                label: "C920".into()
            }
        );
        let explicit: DeviceSelectionPolicy = serde_json::from_str(r#"{"mode":"explicit"}"#).unwrap();
        assert_eq!(explicit, DeviceSelectionPolicy::Explicit);
    }

    #[tokio::test]
    async fn enumeration_keeps_only_video_inputs_with_ids() {
        let enumeration = enumerate(mixed_devices(), IDEAL, 0, true).await;

        assert!(enumeration.permission);
        let ids: Vec<_> = enumeration.devices.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["usb", "cam"]);
        assert_eq!(enumeration.default_device_id.as_deref(), Some("cam"));
    }

    #[tokio::test]
    async fn unreadable_capabilities_keep_device_with_empty_set() {
        let enumeration = enumerate(mixed_devices(), IDEAL, 0, true).await;

        let usb = &enumeration.devices[0];
        assert_eq!(usb.label, "USB Camera");
        assert!(usb.capabilities.is_empty());
        assert_eq!(enumeration.devices[1].facing_modes(), vec!["user".to_string()]);
    }

    #[tokio::test]
    async fn retried_capability_read_still_ends_empty() {
        let backend: Arc<dyn CameraBackend> =
            Arc::new(VirtualCamera::new(vec![VirtualDevice::new("usb", "USB").failing_probe()]));

        let started = Instant::now();
        let enumeration = enumerate(backend, IDEAL, 2, true).await;

        assert!(started.elapsed() >= PROBE_RETRY_BACKOFF * 2);
        assert_eq!(enumeration.devices.len(), 1);
        assert!(enumeration.devices[0].capabilities.is_empty());
    }

    #[tokio::test]
    async fn refused_permission_lists_nothing() {
        let backend: Arc<dyn CameraBackend> =
            Arc::new(VirtualCamera::with_default_device().deny_permission());
        let enumeration = enumerate(backend, IDEAL, 0, true).await;

        assert!(!enumeration.permission);
        assert!(enumeration.devices.is_empty());
        assert_eq!(enumeration.default_device_id, None);
    }

    #[tokio::test]
    async fn held_stream_lists_without_reopening_a_device() {
        let camera = Arc::new(VirtualCamera::with_default_device().deny_permission());
        let backend: Arc<dyn CameraBackend> = camera.clone();
        let enumeration = enumerate(backend, IDEAL, 0, false).await;

        assert!(enumeration.permission);
        assert_eq!(enumeration.default_device_id.as_deref(), Some("virtual-0"));
        assert!(camera.opened_devices().is_empty());
    }
}
