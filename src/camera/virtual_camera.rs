//! Synthetic camera backend.
//!
//! Each device streams a solid colour at a fixed resolution from its own
//! thread. Used by the tests and as the fallback when no native backend is
//! compiled in or the platform has none.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use image::{Rgba, RgbaImage};

use super::backend::{video_channel, CameraBackend, VideoHandle};
use super::types::{Capabilities, Capability, DeviceInfo, DeviceKind, Dimensions, StreamConstraints, FACING_MODE};
use super::CameraError;

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone)]
pub struct VirtualDevice {
    pub device_id: String,
    pub label: String,
    pub kind: DeviceKind,
    pub capabilities: Capabilities,
    pub resolution: Dimensions,
    pub color: Rgba<u8>,
    /// Makes the capability probe fail, like runtimes without `getCapabilities`.
    pub probe_fails: bool,
    /// Makes every stream request for this device fail, as if it were busy.
    pub stream_fails: bool,
}

impl VirtualDevice {
    pub fn new(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
            capabilities: Capabilities::new(),
            resolution: Dimensions::new(640, 480),
            color: Rgba([128, 128, 128, 255]),
            probe_fails: false,
            stream_fails: false,
        }
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Dimensions::new(width, height);
        self
    }

    pub fn color(mut self, color: [u8; 4]) -> Self {
        self.color = Rgba(color);
        self
    }

    pub fn facing(mut self, mode: &str) -> Self {
        self.capabilities
            .insert(FACING_MODE.into(), Capability::Values(vec![mode.to_string()]));
        self
    }

    pub fn kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    pub fn failing_stream(mut self) -> Self {
        self.stream_fails = true;
        self
    }
}

pub struct VirtualCamera {
    devices: Vec<VirtualDevice>,
    permission_granted: bool,
    frame_interval: Duration,
    opened: Arc<Mutex<Vec<String>>>,
}

impl VirtualCamera {
    pub fn new(devices: Vec<VirtualDevice>) -> Self {
        Self {
            devices,
            permission_granted: true,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_default_device() -> Self {
        Self::new(vec![VirtualDevice::new("virtual-0", "Virtual Front Camera")
            .facing("user")
            .color([40, 120, 200, 255])])
    }

    /// Every stream request is refused, as if the user declined the prompt.
    pub fn deny_permission(mut self) -> Self {
        self.permission_granted = false;
        self
    }

    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Device ids of every stream opened so far, permission probes included.
    pub fn opened_devices(&self) -> Vec<String> {
        self.opened
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn find(&self, device_id: &str) -> Option<&VirtualDevice> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }
}

impl CameraBackend for VirtualCamera {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CameraError> {
        Ok(self
            .devices
            .iter()
            .map(|d| DeviceInfo {
                device_id: d.device_id.clone(),
                label: d.label.clone(),
                kind: d.kind,
            })
            .collect())
    }

    fn capabilities(&self, device_id: &str) -> Result<Capabilities, CameraError> {
        let device = self
            .find(device_id)
            .ok_or_else(|| CameraError::DeviceNotFound(device_id.to_string()))?;
        if device.probe_fails {
            return Err(CameraError::Backend("capabilities are not supported".into()));
        }
        Ok(device.capabilities.clone())
    }

    fn open_stream(&self, constraints: &StreamConstraints) -> Result<VideoHandle, CameraError> {
        if !self.permission_granted {
            return Err(CameraError::PermissionDenied);
        }

        let device = match &constraints.device_id {
            Some(id) => self
                .find(id)
                .filter(|d| d.kind == DeviceKind::VideoInput)
                .ok_or_else(|| CameraError::DeviceNotFound(id.clone()))?,
            None => self
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::VideoInput)
                .ok_or(CameraError::NoDevices)?,
        }
        .clone();

        if device.stream_fails {
            return Err(CameraError::Backend(format!(
                "device {} is busy",
                device.device_id
            )));
        }

        if let Ok(mut opened) = self.opened.lock() {
            opened.push(device.device_id.clone());
        }

        let (feed, handle) = video_channel(device.device_id.clone());
        let interval = self.frame_interval;

        thread::Builder::new()
            .name(format!("virtual-camera-{}", device.device_id))
            .spawn(move || {
                let Dimensions { width, height } = device.resolution;
                feed.publish_metadata(device.resolution);
                while !feed.is_stopped() {
                    feed.publish_frame(RgbaImage::from_pixel(width, height, device.color));
                    thread::sleep(interval);
                }
            })
            .map_err(|e| CameraError::Backend(e.to_string()))?;

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn streams_solid_frames_at_device_resolution() {
        let camera = VirtualCamera::new(vec![VirtualDevice::new("a", "A")
            .resolution(8, 6)
            .color([255, 0, 0, 255])]);

        let mut handle = camera
            .open_stream(&StreamConstraints::exact("a", Dimensions::new(640, 480)))
            .unwrap();
        assert_eq!(handle.loaded_metadata().await.unwrap(), Dimensions::new(8, 6));
        handle.loaded_data().await.unwrap();

        let frame = handle.current_frame().unwrap();
        assert_eq!(frame.dimensions(), (8, 6));
        assert_eq!(frame.get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(camera.opened_devices(), vec!["a".to_string()]);
    }

    #[test]
    fn refuses_streams_without_permission() {
        let camera = VirtualCamera::with_default_device().deny_permission();
        let result = camera.open_stream(&StreamConstraints::any(Dimensions::new(640, 480)));
        assert!(matches!(result, Err(CameraError::PermissionDenied)));
    }

    #[test]
    fn unknown_or_non_video_devices_are_not_found() {
        let camera = VirtualCamera::new(vec![
            VirtualDevice::new("mic", "Mic").kind(DeviceKind::AudioInput),
        ]);
        let ideal = Dimensions::new(640, 480);

        assert!(matches!(
            camera.open_stream(&StreamConstraints::exact("mic", ideal)),
            Err(CameraError::DeviceNotFound(_))
        ));
        assert!(matches!(
            camera.open_stream(&StreamConstraints::any(ideal)),
            Err(CameraError::NoDevices)
        ));
    }
}
