use super::backend::VideoHandle;
use super::devices::Enumeration;
use super::surfaces::CanvasManager;
use super::types::{DeviceDescriptor, Dimensions};

/// Mutable state of one camera session, passed by reference to every
/// pipeline step.
#[derive(Debug)]
pub struct ProcessorState {
    pub running: bool,
    pub video_permission: bool,
    pub enumerated: bool,
    pub devices: Vec<DeviceDescriptor>,
    pub current_device_id: Option<String>,
    pub video: Option<VideoHandle>,
    pub canvas: CanvasManager,
    pub resolution_scaling: u32,
}

impl Default for ProcessorState {
    fn default() -> Self {
        Self {
            running: true,
            video_permission: true,
            enumerated: false,
            devices: Vec::new(),
            current_device_id: None,
            video: None,
            canvas: CanvasManager::new(),
            resolution_scaling: 2,
        }
    }
}

impl ProcessorState {
    pub fn new(resolution_scaling: u32) -> Self {
        Self {
            resolution_scaling,
            ..Self::default()
        }
    }

    /// Takes a fresh device list. A bound stream whose device is still
    /// listed stays current; otherwise the enumeration default does.
    pub fn apply_enumeration(&mut self, enumeration: &Enumeration) {
        self.enumerated = true;
        self.video_permission = enumeration.permission;
        self.devices = enumeration.devices.clone();

        let bound = self
            .video
            .as_ref()
            .map(|video| video.device_id().to_string())
            .filter(|id| self.has_device(id));
        self.current_device_id = bound.or_else(|| enumeration.default_device_id.clone());
    }

    pub fn has_device(&self, device_id: &str) -> bool {
        self.devices.iter().any(|d| d.device_id == device_id)
    }

    pub fn video_dimensions(&self) -> Option<Dimensions> {
        self.video.as_ref().and_then(VideoHandle::dimensions)
    }
}
