//! Camera processing pipeline.
//!
//! Device enumeration -> stream acquisition -> surface setup -> per-tick
//! draw/composite -> capture/export. The UI drives ticks; there is no
//! scheduler in here.

pub mod archive;
pub mod backend;
pub mod capture;
#[cfg(feature = "desktop")]
pub mod commands;
pub mod devices;
#[cfg(feature = "native-camera")]
pub mod native;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod stream;
pub mod surfaces;
mod text;
pub mod types;
pub mod virtual_camera;

use std::sync::Arc;

use thiserror::Error;

pub use backend::{CameraBackend, VideoFeed, VideoHandle};
pub use capture::{ArchiveOutcome, CaptureArtifact, CaptureError, ShareOutcome};
pub use devices::{DeviceSelectionPolicy, Enumeration};
pub use pipeline::TickOutcome;
pub use session::{CameraSession, CaptureServices, SessionStatus};
pub use types::{Capabilities, Capability, DeviceDescriptor, Dimensions};
pub use virtual_camera::{VirtualCamera, VirtualDevice};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no video input devices available")]
    NoDevices,
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("stream ended before it was ready")]
    StreamEnded,
    #[error("timed out waiting for the stream to become ready")]
    StreamTimeout,
    #[error("no video stream bound")]
    MissingVideo,
    #[error("video has no frame yet")]
    MissingFrame,
    #[error("surfaces are not set up")]
    MissingSurfaces,
    #[error("video dimensions are not known yet")]
    UnknownVideoDimensions,
    #[error("camera backend error: {0}")]
    Backend(String),
}

/// Picks the camera backend for this build: the native one when compiled in
/// and available on the platform, the virtual camera otherwise.
pub fn default_backend() -> Arc<dyn CameraBackend> {
    #[cfg(feature = "native-camera")]
    {
        if let Some(native) = native::NativeCamera::new() {
            log::info!("Using native camera backend");
            return Arc::new(native);
        }
        log::warn!("No native camera backend available on this platform");
    }

    log::warn!("Falling back to the virtual camera");
    Arc::new(VirtualCamera::with_default_device())
}
