//! Camera backend seam and the live video handle it hands out.
//!
//! A backend opens streams synchronously: `open_stream` returns once the
//! device is open (or has refused), mirroring a `getUserMedia` grant. Frames
//! then arrive on a producer thread through a [`VideoFeed`], and the session
//! reads them through the matching [`VideoHandle`].

use std::sync::Arc;

use image::RgbaImage;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::types::{Capabilities, DeviceInfo, Dimensions, StreamConstraints};
use super::CameraError;

pub trait CameraBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every device the platform reports, of any kind.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CameraError>;

    /// Capability set of one device, read through a short-lived stream.
    fn capabilities(&self, device_id: &str) -> Result<Capabilities, CameraError>;

    /// Opens a stream and starts producing frames. Blocks until the device is
    /// open; call it from a blocking-friendly context.
    fn open_stream(&self, constraints: &StreamConstraints) -> Result<VideoHandle, CameraError>;
}

/// Producer half of a stream, owned by the backend's capture thread.
pub struct VideoFeed {
    metadata: watch::Sender<Option<Dimensions>>,
    frames: watch::Sender<Option<Arc<RgbaImage>>>,
    cancel: CancellationToken,
}

impl VideoFeed {
    pub fn publish_metadata(&self, dimensions: Dimensions) {
        let _ = self.metadata.send(Some(dimensions));
    }

    pub fn publish_frame(&self, frame: RgbaImage) {
        let _ = self.frames.send(Some(Arc::new(frame)));
    }

    /// True once the consumer stopped the stream or dropped its handle.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.frames.is_closed()
    }
}

/// Consumer half of a stream: the session's "video element".
///
/// Dropping the handle stops the stream.
pub struct VideoHandle {
    device_id: String,
    metadata: watch::Receiver<Option<Dimensions>>,
    frames: watch::Receiver<Option<Arc<RgbaImage>>>,
    cancel: CancellationToken,
}

pub fn video_channel(device_id: impl Into<String>) -> (VideoFeed, VideoHandle) {
    let (metadata_tx, metadata_rx) = watch::channel(None);
    let (frames_tx, frames_rx) = watch::channel(None);
    let cancel = CancellationToken::new();

    let feed = VideoFeed {
        metadata: metadata_tx,
        frames: frames_tx,
        cancel: cancel.clone(),
    };
    let handle = VideoHandle {
        device_id: device_id.into(),
        metadata: metadata_rx,
        frames: frames_rx,
        cancel,
    };
    (feed, handle)
}

impl VideoHandle {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Resolves once the native dimensions are known.
    pub async fn loaded_metadata(&mut self) -> Result<Dimensions, CameraError> {
        let guard = self
            .metadata
            .wait_for(Option::is_some)
            .await
            .map_err(|_| CameraError::StreamEnded)?;
        (*guard).ok_or(CameraError::StreamEnded)
    }

    /// Resolves once the first frame's pixels are available.
    pub async fn loaded_data(&mut self) -> Result<(), CameraError> {
        self.frames
            .wait_for(Option::is_some)
            .await
            .map(|_| ())
            .map_err(|_| CameraError::StreamEnded)
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        *self.metadata.borrow()
    }

    pub fn current_frame(&self) -> Option<Arc<RgbaImage>> {
        self.frames.borrow().clone()
    }

    /// Stops all tracks. The producer notices on its next iteration.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for VideoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoHandle")
            .field("device_id", &self.device_id())
            .field("dimensions", &self.dimensions())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Drop for VideoHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
