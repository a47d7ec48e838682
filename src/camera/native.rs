//! Native camera backend on `nokhwa`.
//!
//! `nokhwa::Camera` is `!Send`, so each stream lives on its own thread for its
//! whole life: the thread opens the device, reports readiness back to
//! `open_stream`, then pumps decoded RGBA frames into the [`VideoFeed`] until
//! the handle is stopped or dropped.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use image::RgbaImage;
use log::{error, info, warn};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;

use super::backend::{video_channel, CameraBackend, VideoFeed, VideoHandle};
use super::types::{Capabilities, Capability, DeviceInfo, DeviceKind, Dimensions, StreamConstraints};
use super::CameraError;

const TARGET_FPS: u32 = 30;
const FRAME_RETRY_DELAY: Duration = Duration::from_millis(50);

pub struct NativeCamera {
    api: ApiBackend,
}

impl NativeCamera {
    pub fn new() -> Option<Self> {
        nokhwa::native_api_backend().map(|api| Self { api })
    }
}

fn parse_index(device_id: &str) -> CameraIndex {
    match device_id.parse::<u32>() {
        Ok(index) => CameraIndex::Index(index),
        Err(_) => CameraIndex::String(device_id.to_string()),
    }
}

fn backend_error(context: &str, err: impl std::fmt::Display) -> CameraError {
    CameraError::Backend(format!("{context}: {err}"))
}

fn range(values: impl Iterator<Item = f64>) -> Option<Capability> {
    values.fold(None, |acc, value| match acc {
        None => Some(Capability::Range { min: value, max: value }),
        Some(Capability::Range { min, max }) => Some(Capability::Range {
            min: min.min(value),
            max: max.max(value),
        }),
        other => other,
    })
}

impl CameraBackend for NativeCamera {
    fn name(&self) -> &'static str {
        "native"
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CameraError> {
        let cameras = nokhwa::query(self.api).map_err(|e| backend_error("query cameras", e))?;

        Ok(cameras
            .into_iter()
            .map(|info| DeviceInfo {
                device_id: info.index().as_string(),
                label: info.human_name(),
                kind: DeviceKind::VideoInput,
            })
            .collect())
    }

    fn capabilities(&self, device_id: &str) -> Result<Capabilities, CameraError> {
        let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::None);
        let mut camera = Camera::new(parse_index(device_id), requested)
            .map_err(|e| backend_error("open camera", e))?;
        let formats = camera
            .compatible_camera_formats()
            .map_err(|e| backend_error("read formats", e))?;

        let mut caps = Capabilities::new();
        if let Some(width) = range(formats.iter().map(|f| f64::from(f.width()))) {
            caps.insert("width".into(), width);
        }
        if let Some(height) = range(formats.iter().map(|f| f64::from(f.height()))) {
            caps.insert("height".into(), height);
        }
        if let Some(rate) = range(formats.iter().map(|f| f64::from(f.frame_rate()))) {
            caps.insert("frameRate".into(), rate);
        }
        Ok(caps)
    }

    fn open_stream(&self, constraints: &StreamConstraints) -> Result<VideoHandle, CameraError> {
        let device_id = match &constraints.device_id {
            Some(id) => id.clone(),
            None => self
                .list_devices()?
                .into_iter()
                .next()
                .map(|d| d.device_id)
                .ok_or(CameraError::NoDevices)?,
        };

        let (feed, handle) = video_channel(device_id.clone());
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CameraError>>();
        let ideal = constraints.ideal;

        thread::Builder::new()
            .name(format!("camera-{device_id}"))
            .spawn(move || capture_thread(device_id, ideal, feed, ready_tx))
            .map_err(|e| backend_error("spawn capture thread", e))?;

        ready_rx
            .recv()
            .map_err(|_| CameraError::StreamEnded)??;

        Ok(handle)
    }
}

fn capture_thread(
    device_id: String,
    ideal: Dimensions,
    feed: VideoFeed,
    ready_tx: mpsc::Sender<Result<(), CameraError>>,
) {
    let format = CameraFormat::new(
        Resolution::new(ideal.width, ideal.height),
        FrameFormat::MJPEG,
        TARGET_FPS,
    );
    let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(format));

    let mut camera = match Camera::new(parse_index(&device_id), requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready_tx.send(Err(backend_error("open camera", e)));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = ready_tx.send(Err(backend_error("open stream", e)));
        return;
    }

    if ready_tx.send(Ok(())).is_err() {
        error!("Stream requester for {device_id} went away before the camera was ready");
        let _ = camera.stop_stream();
        return;
    }

    let resolution = camera.resolution();
    let native = Dimensions::new(resolution.width(), resolution.height());
    info!(
        "Camera {device_id} streaming at {}x{} (ideal {}x{})",
        native.width, native.height, ideal.width, ideal.height
    );
    feed.publish_metadata(native);

    while !feed.is_stopped() {
        let frame = match camera.frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to capture frame from {device_id}: {e}");
                thread::sleep(FRAME_RETRY_DELAY);
                continue;
            }
        };

        match frame.decode_image::<RgbAFormat>() {
            Ok(decoded) => {
                let (width, height) = decoded.dimensions();
                match RgbaImage::from_raw(width, height, decoded.into_raw()) {
                    Some(image) => feed.publish_frame(image),
                    None => warn!("Decoded frame from {device_id} has a short buffer"),
                }
            }
            Err(e) => warn!("Failed to decode frame from {device_id}: {e}"),
        }
    }

    if let Err(e) = camera.stop_stream() {
        warn!("Error stopping camera {device_id}: {e}");
    }
    info!("Camera {device_id} stopped");
}
