//! The camera session: one processor state, one backend, and the capture
//! services, shared by every command handler.

use std::io::Cursor;
use std::sync::Arc;

use chrono::Local;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use super::archive::ArchiveClient;
use super::backend::CameraBackend;
use super::capture::{
    artifact_filename, human_timestamp, is_mobile_user_agent, ArchiveOutcome, CaptureArtifact,
    CaptureError, ConsentPrompt, DownloadGuard, ShareOutcome, ShareRequest, ShareSheet,
    ARCHIVE_CONSENT_MESSAGE,
};
use super::devices::{self, next_device_id, Enumeration};
use super::pipeline::{self, TickOutcome};
use super::state::ProcessorState;
use super::stream;
use super::types::{DeviceDescriptor, Dimensions};
use super::CameraError;
use crate::settings::CameraSettings;
use crate::utils::data_uri;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Everything a capture needs besides pixels.
pub struct CaptureServices {
    pub archive: ArchiveClient,
    pub consent: Arc<dyn ConsentPrompt>,
    pub share_sheet: Option<Arc<dyn ShareSheet>>,
    pub app_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub running: bool,
    pub video_permission: bool,
    pub devices: Vec<DeviceDescriptor>,
    pub current_device_id: Option<String>,
    pub video: Option<Dimensions>,
    pub container: Option<Dimensions>,
    pub resize_registered: bool,
    pub processing_download: bool,
    pub resolution_scaling: u32,
    pub composites: u64,
}

#[derive(Clone)]
pub struct CameraSession {
    state: Arc<Mutex<ProcessorState>>,
    backend: Arc<dyn CameraBackend>,
    settings: CameraSettings,
    guard: DownloadGuard,
    composited: Arc<watch::Sender<u64>>,
    services: Arc<CaptureServices>,
}

impl CameraSession {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        settings: CameraSettings,
        services: CaptureServices,
    ) -> Self {
        let (composited, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(ProcessorState::new(settings.resolution_scaling))),
            backend,
            settings,
            guard: DownloadGuard::default(),
            composited: Arc::new(composited),
            services: Arc::new(services),
        }
    }

    pub async fn enumerate(&self) -> Enumeration {
        let mut state = self.state.lock().await;
        self.enumerate_into(&mut state).await
    }

    async fn enumerate_into(&self, state: &mut ProcessorState) -> Enumeration {
        let enumeration = devices::enumerate(
            Arc::clone(&self.backend),
            self.settings.ideal(),
            self.settings.capability_probe_retries,
            state.video.is_none(),
        )
        .await;
        state.apply_enumeration(&enumeration);
        enumeration
    }

    /// Enumerates if needed, binds the starting device and sets up the
    /// surfaces for `container`.
    ///
    /// Without camera permission the surfaces still come up, at the ideal
    /// resolution, so the advisory can be drawn; the returned status then
    /// has `video_permission == false`.
    pub async fn init(&self, container: Dimensions) -> Result<SessionStatus, CameraError> {
        let mut state = self.state.lock().await;
        if !state.enumerated {
            self.enumerate_into(&mut state).await;
        }

        if !state.video_permission {
            log_warn!("No camera permission, showing advisory");
            stream::release(&mut state.video);
            state.canvas.setup(Some(self.settings.ideal()), container)?;
            return Ok(self.status_of(&state));
        }

        let starting = self
            .settings
            .selection
            .resolve(&state.devices, state.current_device_id.as_deref());
        state.current_device_id = starting.clone();
        let device_id = starting.ok_or(CameraError::NoDevices)?;

        let dimensions = self.bind(&mut state, &device_id).await?;
        if state.canvas.setup(Some(dimensions), container)? {
            log_info!("Registered resize handling");
        }
        Ok(self.status_of(&state))
    }

    /// Cycles to the next enumerated device.
    pub async fn switch_device(&self) -> Result<String, CameraError> {
        let mut state = self.state.lock().await;
        let next = next_device_id(&state.devices, state.current_device_id.as_deref())
            .ok_or(CameraError::NoDevices)?;
        self.switch_locked(&mut state, next).await
    }

    pub async fn switch_to_device(&self, device_id: &str) -> Result<String, CameraError> {
        let mut state = self.state.lock().await;
        if !state.has_device(device_id) {
            return Err(CameraError::DeviceNotFound(device_id.to_string()));
        }
        self.switch_locked(&mut state, device_id.to_string()).await
    }

    async fn switch_locked(
        &self,
        state: &mut ProcessorState,
        device_id: String,
    ) -> Result<String, CameraError> {
        log_info!("Switching to device {device_id}");
        state.current_device_id = Some(device_id.clone());
        let dimensions = self.bind(state, &device_id).await?;
        state.canvas.on_video_changed(dimensions);
        Ok(device_id)
    }

    async fn bind(
        &self,
        state: &mut ProcessorState,
        device_id: &str,
    ) -> Result<Dimensions, CameraError> {
        stream::acquire(&self.backend, &mut state.video, device_id, self.settings.ideal()).await
    }

    pub async fn tick(&self) -> Result<TickOutcome, CameraError> {
        let mut state = self.state.lock().await;
        self.tick_locked(&mut state)
    }

    fn tick_locked(&self, state: &mut ProcessorState) -> Result<TickOutcome, CameraError> {
        let outcome = pipeline::tick(state)?;
        if outcome != TickOutcome::Paused {
            self.composited.send_modify(|count| *count += 1);
        }
        Ok(outcome)
    }

    /// Flips between running and paused, then runs one tick.
    pub async fn toggle_picture(&self) -> Result<TickOutcome, CameraError> {
        let mut state = self.state.lock().await;
        state.running = !state.running;
        log_info!("Picture {}", if state.running { "resumed" } else { "frozen" });
        self.tick_locked(&mut state)
    }

    pub async fn resize(&self, container: Dimensions) -> bool {
        let mut state = self.state.lock().await;
        let video = state.video_dimensions().or_else(|| {
            (!state.video_permission).then(|| self.settings.ideal())
        });
        state.canvas.on_resize(container, video)
    }

    /// The render surface as a JPEG data URI, for the on-screen preview.
    pub async fn preview_jpeg(&self) -> Result<String, CaptureError> {
        let render = {
            let state = self.state.lock().await;
            let surfaces = state.canvas.surfaces().ok_or(CameraError::MissingSurfaces)?;
            surfaces.render.image().clone()
        };

        let rgb = DynamicImage::ImageRgba8(render).to_rgb8();
        let mut jpeg = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
        Ok(data_uri::encode("image/jpeg", &jpeg))
    }

    /// Snapshots the render surface as PNG. Returns `None` when another
    /// download or share is already in flight.
    pub async fn download(&self) -> Result<Option<CaptureArtifact>, CaptureError> {
        let Some(_permit) = self.guard.try_acquire() else {
            log_info!("Download already in progress");
            return Ok(None);
        };
        self.capture(false).await.map(Some)
    }

    pub async fn take_photo(&self) -> Result<Option<CaptureArtifact>, CaptureError> {
        self.download().await
    }

    /// Desktop user agents fall back to a download. On mobile the picture is
    /// frozen, offered for archiving and handed to the share sheet.
    pub async fn share(&self, user_agent: &str) -> Result<Option<ShareOutcome>, CaptureError> {
        if !is_mobile_user_agent(user_agent) {
            return Ok(self
                .download()
                .await?
                .map(|artifact| ShareOutcome::Downloaded { artifact }));
        }

        let Some(_permit) = self.guard.try_acquire() else {
            log_info!("Share already in progress");
            return Ok(None);
        };
        let artifact = self.capture(true).await?;

        if let Err(err) = self.archive(&artifact.data_uri).await {
            log_error!("Error archiving image: {err}");
        }

        let Some(sheet) = self.services.share_sheet.as_ref() else {
            log_warn!("Sharing is not supported here, downloading instead");
            return Ok(Some(ShareOutcome::Downloaded { artifact }));
        };

        let request = ShareRequest::new(artifact, self.services.app_url.clone());
        sheet.share(&request)?;
        log_info!("Shared {}", request.artifact.filename);
        Ok(Some(ShareOutcome::Shared {
            artifact: request.artifact,
        }))
    }

    /// Asks for consent, then uploads the image to the archive.
    pub async fn archive(&self, data_uri: &str) -> Result<ArchiveOutcome, CaptureError> {
        if !self
            .services
            .consent
            .confirm(ARCHIVE_CONSENT_MESSAGE.to_string())
            .await
        {
            log_info!("Archiving declined");
            return Ok(ArchiveOutcome::Declined);
        }

        log_info!("Archiving image");
        let payload = data_uri::decode(data_uri)?;
        let filename = artifact_filename(&human_timestamp(Local::now()));
        self.services
            .archive
            .upload(&filename, payload.bytes)
            .await?;
        Ok(ArchiveOutcome::Archived { filename })
    }

    /// Forces a final composite while running, waits for it (bounded by the
    /// grace period) and encodes the render surface. A composite that cannot
    /// run for want of video is skipped; only missing surfaces fail.
    async fn capture(&self, pause: bool) -> Result<CaptureArtifact, CaptureError> {
        let mut composited = self.composited.subscribe();
        let seen = *composited.borrow_and_update();

        let forced = {
            let mut state = self.state.lock().await;
            if state.running {
                let ticked = match self.tick_locked(&mut state) {
                    Ok(_) => true,
                    Err(CameraError::MissingSurfaces) => {
                        log_error!("No rendering surface");
                        return Err(CameraError::MissingSurfaces.into());
                    }
                    // The render surface still holds the last composite.
                    Err(err) => {
                        log_warn!("Final composite skipped: {err}");
                        false
                    }
                };
                if pause {
                    state.running = false;
                }
                ticked
            } else {
                false
            }
        };

        if forced {
            let grace = self.settings.capture_grace();
            let waited = tokio::time::timeout(grace, composited.wait_for(|count| *count > seen));
            if waited.await.is_err() {
                log_warn!("No composite within {grace:?}, capturing as-is");
            }
        }

        let render = {
            let state = self.state.lock().await;
            let surfaces = state.canvas.surfaces().ok_or_else(|| {
                log_error!("No rendering surface");
                CameraError::MissingSurfaces
            })?;
            surfaces.render.image().clone()
        };
        CaptureArtifact::from_image(&render, Local::now())
    }

    /// Stops the stream, drops the surfaces and the resize handling.
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        stream::release(&mut state.video);
        state.canvas.teardown();
        log_info!("Camera session torn down");
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await;
        self.status_of(&state)
    }

    fn status_of(&self, state: &ProcessorState) -> SessionStatus {
        SessionStatus {
            running: state.running,
            video_permission: state.video_permission,
            devices: state.devices.clone(),
            current_device_id: state.current_device_id.clone(),
            video: state.video_dimensions(),
            container: state.canvas.container(),
            resize_registered: state.canvas.is_resize_registered(),
            processing_download: self.guard.is_busy(),
            resolution_scaling: state.resolution_scaling,
            composites: *self.composited.borrow(),
        }
    }

    /// Number of composites published so far.
    pub fn composites(&self) -> u64 {
        *self.composited.borrow()
    }

    /// Watch the composite counter; it bumps after every composite.
    pub fn subscribe_composites(&self) -> watch::Receiver<u64> {
        self.composited.subscribe()
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }
}
