use std::sync::Arc;
use std::time::Duration;

use super::backend::{CameraBackend, VideoHandle};
use super::types::{Dimensions, StreamConstraints};
use super::CameraError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const STREAM_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Stops every track of the bound stream and detaches it.
pub fn release(slot: &mut Option<VideoHandle>) {
    if let Some(previous) = slot.take() {
        log_info!("Stopping stream for device {}", previous.device_id());
        previous.stop();
    }
}

/// Binds a fresh stream for `device_id` into `slot`, tearing down whatever
/// was bound before.
///
/// Returns once the stream's metadata and then its first frame have loaded.
/// On any failure the slot is left empty.
pub async fn acquire(
    backend: &Arc<dyn CameraBackend>,
    slot: &mut Option<VideoHandle>,
    device_id: &str,
    ideal: Dimensions,
) -> Result<Dimensions, CameraError> {
    release(slot);

    log_info!("Getting media stream for device {device_id}");
    let result = tokio::time::timeout(STREAM_READY_TIMEOUT, open_ready(backend, device_id, ideal))
        .await
        .unwrap_or(Err(CameraError::StreamTimeout));

    match result {
        Ok((handle, dimensions)) => {
            *slot = Some(handle);
            Ok(dimensions)
        }
        Err(err) => {
            log_error!("Error accessing media devices for {device_id}: {err}");
            Err(err)
        }
    }
}

async fn open_ready(
    backend: &Arc<dyn CameraBackend>,
    device_id: &str,
    ideal: Dimensions,
) -> Result<(VideoHandle, Dimensions), CameraError> {
    let constraints = StreamConstraints::exact(device_id, ideal);
    let backend = Arc::clone(backend);
    let mut handle = tokio::task::spawn_blocking(move || backend.open_stream(&constraints))
        .await
        .map_err(|e| CameraError::Backend(e.to_string()))??;

    let dimensions = handle.loaded_metadata().await?;
    log_info!("Video metadata loaded: {}x{}", dimensions.width, dimensions.height);

    handle.loaded_data().await?;
    log_info!("Video loaded");

    Ok((handle, dimensions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::virtual_camera::{VirtualCamera, VirtualDevice};

    fn backend() -> Arc<dyn CameraBackend> {
        Arc::new(VirtualCamera::new(vec![
            VirtualDevice::new("a", "A").resolution(32, 24),
            VirtualDevice::new("b", "B").resolution(16, 16),
        ]))
    }

    #[tokio::test]
    async fn acquiring_replaces_and_stops_previous_stream() {
        let backend = backend();
        let ideal = Dimensions::new(640, 480);
        let mut slot = None;

        let dims = acquire(&backend, &mut slot, "a", ideal).await.unwrap();
        assert_eq!(dims, Dimensions::new(32, 24));
        assert_eq!(slot.as_ref().unwrap().device_id(), "a");
        assert!(slot.as_ref().unwrap().current_frame().is_some());

        let dims = acquire(&backend, &mut slot, "b", ideal).await.unwrap();
        assert_eq!(dims, Dimensions::new(16, 16));
        assert_eq!(slot.as_ref().unwrap().device_id(), "b");
    }

    #[tokio::test]
    async fn failure_leaves_slot_empty() {
        let backend = backend();
        let ideal = Dimensions::new(640, 480);
        let mut slot = None;
        acquire(&backend, &mut slot, "a", ideal).await.unwrap();

        let err = acquire(&backend, &mut slot, "missing", ideal).await.unwrap_err();
        assert_eq!(err, CameraError::DeviceNotFound("missing".into()));
        assert!(slot.is_none());
    }
}
