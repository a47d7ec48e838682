use tauri::State;

use crate::camera::{
    ArchiveOutcome, CameraSession, CaptureArtifact, Dimensions, Enumeration, SessionStatus,
    ShareOutcome, TickOutcome,
};
use crate::AppState;

fn session_from_state(state: &State<'_, AppState>) -> CameraSession {
    state.camera.clone()
}

#[tauri::command]
pub async fn camera_enumerate(state: State<'_, AppState>) -> Result<Enumeration, String> {
    let session = session_from_state(&state);
    Ok(session.enumerate().await)
}

#[tauri::command]
pub async fn camera_init(
    state: State<'_, AppState>,
    width: u32,
    height: u32,
) -> Result<SessionStatus, String> {
    let session = session_from_state(&state);
    session
        .init(Dimensions::new(width, height))
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn camera_switch_device(state: State<'_, AppState>) -> Result<String, String> {
    let session = session_from_state(&state);
    session.switch_device().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn camera_switch_to_device(
    state: State<'_, AppState>,
    device_id: String,
) -> Result<String, String> {
    let session = session_from_state(&state);
    session
        .switch_to_device(&device_id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn camera_tick(state: State<'_, AppState>) -> Result<TickOutcome, String> {
    let session = session_from_state(&state);
    session.tick().await.map_err(|e| e.to_string())
}

/// Current render surface as a JPEG data URI.
#[tauri::command]
pub async fn camera_frame(state: State<'_, AppState>) -> Result<String, String> {
    let session = session_from_state(&state);
    session.preview_jpeg().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn camera_resize(
    state: State<'_, AppState>,
    width: u32,
    height: u32,
) -> Result<bool, String> {
    let session = session_from_state(&state);
    Ok(session.resize(Dimensions::new(width, height)).await)
}

#[tauri::command]
pub async fn camera_toggle_picture(state: State<'_, AppState>) -> Result<TickOutcome, String> {
    let session = session_from_state(&state);
    session.toggle_picture().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn camera_take_photo(
    state: State<'_, AppState>,
) -> Result<Option<CaptureArtifact>, String> {
    let session = session_from_state(&state);
    session.take_photo().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn camera_download(
    state: State<'_, AppState>,
) -> Result<Option<CaptureArtifact>, String> {
    let session = session_from_state(&state);
    session.download().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn camera_share(
    state: State<'_, AppState>,
    user_agent: String,
) -> Result<Option<ShareOutcome>, String> {
    let session = session_from_state(&state);
    session.share(&user_agent).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn camera_archive(
    state: State<'_, AppState>,
    data_uri: String,
) -> Result<ArchiveOutcome, String> {
    let session = session_from_state(&state);
    session.archive(&data_uri).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn camera_teardown(state: State<'_, AppState>) -> Result<(), String> {
    let session = session_from_state(&state);
    session.teardown().await;
    Ok(())
}

#[tauri::command]
pub async fn camera_status(state: State<'_, AppState>) -> Result<SessionStatus, String> {
    let session = session_from_state(&state);
    Ok(session.status().await)
}
