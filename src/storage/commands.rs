//! Tauri commands for the local store.

use serde_json::Value;
use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;

use crate::storage::RecordKind;
use crate::AppState;

#[tauri::command]
pub async fn store_ticket(
    state: State<'_, AppState>,
    ticket_base64: String,
    uuid: String,
) -> Result<(), String> {
    log::info!("store-ticket {uuid}");
    state
        .storage
        .store_ticket(&uuid, &ticket_base64)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn store_transcribe(
    state: State<'_, AppState>,
    transcribe_base64: String,
    uuid: String,
) -> Result<(), String> {
    log::info!("store-transcribe {uuid}");
    state
        .storage
        .store_transcribe(&uuid, &transcribe_base64)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn store_transcribed(
    state: State<'_, AppState>,
    transcription: String,
    uuid: String,
) -> Result<(), String> {
    log::info!("store-transcribed {uuid}");
    state
        .storage
        .store_transcribed(&uuid, transcription)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn store_words(
    state: State<'_, AppState>,
    words: Vec<String>,
    uuid: String,
) -> Result<(), String> {
    log::info!("store-words {uuid}");
    state
        .storage
        .store_words(&uuid, words)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_words(state: State<'_, AppState>) -> Result<Vec<String>, String> {
    state.storage.get_words().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_testimonials(state: State<'_, AppState>) -> Result<Vec<Value>, String> {
    state
        .storage
        .get_records(RecordKind::Testimonials)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_testimonial(
    state: State<'_, AppState>,
    testimonial_id: String,
) -> Result<Option<Value>, String> {
    state
        .storage
        .get_record(RecordKind::Testimonials, &testimonial_id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn append_testimonial(
    state: State<'_, AppState>,
    testimonial: Value,
) -> Result<(), String> {
    state
        .storage
        .upsert_record(RecordKind::Testimonials, testimonial)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_testimonials(
    state: State<'_, AppState>,
    testimonials: Vec<Value>,
) -> Result<(), String> {
    state
        .storage
        .set_records(RecordKind::Testimonials, testimonials)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_tickets(state: State<'_, AppState>) -> Result<Vec<Value>, String> {
    state
        .storage
        .get_records(RecordKind::Tickets)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_ticket(
    state: State<'_, AppState>,
    ticket_id: String,
) -> Result<Option<Value>, String> {
    state
        .storage
        .get_record(RecordKind::Tickets, &ticket_id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn append_ticket(state: State<'_, AppState>, ticket: Value) -> Result<(), String> {
    state
        .storage
        .upsert_record(RecordKind::Tickets, ticket)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_tickets(state: State<'_, AppState>, tickets: Vec<Value>) -> Result<(), String> {
    state
        .storage
        .set_records(RecordKind::Tickets, tickets)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_config(state: State<'_, AppState>) -> Result<Value, String> {
    Ok(state.config.get_json())
}

/// Stores the record as given. Camera and archive settings take effect on the
/// next start.
#[tauri::command]
pub fn set_config(state: State<'_, AppState>, config: Value) -> Result<(), String> {
    state
        .config
        .set_json(config)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn open_storage_folder(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    let path = state.storage.root().to_string_lossy().into_owned();
    app.opener()
        .open_path(path, None::<&str>)
        .map_err(|e| e.to_string())
}
