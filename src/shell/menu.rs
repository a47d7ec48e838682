use tauri::menu::{Menu, MenuBuilder, MenuEvent, MenuItemBuilder, SubmenuBuilder};
use tauri::{AppHandle, Manager};
use tauri_plugin_opener::OpenerExt;

use crate::AppState;

const OPEN_TESTIMONIALS: &str = "open-testimonials-folder";

pub fn build_menu(app: &AppHandle) -> tauri::Result<Menu<tauri::Wry>> {
    let open_testimonials =
        MenuItemBuilder::with_id(OPEN_TESTIMONIALS, "Open Testimonials Folder").build(app)?;

    let file = SubmenuBuilder::new(app, "File")
        .item(&open_testimonials)
        .separator()
        .quit()
        .build()?;
    let edit = SubmenuBuilder::new(app, "Edit")
        .undo()
        .redo()
        .separator()
        .cut()
        .copy()
        .paste()
        .separator()
        .select_all()
        .build()?;
    let view = SubmenuBuilder::new(app, "View").fullscreen().build()?;
    let window = SubmenuBuilder::new(app, "Window")
        .minimize()
        .close_window()
        .build()?;

    MenuBuilder::new(app)
        .items(&[&file, &edit, &view, &window])
        .build()
}

pub fn handle_menu_event(app: &AppHandle, event: MenuEvent) {
    if event.id().as_ref() != OPEN_TESTIMONIALS {
        return;
    }
    let Some(state) = app.try_state::<AppState>() else {
        log::warn!("Storage is not ready yet");
        return;
    };
    let path = state.storage.root().to_string_lossy().into_owned();
    if let Err(err) = app.opener().open_path(path, None::<&str>) {
        log::error!("Failed to open storage folder: {err}");
    }
}
