//! Desktop shell: the two kiosk windows, their placement, the delayed
//! fullscreen hand-off and the application menu.

pub mod layout;
#[cfg(feature = "desktop")]
mod menu;
pub mod prompts;

#[cfg(feature = "desktop")]
pub use desktop::{create_windows, notify_role, schedule_fullscreen};
#[cfg(feature = "desktop")]
pub use menu::{build_menu, handle_menu_event};

#[cfg(feature = "desktop")]
mod desktop {
    use anyhow::{Context, Result};
    use tauri::webview::{PageLoadEvent, PageLoadPayload};
    use tauri::{
        AppHandle, Emitter, Manager, PhysicalPosition, PhysicalSize, Webview, WebviewUrl,
        WebviewWindow, WebviewWindowBuilder,
    };

    use super::layout::{
        plan_windows, role_event, DisplayBounds, DEFAULT_HEIGHT, DEFAULT_WIDTH, FULLSCREEN_ORDER,
        FULLSCREEN_STEP,
    };

    pub fn create_windows(app: &AppHandle) -> Result<()> {
        let displays = app
            .available_monitors()
            .context("Failed to list displays")?
            .iter()
            .map(|monitor| DisplayBounds {
                x: monitor.position().x,
                y: monitor.position().y,
                width: monitor.size().width,
                height: monitor.size().height,
            })
            .collect::<Vec<_>>();
        log::info!("Found {} display(s)", displays.len());

        for plan in plan_windows(&displays) {
            let window =
                WebviewWindowBuilder::new(app, plan.label, WebviewUrl::App("index.html".into()))
                    .title("Magic Mirror")
                    .inner_size(DEFAULT_WIDTH, DEFAULT_HEIGHT)
                    .build()
                    .with_context(|| format!("Failed to create {} window", plan.label))?;

            if let Some(bounds) = plan.bounds {
                window.set_position(PhysicalPosition::new(bounds.x, bounds.y))?;
                window.set_size(PhysicalSize::new(bounds.width, bounds.height))?;
            }
        }
        Ok(())
    }

    /// Cloud first, then main, each after one step's delay: fullscreen,
    /// maximise, reload.
    pub fn schedule_fullscreen(app: AppHandle) {
        tauri::async_runtime::spawn(async move {
            for label in FULLSCREEN_ORDER {
                tokio::time::sleep(FULLSCREEN_STEP).await;
                let Some(window) = app.get_webview_window(label) else {
                    log::warn!("Window {label} is gone, skipping fullscreen");
                    continue;
                };
                if let Err(err) = go_fullscreen(&window) {
                    log::error!("Failed to make {label} fullscreen: {err}");
                }
            }
        });
    }

    fn go_fullscreen(window: &WebviewWindow) -> tauri::Result<()> {
        window.set_fullscreen(true)?;
        window.maximize()?;
        window.eval("window.location.reload()")
    }

    /// Tells a window's page which role it plays once it has loaded.
    pub fn notify_role(webview: &Webview, payload: &PageLoadPayload<'_>) {
        if payload.event() != PageLoadEvent::Finished {
            return;
        }
        let label = webview.label();
        let Some(event) = role_event(label) else {
            return;
        };
        if let Err(err) = webview.app_handle().emit_to(label, event, ()) {
            log::error!("Failed to send {event} to {label}: {err}");
        }
    }
}
