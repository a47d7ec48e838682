pub mod camera;
pub mod settings;
pub mod shell;
pub mod storage;
mod utils;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
use desktop::AppState;

#[cfg(feature = "desktop")]
mod desktop {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Context;
    use rand::Rng;
    use tauri::Manager;
    use tauri_plugin_opener::OpenerExt;

    use crate::camera::{
        archive::ArchiveClient,
        commands::{
            camera_archive, camera_download, camera_enumerate, camera_frame, camera_init,
            camera_resize, camera_share, camera_status, camera_switch_device,
            camera_switch_to_device, camera_take_photo, camera_teardown, camera_tick,
            camera_toggle_picture,
        },
        capture::ShareSheet,
        default_backend, CameraSession, CaptureServices,
    };
    use crate::settings::{debug_requested, ConfigStore};
    use crate::shell::{
        self,
        prompts::{answer_consent, ConsentBroker, WebviewConsent, WebviewShareSheet},
    };
    use crate::storage::{
        commands::{
            append_testimonial, append_ticket, get_config, get_testimonial, get_testimonials,
            get_ticket, get_tickets, get_words, open_storage_folder, set_config,
            set_testimonials, set_tickets, store_ticket, store_transcribe, store_transcribed,
            store_words,
        },
        InternalStorage,
    };

    pub(crate) struct AppState {
        pub(crate) camera: CameraSession,
        pub(crate) storage: InternalStorage,
        pub(crate) config: ConfigStore,
        pub(crate) consent: ConsentBroker,
    }

    #[tauri::command]
    fn open_external(app: tauri::AppHandle, url: String) -> Result<(), String> {
        log::info!("openExternal {url}");
        app.opener()
            .open_url(url, None::<&str>)
            .map_err(|e| e.to_string())
    }

    /// Debug helper for the bridge: answers after two seconds.
    #[tauri::command]
    async fn get_random_number() -> Result<u32, String> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(rand::thread_rng().gen_range(0..100))
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        // Initialize logging (reads RUST_LOG env var)
        let level = if debug_requested() {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();

        log::info!("Magic Mirror starting up...");

        tauri::Builder::default()
            .plugin(tauri_plugin_opener::init())
            .menu(shell::build_menu)
            .on_menu_event(shell::handle_menu_event)
            .on_page_load(shell::notify_role)
            .setup(|app| {
                let result = (|| -> anyhow::Result<()> {
                    let app_data_dir = app
                        .path()
                        .app_data_dir()
                        .map_err(|err| anyhow::anyhow!(err))?;
                    std::fs::create_dir_all(&app_data_dir)?;

                    let storage = InternalStorage::init(&app_data_dir)
                        .context("Failed to initialise internal storage")?;
                    let config = ConfigStore::new(storage.config_path())?;
                    let effective = config.effective();

                    let archive = ArchiveClient::new(
                        &effective.archive.base_url,
                        Duration::from_secs(effective.archive.timeout_secs),
                    )?;
                    log::info!("Archiving to {}", archive.endpoint());

                    let consent = ConsentBroker::default();
                    let services = CaptureServices {
                        archive,
                        consent: Arc::new(WebviewConsent::new(
                            app.handle().clone(),
                            consent.clone(),
                        )),
                        share_sheet: Some(Arc::new(WebviewShareSheet::new(app.handle().clone()))
                            as Arc<dyn ShareSheet>),
                        app_url: effective.share.app_url.clone(),
                    };
                    let camera = CameraSession::new(default_backend(), effective.camera, services);

                    app.manage(AppState {
                        camera,
                        storage,
                        config,
                        consent,
                    });

                    shell::create_windows(app.handle())?;
                    shell::schedule_fullscreen(app.handle().clone());

                    Ok(())
                })();

                result.map_err(|err| err.into())
            })
            .invoke_handler(tauri::generate_handler![
                open_external,
                get_random_number,
                store_ticket,
                store_transcribe,
                store_transcribed,
                store_words,
                get_words,
                get_testimonials,
                get_testimonial,
                append_testimonial,
                set_testimonials,
                get_tickets,
                get_ticket,
                append_ticket,
                set_tickets,
                get_config,
                set_config,
                open_storage_folder,
                answer_consent,
                // Camera pipeline
                camera_enumerate,
                camera_init,
                camera_switch_device,
                camera_switch_to_device,
                camera_tick,
                camera_frame,
                camera_resize,
                camera_toggle_picture,
                camera_take_photo,
                camera_download,
                camera_share,
                camera_archive,
                camera_teardown,
                camera_status,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}
