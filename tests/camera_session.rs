//! End-to-end camera session runs on the virtual camera.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use image::Rgba;
use magic_mirror_lib::camera::archive::ArchiveClient;
use magic_mirror_lib::camera::capture::{ConsentPrompt, FixedConsent};
use magic_mirror_lib::camera::{
    ArchiveOutcome, CameraBackend, CameraSession, CaptureServices, Dimensions, ShareOutcome,
    TickOutcome, VirtualCamera, VirtualDevice,
};
use magic_mirror_lib::settings::CameraSettings;
use tokio::sync::Notify;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)";

fn services(archive_url: &str, consent: Arc<dyn ConsentPrompt>) -> CaptureServices {
    CaptureServices {
        archive: ArchiveClient::new(archive_url, Duration::from_secs(5)).expect("client"),
        consent,
        share_sheet: None,
        app_url: String::new(),
    }
}

fn session_with(backend: Arc<dyn CameraBackend>, consent: Arc<dyn ConsentPrompt>) -> CameraSession {
    CameraSession::new(
        backend,
        CameraSettings::default(),
        services("http://127.0.0.1:9", consent),
    )
}

/// Holds the visitor's answer until the test releases it.
#[derive(Default)]
struct GatedConsent {
    asked: Notify,
    release: Notify,
}

impl ConsentPrompt for GatedConsent {
    fn confirm(&self, _message: String) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            self.asked.notify_one();
            self.release.notified().await;
            false
        })
    }
}

#[tokio::test]
async fn front_camera_is_default_and_switching_cycles() {
    let camera = Arc::new(VirtualCamera::new(vec![
        VirtualDevice::new("a", "Back Camera").resolution(64, 48),
        VirtualDevice::new("b", "Front Camera").resolution(32, 24),
    ]));
    let backend: Arc<dyn CameraBackend> = camera.clone();
    let session = session_with(backend, Arc::new(FixedConsent(false)));

    let enumeration = session.enumerate().await;
    assert!(enumeration.permission);
    assert_eq!(enumeration.default_device_id.as_deref(), Some("b"));

    let status = session.init(Dimensions::new(100, 50)).await.expect("init");
    assert_eq!(status.current_device_id.as_deref(), Some("b"));
    assert_eq!(status.video, Some(Dimensions::new(32, 24)));

    assert_eq!(session.switch_device().await.expect("to a"), "a");
    assert_eq!(session.status().await.video, Some(Dimensions::new(64, 48)));
    assert_eq!(session.switch_device().await.expect("back to b"), "b");
    assert_eq!(session.status().await.current_device_id.as_deref(), Some("b"));

    assert_eq!(session.tick().await, Ok(TickOutcome::Rendered));
    assert_eq!(camera.opened_devices().last().map(String::as_str), Some("b"));
}

#[tokio::test]
async fn wide_video_is_letterboxed_into_the_container() {
    let camera = VirtualCamera::new(vec![VirtualDevice::new("hd", "Front HD")
        .resolution(1280, 720)
        .color([255, 0, 0, 255])]);
    let session = session_with(Arc::new(camera), Arc::new(FixedConsent(false)));
    session.init(Dimensions::new(900, 480)).await.expect("init");

    assert_eq!(session.tick().await, Ok(TickOutcome::Rendered));
    let artifact = session.download().await.expect("download").expect("artifact");
    let render = image::load_from_memory(&artifact.png).expect("png").to_rgba8();

    let white = Rgba([255, 255, 255, 255]);
    let red = Rgba([255, 0, 0, 255]);
    assert_eq!(render.dimensions(), (900, 480));
    assert_eq!(render.get_pixel(10, 240), &white);
    assert_eq!(render.get_pixel(21, 240), &white);
    assert_eq!(render.get_pixel(25, 240), &red);
    assert_eq!(render.get_pixel(450, 240), &red);
    assert_eq!(render.get_pixel(873, 240), &red);
    assert_eq!(render.get_pixel(878, 240), &white);

    let preview = session.preview_jpeg().await.expect("preview");
    assert!(preview.starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn denied_camera_shows_the_advisory() {
    let camera = VirtualCamera::with_default_device().deny_permission();
    let session = session_with(Arc::new(camera), Arc::new(FixedConsent(false)));

    let status = session.init(Dimensions::new(640, 480)).await.expect("init");
    assert!(!status.video_permission);
    assert!(status.devices.is_empty());
    assert_eq!(session.tick().await, Ok(TickOutcome::Advisory));

    let artifact = session.download().await.expect("download").expect("artifact");
    let render = image::load_from_memory(&artifact.png).expect("png").to_rgba8();
    assert!(render.pixels().any(|p| p.0[2] > 200 && p.0[0] < 60));
}

#[tokio::test]
async fn second_capture_while_one_is_in_flight_is_ignored() {
    let gate = Arc::new(GatedConsent::default());
    let session = session_with(
        Arc::new(VirtualCamera::with_default_device()),
        gate.clone(),
    );
    session.init(Dimensions::new(320, 240)).await.expect("init");

    let sharing = {
        let session = session.clone();
        tokio::spawn(async move { session.share(IPAD).await })
    };

    // The share is now parked on the consent prompt, holding the guard.
    gate.asked.notified().await;
    assert!(session.status().await.processing_download);
    assert!(session.download().await.expect("download").is_none());
    assert!(session.share(IPAD).await.expect("share").is_none());

    gate.release.notify_one();
    let outcome = sharing.await.expect("join").expect("share");
    assert!(matches!(outcome, Some(ShareOutcome::Downloaded { .. })));

    let status = session.status().await;
    assert!(!status.processing_download);
    assert!(!status.running, "mobile share freezes the picture");
    assert!(session.download().await.expect("download").is_some());
}

#[tokio::test]
async fn consented_archive_reaches_the_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/archive"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let session = CameraSession::new(
        Arc::new(VirtualCamera::with_default_device()),
        CameraSettings::default(),
        services(&server.uri(), Arc::new(FixedConsent(true))),
    );
    session.init(Dimensions::new(160, 120)).await.expect("init");
    let artifact = session.take_photo().await.expect("photo").expect("artifact");

    let outcome = session.archive(&artifact.data_uri).await.expect("archive");
    let ArchiveOutcome::Archived { filename } = outcome else {
        panic!("expected an upload, got {outcome:?}");
    };
    assert!(filename.starts_with("image ") && filename.ends_with(".png"));
}
