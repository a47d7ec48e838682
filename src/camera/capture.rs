//! Capture and export: PNG artifacts, the shared download guard, and the
//! consent / share-sheet seams the host fills in.

use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use thiserror::Error;

use super::CameraError;
use crate::utils::data_uri;

pub const ARCHIVE_CONSENT_MESSAGE: &str = "Do you consent that we archive this image?";
pub const SHARE_TITLE_PREFIX: &str = "Magic Mirror : image";

const MOBILE_TOKENS: [&str; 8] = [
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("invalid image data: {0}")]
    InvalidData(#[from] base64::DecodeError),
    #[error("archive upload failed: {0}")]
    Upload(#[from] reqwest::Error),
    #[error("share sheet failed: {0}")]
    Share(String),
}

/// An encoded snapshot of the render surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureArtifact {
    pub filename: String,
    pub timestamp: String,
    pub data_uri: String,
    #[serde(skip)]
    pub png: Vec<u8>,
}

impl CaptureArtifact {
    pub fn from_image(image: &RgbaImage, now: DateTime<Local>) -> Result<Self, CaptureError> {
        let png = encode_png(image)?;
        let timestamp = human_timestamp(now);
        Ok(Self {
            filename: artifact_filename(&timestamp),
            data_uri: data_uri::encode("image/png", &png),
            timestamp,
            png,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub title: String,
    pub text: String,
    pub url: String,
    pub artifact: CaptureArtifact,
}

impl ShareRequest {
    pub fn new(artifact: CaptureArtifact, url: impl Into<String>) -> Self {
        let title = format!("{SHARE_TITLE_PREFIX} {}", artifact.timestamp);
        Self {
            text: title.clone(),
            title,
            url: url.into(),
            artifact,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ShareOutcome {
    Shared { artifact: CaptureArtifact },
    Downloaded { artifact: CaptureArtifact },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ArchiveOutcome {
    Archived { filename: String },
    Declined,
}

/// Asks the visitor a yes/no question.
pub trait ConsentPrompt: Send + Sync {
    fn confirm(&self, message: String) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Hands an artifact to the platform share sheet.
pub trait ShareSheet: Send + Sync {
    fn share(&self, request: &ShareRequest) -> Result<(), CaptureError>;
}

/// Consent prompt with a fixed answer, for headless runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedConsent(pub bool);

impl ConsentPrompt for FixedConsent {
    fn confirm(&self, _message: String) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        let answer = self.0;
        Box::pin(async move { answer })
    }
}

/// `processingDownload`: at most one download or share in flight.
#[derive(Debug, Clone, Default)]
pub struct DownloadGuard(Arc<AtomicBool>);

/// Held for the duration of one download or share; releases on drop.
#[derive(Debug)]
pub struct DownloadPermit(Arc<AtomicBool>);

impl DownloadGuard {
    pub fn try_acquire(&self) -> Option<DownloadPermit> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DownloadPermit(Arc::clone(&self.0)))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for DownloadPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// `Monday_3_June_14_07`
pub fn human_timestamp(now: DateTime<Local>) -> String {
    now.format("%A_%-d_%B_%H_%M").to_string()
}

pub fn artifact_filename(timestamp: &str) -> String {
    format!("image {timestamp}.png")
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let user_agent = user_agent.to_lowercase();
    MOBILE_TOKENS.iter().any(|token| user_agent.contains(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgba;

    #[test]
    fn timestamp_uses_weekday_day_month_hour_minute() {
        let when = Local.with_ymd_and_hms(2024, 6, 3, 14, 7, 30).unwrap();
        assert_eq!(human_timestamp(when), "Monday_3_June_14_07");
        assert_eq!(artifact_filename("Monday_3_June_14_07"), "image Monday_3_June_14_07.png");
    }

    #[test]
    fn artifact_carries_png_and_data_uri() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([9, 8, 7, 255]));
        let when = Local.with_ymd_and_hms(2024, 6, 3, 14, 7, 30).unwrap();
        let artifact = CaptureArtifact::from_image(&image, when).unwrap();

        assert!(artifact.png.starts_with(b"\x89PNG"));
        assert!(artifact.data_uri.starts_with("data:image/png;base64,"));
        let decoded = image::load_from_memory(&artifact.png).unwrap().to_rgba8();
        assert_eq!(decoded, image);

        let share = ShareRequest::new(artifact, "https://example.test");
        assert_eq!(share.title, "Magic Mirror : image Monday_3_June_14_07");
        assert_eq!(share.text, share.title);
    }

    #[test]
    fn mobile_detection_is_case_insensitive() {
        assert!(is_mobile_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"
        ));
        assert!(is_mobile_user_agent("Opera Mini/8.0"));
        assert!(is_mobile_user_agent("ANDROID 14"));
        assert!(!is_mobile_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36"
        ));
    }

    #[test]
    fn guard_admits_one_holder_at_a_time() {
        let guard = DownloadGuard::default();
        let permit = guard.try_acquire().unwrap();
        assert!(guard.is_busy());
        assert!(guard.clone().try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn fixed_consent_answers_as_configured() {
        assert!(FixedConsent(true).confirm(ARCHIVE_CONSENT_MESSAGE.into()).await);
        assert!(!FixedConsent(false).confirm(ARCHIVE_CONSENT_MESSAGE.into()).await);
    }
}
