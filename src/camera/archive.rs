use std::time::Duration;

use reqwest::multipart::{Form, Part};

use super::capture::CaptureError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Uploads captured images to the archive service.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ArchiveClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: archive_endpoint(base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POSTs `png` as multipart field `image`. Non-2xx responses are errors.
    pub async fn upload(&self, filename: &str, png: Vec<u8>) -> Result<(), CaptureError> {
        let part = Part::bytes(png)
            .file_name(filename.to_string())
            .mime_str("image/png")?;
        let form = Form::new().part("image", part);

        let result = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(response) => {
                log_info!("Archived {filename} ({})", response.status());
                Ok(())
            }
            Err(err) => {
                log_error!("Archive upload of {filename} failed: {err}");
                Err(err.into())
            }
        }
    }
}

pub fn archive_endpoint(base_url: &str) -> String {
    format!("{}/archive", base_url.trim_end_matches('/'))
}
