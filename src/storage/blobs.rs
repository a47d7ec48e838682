use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::{validate_id, InternalStorage, StorageError};
use crate::utils::data_uri;

const TRANSCRIBED_SUFFIX: &str = "_transcribed.txt";
const WORDS_SUFFIX: &str = "_words.txt";

/// Binary payloads the UI hands over as base64 or data URIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlobKind {
    TicketImage,
    TestimonialAudio,
}

impl BlobKind {
    fn folder(self) -> &'static str {
        match self {
            BlobKind::TicketImage => "tickets",
            BlobKind::TestimonialAudio => "testimonials",
        }
    }

    fn default_extension(self) -> &'static str {
        match self {
            BlobKind::TicketImage => "png",
            BlobKind::TestimonialAudio => "webm",
        }
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<PathBuf, StorageError> {
    fs::write(path, contents).map_err(|e| StorageError::io("write", path, e))?;
    log::info!("Stored {}", path.display());
    Ok(path.to_path_buf())
}

impl InternalStorage {
    /// Decodes `payload` and writes it to `<kind folder>/<id>.<ext>`, the
    /// extension following the data URI's MIME type when there is one.
    pub async fn store_blob(
        &self,
        kind: BlobKind,
        id: &str,
        payload: &str,
    ) -> Result<PathBuf, StorageError> {
        validate_id(id)?;
        let decoded = data_uri::decode(payload)?;
        let extension = decoded
            .mime
            .as_deref()
            .and_then(data_uri::extension_for)
            .unwrap_or(kind.default_extension())
            .to_string();
        let name = format!("{id}.{extension}");

        self.execute(move |root| write_file(&root.join(kind.folder()).join(name), &decoded.bytes))
            .await
    }

    pub async fn store_ticket(&self, id: &str, payload: &str) -> Result<PathBuf, StorageError> {
        self.store_blob(BlobKind::TicketImage, id, payload).await
    }

    pub async fn store_transcribe(
        &self,
        id: &str,
        payload: &str,
    ) -> Result<PathBuf, StorageError> {
        self.store_blob(BlobKind::TestimonialAudio, id, payload).await
    }

    pub async fn store_transcribed(
        &self,
        id: &str,
        transcription: String,
    ) -> Result<PathBuf, StorageError> {
        validate_id(id)?;
        let name = format!("{id}{TRANSCRIBED_SUFFIX}");
        self.execute(move |root| {
            write_file(&root.join("testimonials").join(name), transcription.as_bytes())
        })
        .await
    }

    /// One word per line in `testimonials/<id>_words.txt`.
    pub async fn store_words(&self, id: &str, words: Vec<String>) -> Result<PathBuf, StorageError> {
        validate_id(id)?;
        let name = format!("{id}{WORDS_SUFFIX}");
        let contents = words
            .iter()
            .map(|word| word.trim())
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        self.execute(move |root| write_file(&root.join("testimonials").join(name), contents.as_bytes()))
            .await
    }

    /// Every stored word, file by file in name order.
    pub async fn get_words(&self) -> Result<Vec<String>, StorageError> {
        self.execute(|root| {
            let folder = root.join("testimonials");
            let mut files = fs::read_dir(&folder)
                .map_err(|e| StorageError::io("list", &folder, e))?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| {
                    path.file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.ends_with(WORDS_SUFFIX))
                })
                .collect::<Vec<_>>();
            files.sort();

            let mut words = Vec::new();
            for file in files {
                let contents =
                    fs::read_to_string(&file).map_err(|e| StorageError::io("read", &file, e))?;
                words.extend(
                    contents
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string),
                );
            }
            Ok(words)
        })
        .await
    }
}
