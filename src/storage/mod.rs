//! JSON-backed local storage under `<app data>/internal-storage`.
//!
//! One folder per kind, each seeded with a JSON file on first start. Writes
//! go through a single async lock so read-modify-write cycles (upserts) never
//! interleave; the file I/O itself runs on the blocking pool.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;

mod blobs;
#[cfg(feature = "desktop")]
pub mod commands;
mod records;

pub use blobs::BlobKind;

pub const STORAGE_DIR: &str = "internal-storage";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} does not hold a JSON array")]
    NotAnArray(PathBuf),
    #[error("record has no string `{0}` field")]
    MissingIdentifier(&'static str),
    #[error("invalid identifier '{0}'")]
    InvalidId(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
    #[error("storage worker failed: {0}")]
    Worker(String),
}

impl StorageError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The two record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Testimonials,
    Tickets,
}

impl RecordKind {
    pub fn folder(self) -> &'static str {
        match self {
            RecordKind::Testimonials => "testimonials",
            RecordKind::Tickets => "tickets",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            RecordKind::Testimonials => "testimonials.json",
            RecordKind::Tickets => "tickets.json",
        }
    }

    /// Field every record of this kind is keyed by.
    pub fn id_field(self) -> &'static str {
        match self {
            RecordKind::Testimonials => "testimonialID",
            RecordKind::Tickets => "ticketID",
        }
    }
}

struct SchemaEntry {
    folder: &'static str,
    file_name: &'static str,
    default_value: fn() -> Value,
}

const SCHEMA: [SchemaEntry; 3] = [
    SchemaEntry {
        folder: "testimonials",
        file_name: "testimonials.json",
        default_value: || json!([]),
    },
    SchemaEntry {
        folder: "tickets",
        file_name: "tickets.json",
        default_value: || json!([]),
    },
    SchemaEntry {
        folder: "config",
        file_name: "config.json",
        default_value: || json!({ "version": 1 }),
    },
];

struct StorageInner {
    root: PathBuf,
    lock: Mutex<()>,
}

#[derive(Clone)]
pub struct InternalStorage {
    inner: Arc<StorageInner>,
}

impl InternalStorage {
    /// Opens the storage under `app_data_dir`, creating whatever folders and
    /// seed files are missing. Existing files are never overwritten.
    pub fn init(app_data_dir: &Path) -> Result<Self, StorageError> {
        let root = app_data_dir.join(STORAGE_DIR);
        create_dir(&root)?;

        for entry in &SCHEMA {
            let folder = root.join(entry.folder);
            create_dir(&folder)?;

            let file = folder.join(entry.file_name);
            if !file.exists() {
                let contents = (entry.default_value)().to_string();
                fs::write(&file, contents).map_err(|e| StorageError::io("write", &file, e))?;
                log::info!("Created file: {}", file.display());
            }
        }

        Ok(Self {
            inner: Arc::new(StorageInner {
                root,
                lock: Mutex::new(()),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.inner.root.join("config").join("config.json")
    }

    fn records_path(&self, kind: RecordKind) -> PathBuf {
        self.inner.root.join(kind.folder()).join(kind.file_name())
    }

    /// Runs `task` on the blocking pool while holding the storage lock.
    async fn execute<F, T>(&self, task: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Path) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.inner.lock.lock().await;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || task(&inner.root))
            .await
            .map_err(|err| StorageError::Worker(err.to_string()))?
    }
}

fn create_dir(path: &Path) -> Result<(), StorageError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| StorageError::io("create", path, e))?;
    log::info!("Created folder: {}", path.display());
    Ok(())
}

/// Identifiers end up in file names; keep them to a safe alphabet.
fn validate_id(id: &str) -> Result<(), StorageError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_seeds_missing_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InternalStorage::init(dir.path()).unwrap();

        let root = dir.path().join(STORAGE_DIR);
        assert_eq!(storage.root(), root);
        assert_eq!(
            fs::read_to_string(root.join("testimonials/testimonials.json")).unwrap(),
            "[]"
        );
        assert_eq!(
            fs::read_to_string(storage.config_path()).unwrap(),
            r#"{"version":1}"#
        );

        fs::write(root.join("tickets/tickets.json"), r#"[{"ticketID":"t1"}]"#).unwrap();
        InternalStorage::init(dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(root.join("tickets/tickets.json")).unwrap(),
            r#"[{"ticketID":"t1"}]"#
        );
    }

    #[test]
    fn ids_are_limited_to_a_file_safe_alphabet() {
        assert!(validate_id("3f2a-9c_01").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("../escape").is_err());
        assert!(validate_id("a b").is_err());
    }
}
