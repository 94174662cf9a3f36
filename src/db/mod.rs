//! Whole-file JSON document storage.
//!
//! Every document is read from disk on each access and written back as a
//! complete snapshot. Writers of the same document are serialized through a
//! per-document mutex so read-modify-write cycles inside one process do not
//! lose updates.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error};

pub mod content;

pub use content::{ContentStore, StaticPage};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// The JSON documents that make up the site's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    Settings,
    Articles,
    Keys,
}

impl Document {
    pub const ALL: [Self; 3] = [Self::Settings, Self::Articles, Self::Keys];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Articles => "articles",
            Self::Keys => "keys",
        }
    }

    #[must_use]
    pub const fn relative_path(self) -> &'static str {
        match self {
            Self::Settings => "settings.json",
            Self::Articles => "articles/metadata.json",
            Self::Keys => "keys.json",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Settings => 0,
            Self::Articles => 1,
            Self::Keys => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {document}: {source}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The file on disk does not decode; overwriting it would discard data.
    #[error("Refusing to overwrite {path}: existing content does not decode ({reason})")]
    Quarantined { path: PathBuf, reason: String },
}

/// Result of a read-modify-write closure passed to [`Store::update`].
#[derive(Debug)]
pub struct Outcome<R> {
    pub value: R,
    pub dirty: bool,
}

impl<R> Outcome<R> {
    /// The document was modified and must be written back.
    pub const fn changed(value: R) -> Self {
        Self { value, dirty: true }
    }

    /// The document is untouched; nothing is written.
    pub const fn unchanged(value: R) -> Self {
        Self {
            value,
            dirty: false,
        }
    }
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    root: PathBuf,
    locks: [Mutex<()>; 3],
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                root: root.into(),
                locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
            }),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    #[must_use]
    pub fn path(&self, document: Document) -> PathBuf {
        self.inner.root.join(document.relative_path())
    }

    /// Creates the data directory tree if it is missing.
    pub async fn ensure_layout(&self) -> Result<(), StoreError> {
        for document in Document::ALL {
            if let Some(parent) = self.path(document).parent() {
                create_dir(parent).await?;
            }
        }
        create_dir(&self.inner.root.join(content::CONTENT_DIR)).await
    }

    #[must_use]
    pub fn exists(&self, document: Document) -> bool {
        self.path(document).exists()
    }

    /// Loads a document. Missing or unreadable files yield `T::default()`.
    pub async fn load<T>(&self, document: Document) -> T
    where
        T: DeserializeOwned + Default,
    {
        match read_document(&self.path(document)).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(document = document.name(), "Document absent, using empty value");
                T::default()
            }
            Err(e) => {
                error!(
                    document = document.name(),
                    error = %e,
                    "Failed to read document, serving empty value"
                );
                T::default()
            }
        }
    }

    /// Overwrites a document with `value`.
    ///
    /// An existing file that does not decode as `T` is left untouched.
    pub async fn save<T>(&self, document: Document, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Sync,
    {
        let _guard = self.inner.locks[document.slot()].lock().await;
        self.read_for_write::<T>(document).await?;
        self.write_unlocked(document, value).await
    }

    /// Runs a read-modify-write cycle while holding the document's lock.
    ///
    /// The document is written back only when the closure reports it dirty.
    /// A file that exists but does not decode as `T` fails with
    /// [`StoreError::Quarantined`] before the closure runs.
    pub async fn update<T, R, F>(&self, document: Document, mutate: F) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync,
        F: FnOnce(&mut T) -> Outcome<R> + Send,
        R: Send,
    {
        let _guard = self.inner.locks[document.slot()].lock().await;
        let mut value: T = self.read_for_write(document).await?.unwrap_or_default();
        let outcome = mutate(&mut value);
        if outcome.dirty {
            self.write_unlocked(document, &value).await?;
        }
        Ok(outcome.value)
    }

    async fn read_for_write<T>(&self, document: Document) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        read_document(&self.path(document)).await.inspect_err(|e| {
            error!(
                document = document.name(),
                error = %e,
                "Existing document is unreadable, write refused"
            );
        })
    }

    async fn write_unlocked<T>(&self, document: Document, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + Sync,
    {
        let path = self.path(document);
        let mut bytes =
            serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
                document: document.name(),
                source,
            })?;
        bytes.push(b'\n');

        if let Some(parent) = path.parent() {
            create_dir(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await.map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(document = document.name(), bytes = bytes.len(), "Document saved");
        Ok(())
    }
}

/// Reads and decodes a JSON file. `Ok(None)` means the file does not exist.
async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_json(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Quarantined {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Parses JSON, tolerating a leading UTF-8 byte order mark.
pub fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    serde_json::from_slice(body)
}

async fn create_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}
