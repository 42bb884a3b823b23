//! Blob storage for avatars and entry photos.

use crate::error::{Result, ShadowError};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Keys of the objects directly under `prefix` (not nested deeper).
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// A URL from which the object can be fetched.
    async fn download_url(&self, key: &str) -> Result<String>;

    /// Store `bytes` under `key` and return its download URL.
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String>;
}

/// Key for a new image in `folder`, unique per user and millisecond:
/// `{folder}/{uid}_{millis}.jpg`.
pub fn timestamped_key(folder: &str, uid: &str) -> String {
    format!(
        "{}/{}_{}.jpg",
        folder.trim_matches('/'),
        uid,
        Utc::now().timestamp_millis()
    )
}

fn folder_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[derive(Default)]
pub struct MemoryBlobs {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .insert(key.trim_matches('/').to_string(), bytes);
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key.trim_matches('/')).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = folder_prefix(prefix);
        Ok(self
            .objects
            .lock()
            .keys()
            .filter(|key| {
                key.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect())
    }

    async fn download_url(&self, key: &str) -> Result<String> {
        let key = key.trim_matches('/');
        if self.objects.lock().contains_key(key) {
            Ok(format!("memory://{key}"))
        } else {
            Err(ShadowError::Blobs(format!("object not found: {key}")))
        }
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String> {
        self.insert(key, bytes);
        self.download_url(key).await
    }
}

/// Blobs stored as files below a root directory.
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let key = key.trim_matches('/');
        if key.split('/').any(|seg| seg == ".." || seg == ".") {
            return Err(ShadowError::Blobs(format!("invalid key: {key}")));
        }
        Ok(self.root.join(key))
    }

    fn url(path: &Path) -> String {
        format!("file://{}", path.display())
    }
}

#[async_trait]
impl BlobStore for DirBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let folder = folder_prefix(prefix);
        let dir = self.resolve(&folder)?;

        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(format!("{}{}", folder, entry.file_name().to_string_lossy()));
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn download_url(&self, key: &str) -> Result<String> {
        let path = self.resolve(key)?;
        if tokio::fs::try_exists(&path).await? {
            Ok(Self::url(&path))
        } else {
            Err(ShadowError::Blobs(format!("object not found: {key}")))
        }
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored blob {}", path.display());
        Ok(Self::url(&path))
    }
}
