//! Object Store Abstraction
//!
//! The remote side of an upload: existence check, upload, public URL.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::naming::join_url;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Object store trait - the remote collaborator of an upload
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Store an object
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Direct public URL for an object, if one can be built from `base`
    /// or the store's own configuration
    fn public_url(&self, key: &str, base: Option<&str>) -> Option<String>;

    /// Store name for logging
    fn name(&self) -> &str;
}

/// Local directory acting as an object store
pub struct LocalObjectStore {
    /// Root directory for objects
    root: PathBuf,
    /// Base URL the directory is served from, if any
    public_base: Option<String>,
}

impl LocalObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base: None,
        }
    }

    pub fn with_public_base(mut self, base: impl Into<String>) -> Self {
        self.public_base = Some(base.into());
        self
    }

    /// Resolve a key to a full path
    fn resolve_path(&self, key: &str) -> StorageResult<PathBuf> {
        // Prevent directory traversal
        if key.is_empty()
            || key.starts_with('/')
            || key.starts_with('\\')
            || key.split(['/', '\\']).any(|segment| segment == "..")
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    #[instrument(skip(self, data), fields(store = "local"))]
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let path = self.resolve_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        debug!(path = ?path, size = data.len(), "Object stored");
        Ok(())
    }

    fn public_url(&self, key: &str, base: Option<&str>) -> Option<String> {
        let base = base.or(self.public_base.as_deref())?;
        join_url(base, key).ok()
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Stored object in a `MemoryObjectStore`
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// In-memory object store for testing
pub struct MemoryObjectStore {
    objects: tokio::sync::RwLock<HashMap<String, StoredObject>>,
    public_base: Option<String>,
    put_calls: AtomicUsize,
    exists_calls: AtomicUsize,
    fail_puts: AtomicBool,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: tokio::sync::RwLock::new(HashMap::new()),
            public_base: None,
            put_calls: AtomicUsize::new(0),
            exists_calls: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
        }
    }

    pub fn with_public_base(mut self, base: impl Into<String>) -> Self {
        self.public_base = Some(base.into());
        self
    }

    /// Make every subsequent `put` fail
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("upload rejected".to_string()));
        }

        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str, base: Option<&str>) -> Option<String> {
        let base = base.or(self.public_base.as_deref())?;
        join_url(base, key).ok()
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_put_exists() {
        let store = MemoryObjectStore::new();
        assert!(!store.exists("a-1.png").await.unwrap());

        store
            .put("a-1.png", Bytes::from("data"), "image/png")
            .await
            .unwrap();

        assert!(store.exists("a-1.png").await.unwrap());
        let object = store.get("a-1.png").await.unwrap();
        assert_eq!(object.data, Bytes::from("data"));
        assert_eq!(object.content_type, "image/png");
        assert_eq!(store.put_calls(), 1);
        assert_eq!(store.exists_calls(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_failing_put() {
        let store = MemoryObjectStore::new();
        store.fail_uploads(true);

        let result = store.put("x.png", Bytes::from("d"), "image/png").await;
        assert!(matches!(result, Err(StorageError::BackendError(_))));
        assert!(!store.exists("x.png").await.unwrap());
    }

    #[test]
    fn test_public_url_needs_a_base() {
        let store = MemoryObjectStore::new();
        assert_eq!(store.public_url("a.png", None), None);
        assert_eq!(
            store.public_url("a.png", Some("https://cdn.example.com/files")).as_deref(),
            Some("https://cdn.example.com/files/a.png")
        );

        let store = MemoryObjectStore::new().with_public_base("https://bucket.example.com");
        assert_eq!(
            store.public_url("dir/a b.png", None).as_deref(),
            Some("https://bucket.example.com/dir/a%20b.png")
        );
    }

    #[tokio::test]
    async fn test_local_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        assert!(!store.exists("prefix/a-1.png").await.unwrap());
        store
            .put("prefix/a-1.png", Bytes::from("png"), "image/png")
            .await
            .unwrap();
        assert!(store.exists("prefix/a-1.png").await.unwrap());
        assert_eq!(std::fs::read(dir.path().join("prefix/a-1.png")).unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_local_store_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        let result = store.exists("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
