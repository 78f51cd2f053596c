//! Upload Service
//!
//! Content-addressed upload with a run-scoped dedup cache. One service
//! instance belongs to one conversion run; the cache is keyed by the file's
//! vault path, so every distinct file is read, hashed and uploaded at most
//! once per run no matter how many references point at it.

use std::collections::HashMap;
use std::sync::Arc;

use ao_core::LinkMode;
use ao_vault::{Vault, VaultError, VaultFile};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::model::{UploadOptions, UploadOutcome, UploadStatus};
use crate::naming::{content_digest, object_name, proxy_url};
use crate::storage::{ObjectStore, StorageError};

/// Upload errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Read failed: {0}")]
    Read(#[from] VaultError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Upload failed earlier in this run: {0}")]
    PreviouslyFailed(String),
}

pub type UploadResult<T> = Result<T, UploadError>;

#[derive(Debug, Clone)]
enum CacheEntry {
    Ready { object_name: String, url: String },
    Failed(String),
}

/// Upload/dedup engine
pub struct UploadService {
    store: Arc<dyn ObjectStore>,
    options: UploadOptions,
    cache: HashMap<String, CacheEntry>,
    warnings: Vec<String>,
    public_fallback_warned: bool,
    digests_computed: usize,
}

impl UploadService {
    pub fn new(store: Arc<dyn ObjectStore>, options: UploadOptions) -> Self {
        Self {
            store,
            options,
            cache: HashMap::new(),
            warnings: Vec::new(),
            public_fallback_warned: false,
            digests_computed: 0,
        }
    }

    /// Make sure `file` is present in the store and return its URL.
    ///
    /// Failures are remembered: later requests for the same file fail with
    /// `UploadError::PreviouslyFailed` without another read or upload.
    #[instrument(skip(self, vault), fields(file = %file, store = self.store.name()))]
    pub async fn ensure_uploaded(
        &mut self,
        vault: &dyn Vault,
        file: &VaultFile,
        media_type: &str,
    ) -> UploadResult<UploadOutcome> {
        if let Some(entry) = self.cache.get(file.path()) {
            return match entry {
                CacheEntry::Ready { object_name, url } => {
                    debug!(object = %object_name, "Upload cache hit");
                    Ok(UploadOutcome {
                        object_name: object_name.clone(),
                        url: url.clone(),
                        status: UploadStatus::Cached,
                    })
                }
                CacheEntry::Failed(message) => Err(UploadError::PreviouslyFailed(message.clone())),
            };
        }

        match self.upload(vault, file, media_type).await {
            Ok(outcome) => {
                self.cache.insert(
                    file.path().to_string(),
                    CacheEntry::Ready {
                        object_name: outcome.object_name.clone(),
                        url: outcome.url.clone(),
                    },
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Upload failed");
                self.cache
                    .insert(file.path().to_string(), CacheEntry::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn upload(
        &mut self,
        vault: &dyn Vault,
        file: &VaultFile,
        media_type: &str,
    ) -> UploadResult<UploadOutcome> {
        let data = vault.read_bytes(file).await?;
        let digest = content_digest(&data);
        self.digests_computed += 1;

        let object_name = object_name(
            file.stem(),
            &digest,
            file.extension(),
            self.options.object_prefix.as_deref(),
        );
        let url = self.object_url(&object_name)?;

        if self.store.exists(&object_name).await? {
            info!(object = %object_name, "Object already in store");
            return Ok(UploadOutcome {
                object_name,
                url,
                status: UploadStatus::AlreadyExists,
            });
        }

        if self.options.dry_run {
            debug!(object = %object_name, size = data.len(), "Dry run, upload skipped");
            return Ok(UploadOutcome {
                object_name,
                url,
                status: UploadStatus::WouldUpload,
            });
        }

        let content_type = if media_type.is_empty() {
            mime_guess::from_path(file.name())
                .first_or_octet_stream()
                .to_string()
        } else {
            media_type.to_string()
        };

        let size = data.len();
        self.store.put(&object_name, data, &content_type).await?;
        info!(object = %object_name, size, content_type = %content_type, "Object uploaded");

        Ok(UploadOutcome {
            object_name,
            url,
            status: UploadStatus::Uploaded,
        })
    }

    /// URL for an object under the configured link mode.
    ///
    /// Public mode falls back to the proxy URL when the store cannot build a
    /// public one; the first fallback in a run leaves a warning.
    fn object_url(&mut self, object_name: &str) -> UploadResult<String> {
        if self.options.link_mode == LinkMode::Public {
            let base = self.options.public_base_url.as_deref();
            if let Some(url) = self.store.public_url(object_name, base) {
                return Ok(url);
            }

            if !self.public_fallback_warned {
                self.public_fallback_warned = true;
                let message = format!(
                    "public URL unavailable from store '{}', using proxy links via {}",
                    self.store.name(),
                    self.options.proxy_origin
                );
                warn!("{}", message);
                self.warnings.push(message);
            }
        }

        Ok(proxy_url(&self.options.proxy_origin, object_name)?)
    }

    /// Drain warnings raised since the last call
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Number of files hashed so far in this run
    pub fn digests_computed(&self) -> usize {
        self.digests_computed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;
    use ao_vault::MemoryVault;

    fn vault() -> MemoryVault {
        MemoryVault::new()
            .with_file("notes/a.md", "![[photo.png]]")
            .with_file("notes/photo.png", "png bytes")
            .with_file("other/photo.png", "png bytes")
            .with_file("other/doc.pdf", "pdf bytes")
    }

    fn create_service(store: Arc<MemoryObjectStore>, options: UploadOptions) -> UploadService {
        UploadService::new(store, options)
    }

    #[tokio::test]
    async fn test_upload_new_file() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        let mut service = create_service(store.clone(), UploadOptions::default());

        let file = VaultFile::new("notes/photo.png");
        let outcome = service
            .ensure_uploaded(&vault, &file, "image/png")
            .await
            .unwrap();

        let expected = format!("photo-{}.png", content_digest(b"png bytes"));
        assert_eq!(outcome.status, UploadStatus::Uploaded);
        assert_eq!(outcome.object_name, expected);
        assert_eq!(outcome.url, format!("http://127.0.0.1:27124/{}", expected));

        let stored = store.get(&expected).await.unwrap();
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(store.put_calls(), 1);
    }

    #[tokio::test]
    async fn test_same_file_hashed_and_uploaded_once() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        let mut service = create_service(store.clone(), UploadOptions::default());

        let file = VaultFile::new("notes/photo.png");
        let first = service.ensure_uploaded(&vault, &file, "image/png").await.unwrap();
        let second = service.ensure_uploaded(&vault, &file, "image/png").await.unwrap();

        assert_eq!(second.status, UploadStatus::Cached);
        assert_eq!(first.url, second.url);
        assert_eq!(vault.byte_reads("notes/photo.png"), 1);
        assert_eq!(service.digests_computed(), 1);
        assert_eq!(store.put_calls(), 1);
        assert_eq!(store.exists_calls(), 1);
    }

    #[tokio::test]
    async fn test_identical_content_shares_object() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        let mut service = create_service(store.clone(), UploadOptions::default());

        let a = service
            .ensure_uploaded(&vault, &VaultFile::new("notes/photo.png"), "image/png")
            .await
            .unwrap();
        let b = service
            .ensure_uploaded(&vault, &VaultFile::new("other/photo.png"), "image/png")
            .await
            .unwrap();

        assert_eq!(a.status, UploadStatus::Uploaded);
        assert_eq!(b.status, UploadStatus::AlreadyExists);
        assert_eq!(a.url, b.url);
        assert_eq!(store.put_calls(), 1);
    }

    #[tokio::test]
    async fn test_rerun_skips_existing_objects() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        let file = VaultFile::new("other/doc.pdf");

        let mut first_run = create_service(store.clone(), UploadOptions::default());
        first_run
            .ensure_uploaded(&vault, &file, "application/pdf")
            .await
            .unwrap();

        let mut second_run = create_service(store.clone(), UploadOptions::default());
        let outcome = second_run
            .ensure_uploaded(&vault, &file, "application/pdf")
            .await
            .unwrap();

        assert_eq!(outcome.status, UploadStatus::AlreadyExists);
        assert_eq!(store.put_calls(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_returns_url_without_upload() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        let mut service = create_service(store.clone(), UploadOptions::default().dry_run(true));

        let outcome = service
            .ensure_uploaded(&vault, &VaultFile::new("notes/photo.png"), "image/png")
            .await
            .unwrap();

        assert_eq!(outcome.status, UploadStatus::WouldUpload);
        assert!(outcome.url.starts_with("http://127.0.0.1:27124/photo-"));
        assert_eq!(store.put_calls(), 0);
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_public_mode_uses_base() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        let options = UploadOptions::default().public(Some("https://cdn.example.com/att"));
        let mut service = create_service(store, options);

        let outcome = service
            .ensure_uploaded(&vault, &VaultFile::new("other/doc.pdf"), "application/pdf")
            .await
            .unwrap();

        assert!(outcome.url.starts_with("https://cdn.example.com/att/doc-"));
        assert!(service.take_warnings().is_empty());
    }

    #[tokio::test]
    async fn test_public_mode_falls_back_to_proxy_once() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        let mut service = create_service(store, UploadOptions::default().public(None));

        let a = service
            .ensure_uploaded(&vault, &VaultFile::new("other/doc.pdf"), "application/pdf")
            .await
            .unwrap();
        service
            .ensure_uploaded(&vault, &VaultFile::new("notes/photo.png"), "image/png")
            .await
            .unwrap();

        assert!(a.url.starts_with("http://127.0.0.1:27124/doc-"));
        let warnings = service.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("proxy"));
        assert!(service.take_warnings().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_remembered() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        store.fail_uploads(true);
        let mut service = create_service(store.clone(), UploadOptions::default());

        let file = VaultFile::new("notes/photo.png");
        let first = service.ensure_uploaded(&vault, &file, "image/png").await;
        assert!(matches!(first, Err(UploadError::Storage(_))));

        store.fail_uploads(false);
        let second = service.ensure_uploaded(&vault, &file, "image/png").await;
        assert!(matches!(second, Err(UploadError::PreviouslyFailed(_))));
        assert_eq!(store.put_calls(), 1);
        assert_eq!(vault.byte_reads("notes/photo.png"), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_read_error() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        let mut service = create_service(store, UploadOptions::default());

        let result = service
            .ensure_uploaded(&vault, &VaultFile::new("gone.png"), "image/png")
            .await;
        assert!(matches!(result, Err(UploadError::Read(VaultError::NotFound(_)))));
    }

    #[tokio::test]
    async fn test_content_type_guessed_when_missing() {
        let vault = vault();
        let store = Arc::new(MemoryObjectStore::new());
        let mut service = create_service(store.clone(), UploadOptions::default());

        let outcome = service
            .ensure_uploaded(&vault, &VaultFile::new("other/doc.pdf"), "")
            .await
            .unwrap();
        let stored = store.get(&outcome.object_name).await.unwrap();
        assert_eq!(stored.content_type, "application/pdf");
    }
}
