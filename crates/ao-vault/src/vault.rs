//! Vault abstraction
//!
//! Paths are vault-relative and `/`-separated. A resolved file's path is its
//! storage identity: two differently written links that resolve to the same
//! path are the same file.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use ao_core::DocumentScope;

/// Vault errors
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Document is not valid UTF-8: {0}")]
    NotUtf8(String),
    #[error("Vault backend error: {0}")]
    BackendError(String),
}

pub type VaultResult<T> = Result<T, VaultError>;

/// A concrete file inside the vault
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultFile {
    path: String,
}

impl VaultFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Vault-relative path, the file's identity
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Name without its extension
    pub fn stem(&self) -> &str {
        let name = self.name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// Extension without the dot, as written
    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

impl std::fmt::Display for VaultFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Document store used by a conversion run
#[async_trait]
pub trait Vault: Send + Sync {
    /// Documents in scope, in a stable order
    async fn list_documents(&self, scope: &DocumentScope) -> VaultResult<Vec<String>>;

    /// Read a document's text
    async fn read_text(&self, path: &str) -> VaultResult<String>;

    /// Replace a document's text
    async fn write_text(&self, path: &str, text: &str) -> VaultResult<()>;

    /// Copy a document to the first free backup name; returns that name
    async fn backup(&self, path: &str) -> VaultResult<String>;

    /// Map a written link target, seen from `from`, to a concrete file
    async fn resolve_link(&self, target: &str, from: &str) -> VaultResult<Option<VaultFile>>;

    /// Read a file's full content
    async fn read_bytes(&self, file: &VaultFile) -> VaultResult<Bytes>;

    /// Vault name for logging
    fn name(&self) -> &str;
}

/// Backup name number `n`: `a.md.bak`, `a.md.bak.1`, `a.md.bak.2`, ...
pub fn backup_name(path: &str, n: usize) -> String {
    if n == 0 {
        format!("{}.bak", path)
    } else {
        format!("{}.bak.{}", path, n)
    }
}
