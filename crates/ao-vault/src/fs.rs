//! Filesystem vault
//!
//! A directory tree of notes and attachments. Hidden entries (names starting
//! with `.`) are ignored.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use ao_core::DocumentScope;

use crate::resolve::{parent_dir, resolve_target};
use crate::vault::{backup_name, Vault, VaultError, VaultFile, VaultResult};

/// Vault rooted at a local directory
pub struct FsVault {
    /// Root directory
    root: PathBuf,
    /// Extension of note documents
    note_extension: String,
    /// Every file in the vault, vault-relative and sorted
    index: RwLock<Vec<String>>,
}

impl FsVault {
    /// Create a vault over `root`; the file index is built on first listing
    pub fn new(root: impl AsRef<Path>, note_extension: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            note_extension: note_extension.into(),
            index: RwLock::new(Vec::new()),
        }
    }

    /// Create a vault and index it, failing if `root` is not a directory
    pub async fn open(root: impl AsRef<Path>, note_extension: impl Into<String>) -> VaultResult<Self> {
        let vault = Self::new(root, note_extension);
        let meta = fs::metadata(&vault.root).await?;
        if !meta.is_dir() {
            return Err(VaultError::InvalidPath(vault.root.display().to_string()));
        }
        vault.refresh().await?;
        Ok(vault)
    }

    /// Rebuild the file index; returns the number of files found
    pub async fn refresh(&self) -> VaultResult<usize> {
        let root = self.root.clone();
        let files = tokio::task::spawn_blocking(move || walk(&root))
            .await
            .map_err(|e| VaultError::BackendError(e.to_string()))??;

        let count = files.len();
        *self.index.write().await = files;
        debug!(root = ?self.root, files = count, "Vault indexed");
        Ok(count)
    }

    /// Resolve a vault path to a full path
    fn resolve_path(&self, path: &str) -> VaultResult<PathBuf> {
        // Prevent directory traversal
        if path.is_empty()
            || path.starts_with('/')
            || path.starts_with('\\')
            || path.split(['/', '\\']).any(|segment| segment == "..")
        {
            return Err(VaultError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(path))
    }

    fn is_note(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&self.note_extension))
    }
}

fn walk(root: &Path) -> VaultResult<Vec<String>> {
    let mut files = Vec::new();

    let entries = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'));

    for entry in entries {
        let entry = entry.map_err(|e| VaultError::BackendError(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        files.push(parts.join("/"));
    }

    files.sort();
    Ok(files)
}

#[async_trait]
impl Vault for FsVault {
    #[instrument(skip(self), fields(vault = "fs"))]
    async fn list_documents(&self, scope: &DocumentScope) -> VaultResult<Vec<String>> {
        self.refresh().await?;
        let index = self.index.read().await;

        let notes = index.iter().filter(|path| self.is_note(path));
        let documents = match scope {
            DocumentScope::Document(doc) => notes.filter(|path| *path == doc).cloned().collect(),
            DocumentScope::Folder(folder) => notes
                .filter(|path| parent_dir(path) == folder.trim_matches('/'))
                .cloned()
                .collect(),
            DocumentScope::All => notes.cloned().collect(),
        };

        Ok(documents)
    }

    async fn read_text(&self, path: &str) -> VaultResult<String> {
        let bytes = self.read_bytes(&VaultFile::new(path)).await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| VaultError::NotUtf8(path.to_string()))
    }

    #[instrument(skip(self, text), fields(vault = "fs"))]
    async fn write_text(&self, path: &str, text: &str) -> VaultResult<()> {
        let full = self.resolve_path(path)?;
        fs::write(&full, text).await?;
        debug!(path = %path, bytes = text.len(), "Document written");
        Ok(())
    }

    #[instrument(skip(self), fields(vault = "fs"))]
    async fn backup(&self, path: &str) -> VaultResult<String> {
        let source = self.resolve_path(path)?;
        if !fs::try_exists(&source).await? {
            return Err(VaultError::NotFound(path.to_string()));
        }

        let mut n = 0;
        loop {
            let candidate = backup_name(path, n);
            let target = self.resolve_path(&candidate)?;
            if !fs::try_exists(&target).await? {
                fs::copy(&source, &target).await?;
                debug!(path = %path, backup = %candidate, "Backup written");
                return Ok(candidate);
            }
            n += 1;
        }
    }

    async fn resolve_link(&self, target: &str, from: &str) -> VaultResult<Option<VaultFile>> {
        let index = self.index.read().await;
        Ok(resolve_target(&index, target, from).map(VaultFile::new))
    }

    async fn read_bytes(&self, file: &VaultFile) -> VaultResult<Bytes> {
        let full = self.resolve_path(file.path())?;
        match fs::read(&full).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(file.path().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, path: &str, content: &[u8]) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    fn sample_vault() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.md", b"# Index");
        write(dir.path(), "notes/a.md", b"![[photo.png]]");
        write(dir.path(), "notes/b.md", b"[[a]]");
        write(dir.path(), "notes/deep/c.md", b"nothing");
        write(dir.path(), "notes/photo.png", b"png bytes");
        write(dir.path(), ".obsidian/config.md", b"hidden");
        dir
    }

    #[tokio::test]
    async fn test_list_documents_by_scope() {
        let dir = sample_vault();
        let vault = FsVault::open(dir.path(), "md").await.unwrap();

        let all = vault.list_documents(&DocumentScope::All).await.unwrap();
        assert_eq!(all, vec!["index.md", "notes/a.md", "notes/b.md", "notes/deep/c.md"]);

        let folder = vault
            .list_documents(&DocumentScope::Folder("notes".into()))
            .await
            .unwrap();
        assert_eq!(folder, vec!["notes/a.md", "notes/b.md"]);

        let root = vault
            .list_documents(&DocumentScope::Folder(String::new()))
            .await
            .unwrap();
        assert_eq!(root, vec!["index.md"]);

        let single = vault
            .list_documents(&DocumentScope::Document("notes/b.md".into()))
            .await
            .unwrap();
        assert_eq!(single, vec!["notes/b.md"]);

        let missing = vault
            .list_documents(&DocumentScope::Document("nope.md".into()))
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_read_write_and_resolve() {
        let dir = sample_vault();
        let vault = FsVault::open(dir.path(), "md").await.unwrap();

        assert_eq!(vault.read_text("notes/a.md").await.unwrap(), "![[photo.png]]");
        vault.write_text("notes/a.md", "changed").await.unwrap();
        assert_eq!(vault.read_text("notes/a.md").await.unwrap(), "changed");

        let file = vault
            .resolve_link("photo.png", "notes/a.md")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.path(), "notes/photo.png");
        assert_eq!(vault.read_bytes(&file).await.unwrap(), Bytes::from_static(b"png bytes"));

        assert!(vault.resolve_link("gone.png", "notes/a.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backup_names_do_not_collide() {
        let dir = sample_vault();
        let vault = FsVault::open(dir.path(), "md").await.unwrap();

        assert_eq!(vault.backup("notes/a.md").await.unwrap(), "notes/a.md.bak");
        assert_eq!(vault.backup("notes/a.md").await.unwrap(), "notes/a.md.bak.1");
        assert_eq!(vault.backup("notes/a.md").await.unwrap(), "notes/a.md.bak.2");

        let copied = std::fs::read(dir.path().join("notes/a.md.bak.1")).unwrap();
        assert_eq!(copied, b"![[photo.png]]");

        assert!(matches!(
            vault.backup("notes/none.md").await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = sample_vault();
        let vault = FsVault::open(dir.path(), "md").await.unwrap();

        let result = vault.read_text("../../../etc/passwd").await;
        assert!(matches!(result, Err(VaultError::InvalidPath(_))));
        let result = vault.write_text("/etc/passwd", "x").await;
        assert!(matches!(result, Err(VaultError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_open_requires_directory() {
        let dir = sample_vault();
        let result = FsVault::open(dir.path().join("index.md"), "md").await;
        assert!(matches!(result, Err(VaultError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_not_utf8() {
        let dir = sample_vault();
        write(dir.path(), "bad.md", &[0xff, 0xfe, 0x00]);
        let vault = FsVault::open(dir.path(), "md").await.unwrap();
        assert!(matches!(vault.read_text("bad.md").await, Err(VaultError::NotUtf8(_))));
    }
}
