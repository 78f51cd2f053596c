//! In-memory vault for testing

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use ao_core::DocumentScope;

use crate::resolve::{parent_dir, resolve_target};
use crate::vault::{backup_name, Vault, VaultError, VaultFile, VaultResult};

/// In-memory vault that counts reads and writes
pub struct MemoryVault {
    files: RwLock<BTreeMap<String, Bytes>>,
    note_extension: String,
    byte_reads: Mutex<HashMap<String, usize>>,
    writes: AtomicUsize,
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVault {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            note_extension: "md".to_string(),
            byte_reads: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Add a file while building the vault
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.files.get_mut().insert(path.into(), content.into());
        self
    }

    pub async fn insert(&self, path: impl Into<String>, content: impl Into<Bytes>) {
        self.files.write().await.insert(path.into(), content.into());
    }

    /// Current text of a document
    pub async fn text(&self, path: &str) -> Option<String> {
        let files = self.files.read().await;
        files
            .get(path)
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.files.read().await.contains_key(path)
    }

    pub async fn paths(&self) -> Vec<String> {
        self.files.read().await.keys().cloned().collect()
    }

    /// How many times a file's bytes were read through `read_bytes`
    pub fn byte_reads(&self, path: &str) -> usize {
        self.byte_reads
            .lock()
            .map(|reads| reads.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of `write_text` calls
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn is_note(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&self.note_extension))
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn list_documents(&self, scope: &DocumentScope) -> VaultResult<Vec<String>> {
        let files = self.files.read().await;
        let notes = files.keys().filter(|path| self.is_note(path));

        Ok(match scope {
            DocumentScope::Document(doc) => notes.filter(|path| *path == doc).cloned().collect(),
            DocumentScope::Folder(folder) => notes
                .filter(|path| parent_dir(path) == folder.trim_matches('/'))
                .cloned()
                .collect(),
            DocumentScope::All => notes.cloned().collect(),
        })
    }

    async fn read_text(&self, path: &str) -> VaultResult<String> {
        let files = self.files.read().await;
        let data = files
            .get(path)
            .ok_or_else(|| VaultError::NotFound(path.to_string()))?;
        String::from_utf8(data.to_vec()).map_err(|_| VaultError::NotUtf8(path.to_string()))
    }

    async fn write_text(&self, path: &str, text: &str) -> VaultResult<()> {
        let mut files = self.files.write().await;
        files.insert(path.to_string(), Bytes::from(text.to_string()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn backup(&self, path: &str) -> VaultResult<String> {
        let mut files = self.files.write().await;
        let data = files
            .get(path)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(path.to_string()))?;

        let name = (0..)
            .map(|n| backup_name(path, n))
            .find(|candidate| !files.contains_key(candidate))
            .ok_or_else(|| VaultError::BackendError("no free backup name".to_string()))?;
        files.insert(name.clone(), data);
        Ok(name)
    }

    async fn resolve_link(&self, target: &str, from: &str) -> VaultResult<Option<VaultFile>> {
        let paths = self.paths().await;
        Ok(resolve_target(&paths, target, from).map(VaultFile::new))
    }

    async fn read_bytes(&self, file: &VaultFile) -> VaultResult<Bytes> {
        if let Ok(mut reads) = self.byte_reads.lock() {
            *reads.entry(file.path().to_string()).or_default() += 1;
        }
        let files = self.files.read().await;
        files
            .get(file.path())
            .cloned()
            .ok_or_else(|| VaultError::NotFound(file.path().to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
