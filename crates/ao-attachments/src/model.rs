//! Upload model

use ao_core::{LinkMode, OffloadConfig};
use serde::{Deserialize, Serialize};

/// How an upload request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Bytes were sent to the store
    Uploaded,
    /// An object with the same name was already present
    AlreadyExists,
    /// Dry run: the object is absent and would have been uploaded
    WouldUpload,
    /// Answered from the run cache without touching the file or the store
    Cached,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::AlreadyExists => "already_exists",
            Self::WouldUpload => "would_upload",
            Self::Cached => "cached",
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of `UploadService::ensure_uploaded`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// Content-addressed object name
    pub object_name: String,
    /// URL the reference should point at
    pub url: String,
    pub status: UploadStatus,
}

/// Settings the upload engine needs from the run configuration
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub dry_run: bool,
    pub link_mode: LinkMode,
    pub public_base_url: Option<String>,
    pub proxy_origin: String,
    pub object_prefix: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from_config(&OffloadConfig::default())
    }
}

impl UploadOptions {
    pub fn from_config(config: &OffloadConfig) -> Self {
        Self {
            dry_run: config.dry_run,
            link_mode: config.link_mode,
            public_base_url: config.public_base_url.clone(),
            proxy_origin: config.proxy_origin.clone(),
            object_prefix: config.object_prefix.clone(),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn public(mut self, base: Option<&str>) -> Self {
        self.link_mode = LinkMode::Public;
        self.public_base_url = base.map(str::to_string);
        self
    }
}
