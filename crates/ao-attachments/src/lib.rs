//! # ao-attachments
//!
//! Remote side of attachment offloading.
//!
//! ## Features
//!
//! - Object store abstraction (memory, local directory, HTTP)
//! - Content-addressed object names (stem + SHA-256)
//! - Upload service with a run-scoped dedup cache
//!
//! ## Example
//!
//! ```rust,ignore
//! use ao_attachments::{MemoryObjectStore, UploadOptions, UploadService};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryObjectStore::new());
//! let mut uploads = UploadService::new(store, UploadOptions::default());
//!
//! let outcome = uploads.ensure_uploaded(&vault, &file, "image/png").await?;
//! println!("{} -> {}", file, outcome.url);
//! ```

pub mod http;
pub mod model;
pub mod naming;
pub mod service;
pub mod storage;

pub use http::HttpObjectStore;
pub use model::{UploadOptions, UploadOutcome, UploadStatus};
pub use naming::{content_digest, join_url, object_name, proxy_url, sanitize_stem};
pub use service::{UploadError, UploadResult, UploadService};
pub use storage::{
    LocalObjectStore, MemoryObjectStore, ObjectStore, StorageError, StorageResult, StoredObject,
};
