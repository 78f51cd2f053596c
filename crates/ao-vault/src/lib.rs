//! # ao-vault
//!
//! The document store as seen by a conversion run.
//!
//! ## Features
//!
//! - `Vault` trait: list documents by scope, read/write text, back up, resolve links, read bytes
//! - Link resolution shared by all implementations (relative, root-relative, shortest suffix)
//! - `FsVault` over a directory tree, `MemoryVault` for tests

pub mod fs;
pub mod memory;
pub mod resolve;
pub mod vault;

pub use fs::FsVault;
pub use memory::MemoryVault;
pub use resolve::{normalize_path, parent_dir, resolve_target};
pub use vault::{backup_name, Vault, VaultError, VaultFile, VaultResult};
