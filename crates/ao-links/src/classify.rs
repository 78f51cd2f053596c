//! Target classification
//!
//! Runs before resolution so that note-to-note links, which vastly outnumber
//! attachment links, never reach the resolver.

use ao_core::OffloadConfig;

/// Prefixes of targets that are never local files
pub const REMOTE_SCHEMES: &[&str] = &["http://", "https://", "data:", "mailto:", "file:"];

/// Whether a target points at a remote or non-file resource
pub fn is_remote_target(target: &str) -> bool {
    let target = target.trim_start();
    REMOTE_SCHEMES.iter().any(|scheme| {
        target
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Lowercased extension of the last path segment, ignoring fragment and query
pub fn target_extension(target: &str) -> Option<String> {
    let path = match target.find(['#', '?']) {
        Some(idx) => &target[..idx],
        None => target,
    };
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Applies the configured extension table to reference targets and resolved files
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    config: &'a OffloadConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a OffloadConfig) -> Self {
        Self { config }
    }

    pub fn is_remote(&self, target: &str) -> bool {
        is_remote_target(target)
    }

    /// Whether a written target looks like a supported local attachment
    pub fn is_attachment_candidate(&self, target: &str) -> bool {
        target_extension(target)
            .and_then(|ext| self.config.media_type_for_extension(&ext))
            .is_some()
    }

    /// Media type of a resolved file, `None` when it is a note or unsupported
    pub fn media_type_for_path(&self, path: &str) -> Option<&'a str> {
        let ext = target_extension(path)?;
        self.config.media_type_for_extension(&ext)
    }
}
