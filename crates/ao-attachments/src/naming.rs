//! Content addressing
//!
//! Object names are derived from the file's stem and the SHA-256 of its
//! content, so identical content under the same stem always lands on the
//! same object, within a run and across runs.

use sha2::{Digest, Sha256};
use url::Url;

use crate::storage::{StorageError, StorageResult};

/// SHA-256 of `data`, lowercase hex
pub fn content_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Make a stem safe for object keys and URLs
pub fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `[prefix/]stem-digest[.ext]`
pub fn object_name(stem: &str, digest: &str, extension: Option<&str>, prefix: Option<&str>) -> String {
    let mut name = format!("{}-{}", sanitize_stem(stem), digest);
    if let Some(ext) = extension.filter(|e| !e.is_empty()) {
        name.push('.');
        name.push_str(&ext.to_lowercase());
    }

    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}/{}", prefix, name),
        None => name,
    }
}

/// Append an object key to a base URL, percent-encoding each key segment
pub fn join_url(base: &str, key: &str) -> StorageResult<String> {
    let mut url = Url::parse(base).map_err(|e| StorageError::InvalidUrl(format!("{}: {}", base, e)))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| StorageError::InvalidUrl(base.to_string()))?;
        segments.pop_if_empty();
        for part in key.split('/') {
            segments.push(part);
        }
    }
    Ok(url.to_string())
}

/// URL of an object behind the local retrieval endpoint
pub fn proxy_url(origin: &str, key: &str) -> StorageResult<String> {
    join_url(origin, key)
}
