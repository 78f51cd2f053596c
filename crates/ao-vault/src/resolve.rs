//! Link resolution over a list of vault paths
//!
//! Order, for each of the written and percent-decoded forms of a target:
//! 1. Relative to the source document's folder
//! 2. Relative to the vault root
//! 3. Shortest vault path ending in the target (wiki-style "shortest path")
//!
//! A leading `/` restricts resolution to the vault root. Targets that climb
//! above the root never resolve.

/// Resolve `target`, written in document `from`, against `files`
pub fn resolve_target(files: &[String], target: &str, from: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }

    let mut candidates = vec![target.to_string()];
    if let Ok(decoded) = urlencoding::decode(target) {
        if decoded != target {
            candidates.push(decoded.into_owned());
        }
    }

    candidates
        .iter()
        .find_map(|candidate| resolve_candidate(files, candidate, from))
}

fn resolve_candidate(files: &[String], candidate: &str, from: &str) -> Option<String> {
    let candidate = candidate.replace('\\', "/");
    let exists = |path: &String| files.iter().any(|f| f == path);

    if let Some(absolute) = candidate.strip_prefix('/') {
        return normalize_path("", absolute).filter(exists);
    }

    if let Some(path) = normalize_path(parent_dir(from), &candidate).filter(exists) {
        return Some(path);
    }

    let needle = normalize_path("", &candidate)?;
    if exists(&needle) {
        return Some(needle);
    }

    let suffix = format!("/{}", needle);
    files
        .iter()
        .filter(|f| f.ends_with(&suffix))
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned()
}

/// Folder part of a vault path (`""` for top-level files)
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Join `rel` onto `base_dir`, folding `.` and `..`.
///
/// Returns `None` when the result would leave the vault root or is empty.
pub fn normalize_path(base_dir: &str, rel: &str) -> Option<String> {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();

    for part in rel.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
