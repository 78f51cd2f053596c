//! Conversion report

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one conversion run.
///
/// Built up while the run progresses and handed back unchanged once it ends.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    pub documents_scanned: usize,
    pub documents_changed: usize,
    pub backups_made: usize,

    /// Every reference the scanner found
    pub refs_found: usize,
    /// Note links, overlapping matches and references whose rendering is unchanged
    pub refs_skipped: usize,
    /// Targets with a remote scheme
    pub refs_remote: usize,
    pub refs_unresolved: usize,
    pub refs_unsupported: usize,

    /// Distinct files hashed and checked against the store
    pub uploads_attempted: usize,
    /// Object already present in the store
    pub uploads_skipped: usize,
    pub uploads_succeeded: usize,
    pub uploads_failed: usize,
    /// References answered from the run cache
    pub uploads_deduplicated: usize,

    pub links_rewritten: usize,

    /// One line per rewritten, unresolved, unsupported or failed reference
    pub preview: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConversionReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            documents_scanned: 0,
            documents_changed: 0,
            backups_made: 0,
            refs_found: 0,
            refs_skipped: 0,
            refs_remote: 0,
            refs_unresolved: 0,
            refs_unsupported: 0,
            uploads_attempted: 0,
            uploads_skipped: 0,
            uploads_succeeded: 0,
            uploads_failed: 0,
            uploads_deduplicated: 0,
            links_rewritten: 0,
            preview: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub(crate) fn record_preview(&mut self, tag: &str, document: &str, detail: impl AsRef<str>) {
        self.preview
            .push(format!("[{}] {}: {}", tag, document, detail.as_ref()));
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}{} documents scanned, {} changed, {} links rewritten, {} uploaded ({} already stored, {} failed), {} unresolved, {} unsupported",
            if self.dry_run { "[dry run] " } else { "" },
            self.documents_scanned,
            self.documents_changed,
            self.links_rewritten,
            self.uploads_succeeded,
            self.uploads_skipped,
            self.uploads_failed,
            self.refs_unresolved,
            self.refs_unsupported,
        );
        if self.backups_made > 0 {
            summary.push_str(&format!(", {} backups", self.backups_made));
        }
        if !self.errors.is_empty() {
            summary.push_str(&format!(", {} errors", self.errors.len()));
        }
        summary
    }
}
