//! Batch orchestrator
//!
//! Per document: scan, filter candidates, then for each reference one of
//! remote-skip, unresolved, unsupported or upload-and-rewrite. Collected
//! replacements are patched in one pass, backed up if asked, and written.
//! Documents and references are processed strictly in order; the upload
//! cache is the only state shared between documents.

use std::sync::Arc;

use ao_attachments::{ObjectStore, UploadError, UploadOptions, UploadService, UploadStatus};
use ao_core::{OffloadConfig, OffloadError, OffloadResult};
use ao_links::{
    apply_replacements, render_replacement, scan_references, AttachmentReference, Classifier,
    ReplacementSpan,
};
use ao_vault::Vault;
use tracing::{debug, info, instrument, warn};

use crate::report::ConversionReport;

/// Converts attachment references in a vault to remote links
pub struct Converter {
    config: OffloadConfig,
    vault: Arc<dyn Vault>,
    store: Option<Arc<dyn ObjectStore>>,
}

impl Converter {
    pub fn new(config: OffloadConfig, vault: Arc<dyn Vault>) -> Self {
        Self {
            config,
            vault,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &OffloadConfig {
        &self.config
    }

    /// Run one conversion over the configured scope.
    ///
    /// Only configuration problems are returned as errors. Everything that
    /// goes wrong for a single document, reference or file is recorded in
    /// the report and the run moves on.
    #[instrument(skip(self), fields(vault = self.vault.name(), dry_run = self.config.dry_run))]
    pub async fn convert(&self) -> OffloadResult<ConversionReport> {
        let store = self.store.clone().ok_or(OffloadError::NotConfigured {
            component: "object store",
        })?;
        let scope = self.config.document_scope()?;

        let documents = self
            .vault
            .list_documents(&scope)
            .await
            .map_err(|e| OffloadError::DocumentStore(e.to_string()))?;
        if documents.is_empty() {
            return Err(OffloadError::EmptyScope {
                scope: scope.to_string(),
            });
        }

        info!(
            scope = %scope,
            documents = documents.len(),
            store = store.name(),
            "Starting attachment conversion"
        );

        let mut uploads = UploadService::new(store, UploadOptions::from_config(&self.config));
        let mut report = ConversionReport::new(self.config.dry_run);

        for document in &documents {
            self.convert_document(document, &mut uploads, &mut report)
                .await;
            report.warnings.extend(uploads.take_warnings());
        }

        let report = report.finish();
        info!(
            scanned = report.documents_scanned,
            changed = report.documents_changed,
            rewritten = report.links_rewritten,
            uploaded = report.uploads_succeeded,
            errors = report.errors.len(),
            "Attachment conversion finished"
        );
        Ok(report)
    }

    async fn convert_document(
        &self,
        document: &str,
        uploads: &mut UploadService,
        report: &mut ConversionReport,
    ) {
        let text = match self.vault.read_text(document).await {
            Ok(text) => text,
            Err(e) => {
                warn!(document = %document, error = %e, "Could not read document");
                report.record_error(format!("{}: read failed: {}", document, e));
                return;
            }
        };
        report.documents_scanned += 1;

        let classifier = Classifier::new(&self.config);
        let references = scan_references(&text);
        report.refs_found += references.len();

        let mut replacements = Vec::new();
        let mut claimed_end = 0;
        for reference in &references {
            if classifier.is_remote(&reference.target) {
                report.refs_remote += 1;
                continue;
            }
            if !classifier.is_attachment_candidate(&reference.target) {
                report.refs_skipped += 1;
                continue;
            }
            if reference.start() < claimed_end {
                debug!(document = %document, raw = %reference.raw, "Overlapping reference skipped");
                report.refs_skipped += 1;
                continue;
            }
            claimed_end = reference.end();

            if let Some(span) = self
                .convert_reference(document, reference, &classifier, uploads, report)
                .await
            {
                replacements.push(span);
            }
        }

        if replacements.is_empty() {
            return;
        }

        let rewritten = replacements.len();
        let patched = match apply_replacements(&text, replacements) {
            Ok(patched) => patched,
            Err(e) => {
                warn!(document = %document, error = %e, "Patch rejected");
                report.record_error(format!("{}: patch failed: {}", document, e));
                return;
            }
        };

        if self.config.dry_run {
            report.links_rewritten += rewritten;
            return;
        }

        if self.config.make_backup {
            match self.vault.backup(document).await {
                Ok(backup) => {
                    debug!(document = %document, backup = %backup, "Backup made");
                    report.backups_made += 1;
                }
                Err(e) => {
                    warn!(document = %document, error = %e, "Backup failed, document left untouched");
                    report.record_error(format!("{}: backup failed: {}", document, e));
                    return;
                }
            }
        }

        match self.vault.write_text(document, &patched).await {
            Ok(()) => {
                info!(document = %document, links = rewritten, "Document updated");
                report.documents_changed += 1;
                report.links_rewritten += rewritten;
            }
            Err(e) => {
                warn!(document = %document, error = %e, "Could not write document");
                report.record_error(format!("{}: write failed: {}", document, e));
            }
        }
    }

    async fn convert_reference(
        &self,
        document: &str,
        reference: &AttachmentReference,
        classifier: &Classifier<'_>,
        uploads: &mut UploadService,
        report: &mut ConversionReport,
    ) -> Option<ReplacementSpan> {
        let file = match self.vault.resolve_link(&reference.target, document).await {
            Ok(Some(file)) => file,
            Ok(None) => {
                debug!(document = %document, raw = %reference.raw, "Unresolved reference");
                report.refs_unresolved += 1;
                report.record_preview("unresolved", document, &reference.raw);
                return None;
            }
            Err(e) => {
                report.refs_unresolved += 1;
                report.record_preview("unresolved", document, &reference.raw);
                report.record_error(format!(
                    "{}: resolving {} failed: {}",
                    document, reference.raw, e
                ));
                return None;
            }
        };

        let Some(media_type) = classifier.media_type_for_path(file.path()) else {
            debug!(document = %document, file = %file, "Unsupported attachment type");
            report.refs_unsupported += 1;
            report.record_preview("unsupported", document, format!("{} -> {}", reference.raw, file));
            return None;
        };

        let outcome = match uploads
            .ensure_uploaded(self.vault.as_ref(), &file, media_type)
            .await
        {
            Ok(outcome) => outcome,
            Err(UploadError::PreviouslyFailed(_)) => {
                report.record_preview("failed", document, &reference.raw);
                return None;
            }
            Err(e) => {
                report.uploads_attempted += 1;
                report.uploads_failed += 1;
                report.record_preview("failed", document, &reference.raw);
                report.record_error(format!("{}: upload failed: {}", file, e));
                return None;
            }
        };

        match outcome.status {
            UploadStatus::Uploaded => {
                report.uploads_attempted += 1;
                report.uploads_succeeded += 1;
            }
            UploadStatus::AlreadyExists => {
                report.uploads_attempted += 1;
                report.uploads_skipped += 1;
            }
            UploadStatus::WouldUpload => report.uploads_attempted += 1,
            UploadStatus::Cached => report.uploads_deduplicated += 1,
        }

        let method = self.config.render_method_for(media_type);
        let new_text = render_replacement(reference, &outcome.url, method, file.stem());
        match ReplacementSpan::for_reference(reference, new_text) {
            Some(span) => {
                report.record_preview(
                    "rewrite",
                    document,
                    format!("{} -> {}", reference.raw, span.new_text),
                );
                Some(span)
            }
            None => {
                report.refs_skipped += 1;
                None
            }
        }
    }
}
