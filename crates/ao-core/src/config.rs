//! Configuration types and loading
//!
//! Settings for one conversion run: which documents to visit, how to treat
//! them, where uploaded attachments are served from and how each media type is
//! rendered back into the document.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment prefix for overrides (`OFFLOAD__DRY_RUN=true`, ...)
pub const ENV_PREFIX: &str = "OFFLOAD";

/// Which documents a run visits
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    CurrentDocument,
    CurrentFolder,
    #[default]
    EntireVault,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentDocument => "current_document",
            Self::CurrentFolder => "current_folder",
            Self::EntireVault => "entire_vault",
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved document selection, with vault-relative paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentScope {
    /// A single document
    Document(String),
    /// Every document directly inside a folder (`""` is the vault root)
    Folder(String),
    /// Every document in the vault
    All,
}

impl std::fmt::Display for DocumentScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document(path) => write!(f, "document {}", path),
            Self::Folder(path) if path.is_empty() => write!(f, "folder /"),
            Self::Folder(path) => write!(f, "folder {}", path),
            Self::All => write!(f, "entire vault"),
        }
    }
}

/// Where rewritten links point
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// A local retrieval endpoint that fetches from the store on demand
    #[default]
    Proxy,
    /// A direct public URL served by the store
    Public,
}

/// How an attachment reference is rendered after upload
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RenderMethod {
    /// `![alt](<url>)`
    Image,
    /// `<iframe src="url"></iframe>`
    Frame,
    /// `[label](<url>)`
    Link,
}

/// Main configuration for a conversion run
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OffloadConfig {
    /// Document selection
    pub scope: ScopeKind,
    /// Vault-relative path of the document the user is looking at
    pub current_document: Option<String>,
    /// Compute everything, commit nothing
    pub dry_run: bool,
    /// Copy each document before overwriting it
    pub make_backup: bool,
    /// Link mode for rewritten references
    pub link_mode: LinkMode,
    /// Base for public URLs (required by `LinkMode::Public`)
    pub public_base_url: Option<String>,
    /// Origin of the local retrieval endpoint used by `LinkMode::Proxy`
    pub proxy_origin: String,
    /// Extension of note documents, never treated as an attachment
    pub note_extension: String,
    /// Optional key prefix for uploaded objects
    pub object_prefix: Option<String>,
    /// Supported attachment extension -> media type. A configured table
    /// replaces the default one.
    pub extensions: BTreeMap<String, String>,
    /// Media type pattern (`image/png`, `image/*`) -> rendering method.
    /// Configured entries are merged over the defaults.
    #[serde(deserialize_with = "merge_render_methods")]
    pub render_methods: BTreeMap<String, RenderMethod>,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            scope: ScopeKind::EntireVault,
            current_document: None,
            dry_run: false,
            make_backup: false,
            link_mode: LinkMode::Proxy,
            public_base_url: None,
            proxy_origin: "http://127.0.0.1:27124".to_string(),
            note_extension: "md".to_string(),
            object_prefix: None,
            extensions: default_extensions(),
            render_methods: default_render_methods(),
        }
    }
}

/// Default supported-extension table
pub fn default_extensions() -> BTreeMap<String, String> {
    [
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("webp", "image/webp"),
        ("svg", "image/svg+xml"),
        ("bmp", "image/bmp"),
        ("avif", "image/avif"),
        ("mp3", "audio/mpeg"),
        ("wav", "audio/wav"),
        ("ogg", "audio/ogg"),
        ("m4a", "audio/mp4"),
        ("flac", "audio/flac"),
        ("mp4", "video/mp4"),
        ("webm", "video/webm"),
        ("mov", "video/quicktime"),
        ("pdf", "application/pdf"),
        ("zip", "application/zip"),
        (
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        (
            "xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        (
            "pptx",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ),
    ]
    .into_iter()
    .map(|(ext, media)| (ext.to_string(), media.to_string()))
    .collect()
}

/// Default media type -> rendering method table
pub fn default_render_methods() -> BTreeMap<String, RenderMethod> {
    [
        ("image/*", RenderMethod::Image),
        ("audio/*", RenderMethod::Image),
        ("video/*", RenderMethod::Image),
        ("application/pdf", RenderMethod::Link),
    ]
    .into_iter()
    .map(|(pattern, method)| (pattern.to_string(), method))
    .collect()
}

fn merge_render_methods<'de, D>(deserializer: D) -> Result<BTreeMap<String, RenderMethod>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let configured = BTreeMap::<String, RenderMethod>::deserialize(deserializer)?;
    let mut methods = default_render_methods();
    methods.extend(
        configured
            .into_iter()
            .map(|(pattern, method)| (pattern.to_lowercase(), method)),
    );
    Ok(methods)
}

impl OffloadConfig {
    /// Load configuration from defaults, an optional TOML file and
    /// `OFFLOAD__*` environment variables, in that order of precedence.
    ///
    /// The result is not validated; callers apply their own overrides first
    /// and then call [`OffloadConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::new(&path.to_string_lossy(), ::config::FileFormat::Toml)
                    .required(true),
            );
        }

        let loaded: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(loaded)
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "extensions".to_string(),
                message: "at least one attachment extension is required".to_string(),
            });
        }
        if self.note_extension.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "note_extension".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.proxy_origin.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "proxy_origin".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        self.document_scope().map(|_| ())
    }

    /// Resolve the configured scope against the current document
    pub fn document_scope(&self) -> Result<DocumentScope, ConfigError> {
        let current = self
            .current_document
            .as_deref()
            .map(|p| p.trim_start_matches('/'))
            .filter(|p| !p.is_empty());

        match (self.scope, current) {
            (ScopeKind::EntireVault, _) => Ok(DocumentScope::All),
            (ScopeKind::CurrentDocument, Some(doc)) => Ok(DocumentScope::Document(doc.to_string())),
            (ScopeKind::CurrentFolder, Some(doc)) => {
                let folder = doc.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
                Ok(DocumentScope::Folder(folder.to_string()))
            }
            (scope, None) => Err(ConfigError::MissingCurrentDocument {
                scope: scope.as_str(),
            }),
        }
    }

    /// Media type for a supported attachment extension.
    ///
    /// Returns `None` for the note extension and for unknown extensions.
    pub fn media_type_for_extension(&self, extension: &str) -> Option<&str> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        if ext.is_empty() || ext == self.note_extension.to_lowercase() {
            return None;
        }
        self.extensions.get(&ext).map(String::as_str)
    }

    /// Rendering method for a media type: exact match, then `type/*`, then link
    pub fn render_method_for(&self, media_type: &str) -> RenderMethod {
        let media_type = media_type.to_lowercase();
        if let Some(method) = self.render_methods.get(&media_type) {
            return *method;
        }
        let wildcard = match media_type.split_once('/') {
            Some((top, _)) => format!("{}/*", top),
            None => format!("{}/*", media_type),
        };
        self.render_methods
            .get(&wildcard)
            .copied()
            .unwrap_or(RenderMethod::Link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = OffloadConfig::default();
        assert_eq!(config.scope, ScopeKind::EntireVault);
        assert_eq!(config.link_mode, LinkMode::Proxy);
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_media_type_lookup() {
        let config = OffloadConfig::default();
        assert_eq!(config.media_type_for_extension("PNG"), Some("image/png"));
        assert_eq!(config.media_type_for_extension(".pdf"), Some("application/pdf"));
        assert_eq!(config.media_type_for_extension("md"), None);
        assert_eq!(config.media_type_for_extension("exe"), None);
        assert_eq!(config.media_type_for_extension(""), None);
    }

    #[test]
    fn test_note_extension_wins_over_table() {
        let mut config = OffloadConfig::default();
        config.extensions.insert("md".into(), "text/markdown".into());
        assert_eq!(config.media_type_for_extension("md"), None);
    }

    #[test]
    fn test_render_method_lookup() {
        let mut config = OffloadConfig::default();
        assert_eq!(config.render_method_for("image/png"), RenderMethod::Image);
        assert_eq!(config.render_method_for("video/mp4"), RenderMethod::Image);
        assert_eq!(config.render_method_for("application/pdf"), RenderMethod::Link);
        assert_eq!(config.render_method_for("application/zip"), RenderMethod::Link);

        config
            .render_methods
            .insert("application/pdf".into(), RenderMethod::Frame);
        config
            .render_methods
            .insert("image/svg+xml".into(), RenderMethod::Link);
        assert_eq!(config.render_method_for("application/pdf"), RenderMethod::Frame);
        assert_eq!(config.render_method_for("image/svg+xml"), RenderMethod::Link);
        assert_eq!(config.render_method_for("image/gif"), RenderMethod::Image);
    }

    #[test]
    fn test_document_scope() {
        let mut config = OffloadConfig::default();
        assert_eq!(config.document_scope().unwrap(), DocumentScope::All);

        config.scope = ScopeKind::CurrentDocument;
        assert!(matches!(
            config.document_scope(),
            Err(ConfigError::MissingCurrentDocument { .. })
        ));
        assert!(config.validate().is_err());

        config.current_document = Some("notes/daily/today.md".into());
        assert_eq!(
            config.document_scope().unwrap(),
            DocumentScope::Document("notes/daily/today.md".into())
        );

        config.scope = ScopeKind::CurrentFolder;
        assert_eq!(
            config.document_scope().unwrap(),
            DocumentScope::Folder("notes/daily".into())
        );

        config.current_document = Some("top.md".into());
        assert_eq!(config.document_scope().unwrap(), DocumentScope::Folder(String::new()));
    }

    #[test]
    fn test_validate_rejects_empty_tables() {
        let mut config = OffloadConfig::default();
        config.extensions.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "extensions"
        ));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
dry_run = true
link_mode = "public"
public_base_url = "https://cdn.example.com"
scope = "current_folder"
current_document = "inbox/today.md"

[render_methods]
"application/pdf" = "frame"
"#
        )
        .unwrap();

        let config = OffloadConfig::load(Some(file.path())).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.link_mode, LinkMode::Public);
        assert_eq!(config.public_base_url.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(config.render_method_for("application/pdf"), RenderMethod::Frame);
        // Default render entries survive a partial table
        assert_eq!(config.render_method_for("image/png"), RenderMethod::Image);
        assert_eq!(config.render_method_for("video/mp4"), RenderMethod::Image);
        // Untouched tables keep their defaults
        assert_eq!(config.media_type_for_extension("png"), Some("image/png"));
        assert_eq!(
            config.document_scope().unwrap(),
            DocumentScope::Folder("inbox".into())
        );
    }

    #[test]
    fn test_load_leaves_validation_to_caller() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"scope = "current_document""#).unwrap();

        let mut config = OffloadConfig::load(Some(file.path())).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCurrentDocument { .. })
        ));

        config.current_document = Some("inbox/today.md".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.document_scope().unwrap(),
            DocumentScope::Document("inbox/today.md".into())
        );
    }
}
