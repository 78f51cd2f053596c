//! Core error types for attachment offloading
//!
//! Only run-level failures live here. Per-reference and per-file failures are
//! recorded in the conversion report instead of being returned as errors.

use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Config file error: {0}")]
    FileError(String),
    #[error("Scope {scope} requires a current document")]
    MissingCurrentDocument { scope: &'static str },
}

impl From<::config::ConfigError> for ConfigError {
    fn from(err: ::config::ConfigError) -> Self {
        ConfigError::FileError(err.to_string())
    }
}

/// Run-level error for a conversion
#[derive(Error, Debug)]
pub enum OffloadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not configured: {component}")]
    NotConfigured { component: &'static str },

    #[error("No documents in scope: {scope}")]
    EmptyScope { scope: String },

    #[error("Document store error: {0}")]
    DocumentStore(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OffloadError {
    pub fn error_code(&self) -> &'static str {
        match self {
            OffloadError::Config(_) => "configuration_error",
            OffloadError::NotConfigured { .. } => "not_configured",
            OffloadError::EmptyScope { .. } => "empty_scope",
            OffloadError::DocumentStore(_) => "document_store_error",
            OffloadError::Internal(_) => "internal_error",
        }
    }

    /// Whether the run was refused before touching any document
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OffloadError::Config(_) | OffloadError::NotConfigured { .. } | OffloadError::EmptyScope { .. }
        )
    }
}

/// Standard result type for run-level operations
pub type OffloadResult<T> = Result<T, OffloadError>;
