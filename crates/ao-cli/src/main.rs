//! attachment-offload
//!
//! Command line front end: uploads the local attachments referenced by a
//! vault's notes and rewrites the references to remote links.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ao_attachments::{HttpObjectStore, LocalObjectStore, ObjectStore};
use ao_convert::{ConversionReport, Converter};
use ao_core::{LinkMode, OffloadConfig, ScopeKind};
use ao_vault::FsVault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScopeArg {
    CurrentDocument,
    CurrentFolder,
    EntireVault,
}

impl From<ScopeArg> for ScopeKind {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::CurrentDocument => ScopeKind::CurrentDocument,
            ScopeArg::CurrentFolder => ScopeKind::CurrentFolder,
            ScopeArg::EntireVault => ScopeKind::EntireVault,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LinkModeArg {
    Proxy,
    Public,
}

impl From<LinkModeArg> for LinkMode {
    fn from(mode: LinkModeArg) -> Self {
        match mode {
            LinkModeArg::Proxy => LinkMode::Proxy,
            LinkModeArg::Public => LinkMode::Public,
        }
    }
}

/// Command-line arguments for attachment-offload
#[derive(Parser, Debug)]
#[command(name = "attachment-offload")]
#[command(about = "Upload local note attachments and rewrite their links")]
#[command(version)]
struct Args {
    /// Vault root directory
    #[arg(long, env = "OFFLOAD_VAULT")]
    vault: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which documents to convert
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Current document, for the current-document and current-folder scopes
    #[arg(long)]
    current: Option<PathBuf>,

    /// Report what would change without uploading or writing
    #[arg(long)]
    dry_run: bool,

    /// Back up each document before rewriting it
    #[arg(long)]
    backup: bool,

    #[arg(long, value_enum)]
    link_mode: Option<LinkModeArg>,

    /// Base URL for public links
    #[arg(long)]
    public_base: Option<String>,

    /// Origin of the local retrieval endpoint for proxy links
    #[arg(long)]
    proxy_origin: Option<String>,

    /// Store objects in a local directory
    #[arg(long, conflicts_with = "store_url")]
    store_dir: Option<PathBuf>,

    /// Store objects on an HTTP endpoint (HEAD/PUT)
    #[arg(long)]
    store_url: Option<String>,

    /// Bearer token for the HTTP store
    #[arg(long, env = "OFFLOAD_STORE_TOKEN", hide_env_values = true)]
    store_token: Option<String>,

    /// Write the full report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print one line per reference handled
    #[arg(long)]
    preview: bool,
}

impl Args {
    /// Command-line flags win over file and environment settings
    fn apply_overrides(&self, config: &mut OffloadConfig) {
        if let Some(scope) = self.scope {
            config.scope = scope.into();
        }
        if let Some(current) = &self.current {
            config.current_document = Some(vault_relative(&self.vault, current));
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.backup {
            config.make_backup = true;
        }
        if let Some(mode) = self.link_mode {
            config.link_mode = mode.into();
        }
        if let Some(base) = &self.public_base {
            config.public_base_url = Some(base.clone());
        }
        if let Some(origin) = &self.proxy_origin {
            config.proxy_origin = origin.clone();
        }
    }

    fn object_store(&self) -> Result<Option<Arc<dyn ObjectStore>>> {
        if let Some(dir) = &self.store_dir {
            return Ok(Some(Arc::new(LocalObjectStore::new(dir))));
        }
        if let Some(url) = &self.store_url {
            let store = HttpObjectStore::new(url.clone(), self.store_token.clone())
                .context("Invalid object store URL")?;
            return Ok(Some(Arc::new(store)));
        }
        Ok(None)
    }
}

/// Vault-relative, `/`-separated form of a document path
fn vault_relative(vault: &Path, document: &Path) -> String {
    let relative = document.strip_prefix(vault).unwrap_or(document);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| c != "/")
        .collect::<Vec<_>>()
        .join("/")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config =
        OffloadConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        vault = %args.vault.display(),
        scope = %config.scope,
        dry_run = config.dry_run,
        "Starting attachment offload"
    );

    let vault = FsVault::open(&args.vault, config.note_extension.clone())
        .await
        .with_context(|| format!("Failed to open vault {}", args.vault.display()))?;

    let mut converter = Converter::new(config, Arc::new(vault));
    if let Some(store) = args.object_store()? {
        converter = converter.with_store(store);
    }

    let report = converter.convert().await.context("Conversion refused")?;

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    print_report(&report, args.preview);
    Ok(())
}

fn print_report(report: &ConversionReport, preview: bool) {
    if preview {
        for line in &report.preview {
            println!("{}", line);
        }
    }
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    for error in &report.errors {
        eprintln!("error: {}", error);
    }
    println!("{}", report.summary());
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,ao_convert=debug,ao_attachments=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}
