//! # ao-links
//!
//! The pure text side of attachment offloading.
//!
//! - `scanner`: finds wiki and markdown references with exact byte spans
//! - `classify`: decides which targets are remote and which are attachment candidates
//! - `render`: produces the replacement text for an uploaded attachment
//! - `patch`: applies many replacements to a document in one pass
//!
//! Nothing in this crate performs I/O or logs; it is driven by `ao-convert`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ao_links::{scan_references, apply_replacements, ReplacementSpan};
//!
//! let text = "See ![[photo.png]]";
//! let refs = scan_references(text);
//! let spans: Vec<_> = refs
//!     .iter()
//!     .filter_map(|r| ReplacementSpan::for_reference(r, "![](<https://cdn/x.png>)"))
//!     .collect();
//! let patched = apply_replacements(text, spans)?;
//! ```

pub mod classify;
pub mod patch;
pub mod reference;
pub mod render;
pub mod scanner;

pub use classify::{is_remote_target, target_extension, Classifier, REMOTE_SCHEMES};
pub use patch::{apply_replacements, PatchError, PatchResult};
pub use reference::{AttachmentReference, ReferenceKind, ReplacementSpan};
pub use render::render_replacement;
pub use scanner::scan_references;
