//! # ao-convert
//!
//! Batch conversion of local attachment references into remote links.
//!
//! The `Converter` walks the documents in scope, uploads every referenced
//! attachment once, rewrites the references and returns a
//! `ConversionReport`. Notifications and summaries are built from the report
//! alone.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ao_convert::Converter;
//! use std::sync::Arc;
//!
//! let converter = Converter::new(config, Arc::new(vault)).with_store(Arc::new(store));
//! let report = converter.convert().await?;
//! println!("{}", report.summary());
//! ```

pub mod converter;
pub mod report;

pub use converter::Converter;
pub use report::ConversionReport;
