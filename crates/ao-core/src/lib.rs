//! # ao-core
//!
//! Core types shared by the attachment offload crates.
//!
//! - Run-level error types (`OffloadError`, `ConfigError`)
//! - Run configuration (`OffloadConfig`) and its loading from file and environment

pub mod config;
pub mod error;

pub use crate::config::{DocumentScope, LinkMode, OffloadConfig, RenderMethod, ScopeKind};
pub use crate::error::*;
