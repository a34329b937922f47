//! Shared types, error model, and configuration for StudioSync.
//!
//! This crate is the foundation depended on by all other StudioSync crates.
//! It provides:
//! - [`StudioSyncError`]: the unified error type
//! - Domain types ([`Transcript`], [`Turn`], [`Role`], [`Credential`], [`Outcome`])
//! - Configuration ([`AppConfig`], [`FeishuSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AssemblyConfig, AssemblyStrategy, ExtractorConfig, FeishuConfig, FeishuSettings,
    PageConfig, config_dir, config_file_path, init_config, init_config_at, load_config,
    load_config_from, load_config_or_default,
};
pub use error::{Result, StudioSyncError};
pub use types::{
    AccessToken, Credential, DEFAULT_TITLE, DocumentHandle, DocumentTarget, Outcome, Role,
    Transcript, Turn,
};
