//! Shared types, error model, and configuration for docdigest.
//!
//! This crate is the foundation depended on by all other docdigest crates.
//! It provides:
//! - [`DigestError`]: the unified error type
//! - Domain types ([`FileId`], [`FileMeta`], [`Fragment`], [`SummaryRecord`], [`OutputFormat`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_SENTINELS, IngestConfig, OpenRouterConfig, PipelineConfig, StorageConfig,
    SummaryConfig, ValidatorConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_api_key,
};
pub use error::{DigestError, Result};
pub use types::{FileId, FileMeta, Fragment, OutputFormat, SummaryRecord};
