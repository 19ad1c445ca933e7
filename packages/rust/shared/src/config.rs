//! Application configuration for docdigest.
//!
//! User config lives at `~/.docdigest/docdigest.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DigestError, Result};
use crate::types::OutputFormat;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docdigest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docdigest";

/// Default database file name inside the config directory.
const DB_FILE_NAME: &str = "docdigest.db";

/// Replies that the generation service produces instead of a summary.
pub const DEFAULT_SENTINELS: &[&str] = &[
    "none",
    "null",
    "no summary generated",
    "[no summary generated]",
    "no content was found",
];

// ---------------------------------------------------------------------------
// Config structs (matching docdigest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Summarization pipeline settings.
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Garbage-output rejection rules.
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Plain-text ingest settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Database location.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[summary]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Markup requested from the generation service.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Word budget per batch.
    #[serde(default = "default_batch_words")]
    pub batch_words: usize,

    /// Output token cap for each per-batch generation call.
    #[serde(default = "default_batch_max_tokens")]
    pub batch_max_tokens: u32,

    /// Fraction of the input word count the final summary aims for.
    #[serde(default = "default_target_ratio")]
    pub target_ratio: f64,

    /// Upper bound on the reduction call's token budget.
    #[serde(default = "default_max_tokens_cap")]
    pub max_tokens_cap: u32,

    /// Sampling temperature for every generation call.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Whether multiple batch summaries are compressed by a reduction call.
    #[serde(default = "default_true")]
    pub hierarchical: bool,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            batch_words: default_batch_words(),
            batch_max_tokens: default_batch_max_tokens(),
            target_ratio: default_target_ratio(),
            max_tokens_cap: default_max_tokens_cap(),
            temperature: default_temperature(),
            hierarchical: true,
        }
    }
}

fn default_batch_words() -> usize {
    1200
}
fn default_batch_max_tokens() -> u32 {
    2000
}
fn default_target_ratio() -> f64 {
    0.12
}
fn default_max_tokens_cap() -> u32 {
    16_000
}
fn default_temperature() -> f64 {
    0.2
}
fn default_true() -> bool {
    true
}

/// `[validator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Lowercase replies treated as "no summary".
    #[serde(default = "default_sentinels")]
    pub sentinels: Vec<String>,

    /// Minimum trimmed length, in characters, of an acceptable summary.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            sentinels: default_sentinels(),
            min_chars: default_min_chars(),
        }
    }
}

fn default_sentinels() -> Vec<String> {
    DEFAULT_SENTINELS.iter().map(|s| (*s).to_string()).collect()
}
fn default_min_chars() -> usize {
    20
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Words per extracted fragment.
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    /// Words shared between consecutive fragments of the same page.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_words: default_chunk_words(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_words() -> usize {
    200
}
fn default_overlap() -> usize {
    40
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for every generation call.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OpenRouterConfig {
    /// Parse `base_url`, rejecting anything that is not an absolute URL.
    pub fn parsed_base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| DigestError::config(format!("invalid base_url '{}': {e}", self.base_url)))
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "meta-llama/llama-3.1-8b-instruct".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database path. Defaults to `~/.docdigest/docdigest.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl StorageConfig {
    /// Resolve the database path, falling back to the config directory.
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(config_dir()?.join(DB_FILE_NAME)),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Markup requested from the generation service.
    pub output_format: OutputFormat,
    /// Word budget per batch.
    pub batch_words: usize,
    /// Output token cap per batch call.
    pub batch_max_tokens: u32,
    /// Target ratio for the final summary.
    pub target_ratio: f64,
    /// Cap on the reduction call's token budget.
    pub max_tokens_cap: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Whether to run the reduction call.
    pub hierarchical: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_format: config.summary.output_format,
            batch_words: config.summary.batch_words,
            batch_max_tokens: config.summary.batch_max_tokens,
            target_ratio: config.summary.target_ratio,
            max_tokens_cap: config.summary.max_tokens_cap,
            temperature: config.summary.temperature,
            hierarchical: config.summary.hierarchical,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docdigest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DigestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docdigest/docdigest.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DigestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DigestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DigestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DigestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DigestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(DigestError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}
