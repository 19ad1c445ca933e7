//! Text generation collaborator for the summarization pipeline.
//!
//! The pipeline only knows the [`TextGenerator`] trait: one request in, one
//! string out, or an opaque [`DigestError::Generation`] failure. Retries,
//! rate limiting and latency are the implementation's business; the pipeline
//! counts every error as one failed attempt.
//!
//! [`DigestError::Generation`]: docdigest_shared::DigestError::Generation

mod openrouter;
pub mod prompts;

use async_trait::async_trait;
use docdigest_shared::{OutputFormat, Result};

pub use openrouter::OpenRouterGenerator;

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Source text to summarize.
    pub text: String,
    /// Markup the reply should be written in.
    pub output_format: OutputFormat,
    /// Output token cap.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Advisory length goal for the reply, in words.
    pub target_words: Option<usize>,
}

/// A service that turns a [`GenerationRequest`] into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one generation call. No retries are expected of callers.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
