//! OpenRouter (OpenAI-compatible chat completions) generator.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use docdigest_shared::{DigestError, OpenRouterConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::prompts::{system_prompt, user_prompt};
use crate::{GenerationRequest, TextGenerator};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("docdigest/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body quoted back in an error message.
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`TextGenerator`] backed by an OpenAI-compatible HTTP endpoint.
pub struct OpenRouterGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenRouterGenerator {
    /// Build a generator for `base_url` (e.g. `https://openrouter.ai/api/v1`).
    pub fn new(
        base_url: &Url,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DigestError::Generation(format!("client build: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.as_str().trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build a generator from the `[openrouter]` config section.
    pub fn from_config(config: &OpenRouterConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::new(
            &config.parsed_base_url()?,
            api_key,
            config.default_model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OpenRouterGenerator {
    #[instrument(skip_all, fields(model = %self.model, max_tokens = request.max_output_tokens))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let start = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(request.output_format).to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DigestError::Generation(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(DigestError::Generation(format!("HTTP {status}: {preview}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DigestError::Generation(format!("invalid response body: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DigestError::Generation("response contained no choices".into()))?;

        let content = choice.message.content.unwrap_or_default();
        debug!(
            chars = content.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "generation complete"
        );
        Ok(content)
    }
}
