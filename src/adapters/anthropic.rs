//! Anthropic Messages API adapter.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AdapterOutput, GenerationApi, GenerationRequest};
use crate::config::GenerationSettings;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API
pub struct AnthropicAdapter {
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl AnthropicAdapter {
    /// Build an adapter from resolved settings.
    ///
    /// Fails when no API key is configured.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .context("ANTHROPIC_API_KEY is not set")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            client,
        })
    }

    /// Output budget grows with the number of drafts requested
    fn max_tokens_for(&self, request: &GenerationRequest) -> u32 {
        let drafts = u32::try_from(request.sources.len().max(1)).unwrap_or(u32::MAX);
        self.max_tokens.saturating_mul(drafts)
    }
}

#[async_trait]
impl GenerationApi for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<AdapterOutput> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens_for(request),
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: request.user_message(),
            }],
        };

        debug!(model = %self.model, sources = request.sources.len(), "Calling Messages API");

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("Failed to reach Anthropic API")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error ({}): {}", status, detail);
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        let content = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .unwrap_or_default();

        Ok(AdapterOutput {
            content,
            tokens_used: parsed.usage.map(|u| u.input_tokens + u.output_tokens),
        })
    }
}
