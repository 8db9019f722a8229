//! Claude API generator implementation.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::ai::{
    error::GeneratorError, prompts, GenerationOptions, GeneratorMetadata, MessageGenerator,
};

/// Default model when none is configured.
const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

/// Maximum tokens for a single generated message.
const MAX_TOKENS: i32 = 1024;

/// API request message.
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

/// API request body.
#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    max_tokens: i32,
    system: String,
    messages: Vec<Message>,
}

/// API response content block.
#[derive(Deserialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

/// API response.
#[derive(Deserialize)]
struct GenerateResponse {
    content: Vec<Content>,
}

/// Claude-backed commit message generator.
pub struct ClaudeGenerator {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    options: GenerationOptions,
}

impl ClaudeGenerator {
    /// Creates a generator from environment credentials.
    pub fn from_env(model: Option<String>, options: GenerationOptions) -> Result<Self> {
        use crate::utils::settings::get_env_vars;

        let api_key = get_env_vars(&["RECOMMIT_API_KEY", "ANTHROPIC_API_KEY", "CLAUDE_API_KEY"])
            .map_err(|_| GeneratorError::ApiKeyNotFound)?;

        let model = model
            .or_else(|| crate::utils::settings::get_env_var("RECOMMIT_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            client: crate::ai::build_http_client()?,
            api_key,
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            model,
            options,
        })
    }

    /// Creates a generator against a custom endpoint.
    ///
    /// Used by tests against a local mock server.
    pub fn with_endpoint(
        api_url: String,
        api_key: String,
        model: String,
        options: GenerationOptions,
    ) -> Result<Self> {
        Ok(Self {
            client: crate::ai::build_http_client()?,
            api_key,
            api_url,
            model,
            options,
        })
    }

    /// Sends one generation request and extracts the message text.
    async fn request_message(&self, diff: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: prompts::system_prompt(&self.options),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompts::user_prompt(diff),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::NetworkError(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(GeneratorError::RateLimited.into());
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|e| {
                tracing::debug!("Failed to read error response body: {e}");
                String::new()
            });
            return Err(
                GeneratorError::RequestFailed(format!("HTTP {}: {}", status, error_text)).into(),
            );
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::InvalidResponseFormat(e.to_string()))?;

        let content = generate_response
            .content
            .first()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .ok_or_else(|| {
                GeneratorError::InvalidResponseFormat("No text content in response".to_string())
            })?;

        let message = strip_fences(content).trim().to_string();
        if message.is_empty() {
            return Err(
                GeneratorError::InvalidResponseFormat("Empty message in response".to_string())
                    .into(),
            );
        }

        tracing::debug!(response_len = message.len(), "Generated commit message");

        Ok(message)
    }
}

impl MessageGenerator for ClaudeGenerator {
    fn generate<'a>(
        &'a self,
        diff: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.request_message(diff))
    }

    fn metadata(&self) -> GeneratorMetadata {
        GeneratorMetadata {
            provider: "Anthropic".to_string(),
            model: self.model.clone(),
        }
    }
}

/// Strips a surrounding markdown code fence from a model response.
///
/// Models occasionally wrap the message despite instructions.
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop an optional language tag on the opening fence line
        let body = rest.split_once('\n').map_or("", |(_, body)| body);
        if let Some(inner) = body.strip_suffix("```") {
            return inner.trim_end();
        }
    }
    trimmed
}
