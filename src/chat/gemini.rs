// src/chat/gemini.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{AdvisorError, AdvisorResult};

/// Fixed sampling configuration for every advisor reply.
pub const TEMPERATURE: f32 = 0.7;
pub const TOP_P: f32 = 1.0;
pub const TOP_K: u32 = 40;
pub const MAX_OUTPUT_TOKENS: u32 = 512;

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> AdvisorResult<String>;
}

/// Gemini `generateContent` request body
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Debug)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE,
            top_p: TOP_P,
            top_k: TOP_K,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

/// Gemini `generateContent` response body
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

pub struct GeminiClient {
    http_client: Client,
    endpoint: Url,
    api_key: String,
    generation_config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            anyhow::bail!("Missing GEMINI_API_KEY");
        }
        let endpoint = generate_content_url(&settings.api_base, &settings.model)?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build HTTP client for Gemini")?;
        info!(
            "Gemini client ready (model: {}, endpoint: {})",
            settings.model, endpoint
        );
        Ok(Self {
            http_client,
            endpoint,
            api_key: settings.api_key.clone(),
            generation_config: GenerationConfig::default(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn generate_content_url(api_base: &str, model: &str) -> Result<Url> {
    let mut base = api_base.trim_end_matches('/').to_string();
    base.push('/');
    let base = Url::parse(&base).with_context(|| format!("Invalid GEMINI_API_BASE '{}'", api_base))?;
    base.join(&format!("models/{}:generateContent", model))
        .with_context(|| format!("Invalid Gemini model name '{}'", model))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> AdvisorResult<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: self.generation_config.clone(),
        };

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request to Gemini: {}", e);
                AdvisorError::UpstreamGeneration(format!("Failed to reach Gemini: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::UpstreamGeneration(format!(
                "Gemini returned status {}: {}",
                status, body
            )));
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            AdvisorError::UpstreamGeneration(format!("Failed to parse Gemini response: {}", e))
        })?;
        extract_text(parsed)
    }
}

fn extract_text(response: GeminiResponse) -> AdvisorResult<String> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_ref())
    {
        return Err(AdvisorError::UpstreamGeneration(format!(
            "Gemini blocked the prompt: {}",
            reason
        )));
    }
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        AdvisorError::UpstreamGeneration("Gemini returned no candidates".to_string())
    })?;
    let text: String = candidate
        .content
        .parts
        .into_iter()
        .map(|part| part.text)
        .collect();
    if text.is_empty() {
        return Err(AdvisorError::UpstreamGeneration(format!(
            "Gemini returned an empty reply (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    debug!("Gemini reply: {} chars", text.len());
    Ok(text)
}
