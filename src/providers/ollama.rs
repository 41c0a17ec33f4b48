use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::{BackendKind, Config};
use crate::errors::BackendError;

use super::retry::RetryPolicy;
use super::{classify_status, clean_response, from_reqwest, language_display_name, render_prompt, Backend};

/// Prompt used for most models
pub const DEFAULT_PROMPT: &str = "Translate the following text into {target_language}. \
Return only the translation, without the original text or any explanation.\n\n{text}";

/// Shorter prompt that works better with Llama-family models
pub const LLAMA_PROMPT: &str = "Translate to {target_language}:\n{text}";

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// Model name to use for generation
    model: String,
    /// Human-readable target language used in prompts
    target_language: String,
    /// Prompt template with {target_language} and {text} placeholders
    prompt_template: String,
    /// Temperature for generation
    temperature: f32,
    /// HTTP client for making requests
    client: Client,
    /// Retry policy for every request
    retry: RetryPolicy,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: None,
            stream: Some(false),
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }
}

impl Ollama {
    /// Create a new Ollama client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        target_language: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        let model = model.into();
        let prompt_template = if model.to_lowercase().contains("llama") {
            LLAMA_PROMPT.to_string()
        } else {
            DEFAULT_PROMPT.to_string()
        };

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            target_language: target_language.into(),
            prompt_template,
            temperature: 0.3,
            // Per-attempt timeout is enforced by the retry policy
            client: Client::builder()
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            retry,
        }
    }

    /// Create a client from the application configuration
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let translation = &config.translation;
        let settings = translation.get_backend_config(&BackendKind::Ollama);
        let endpoint = settings
            .map(|s| s.endpoint.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let model = settings.map(|s| s.model.clone()).unwrap_or_default();
        if model.is_empty() {
            return Err(BackendError::NotConfigured("Ollama model name is empty".to_string()));
        }

        let mut ollama = Self::new(
            endpoint,
            model,
            language_display_name(&config.target_language),
            config.retry_policy(),
        )
        .with_temperature(translation.common.temperature);
        if let Some(template) = settings.map(|s| s.prompt_template.clone()).filter(|t| !t.trim().is_empty()) {
            ollama = ollama.with_prompt_template(template);
        }
        Ok(ollama)
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replace the prompt template
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// The prompt sent for `text`
    pub fn prompt_for(&self, text: &str) -> String {
        render_prompt(&self.prompt_template, &self.target_language, text)
    }

    /// Send one generation request, without retrying
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, BackendError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self.client.post(&url)
            .json(request)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(classify_status(status, error_text));
        }

        let response_text = response.text().await.map_err(from_reqwest)?;
        parse_generation(&response_text)
    }
}

/// Parse a generate response, accepting streamed JSONL as well
fn parse_generation(response_text: &str) -> Result<GenerationResponse, BackendError> {
    let error = match serde_json::from_str::<GenerationResponse>(response_text) {
        Ok(generated) => return Ok(generated),
        Err(e) => e,
    };

    debug!(
        "Ollama response is not a single JSON object ({}), trying JSONL. First 500 chars: {}",
        error,
        response_text.chars().take(500).collect::<String>()
    );

    // A streamed answer is one JSON object per line; concatenate the pieces
    let mut full_response = String::new();
    let mut model = String::new();
    let mut parsed_any = false;
    for line in response_text.lines().filter(|l| !l.trim().is_empty()) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
            parsed_any = true;
            if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
                full_response.push_str(part);
            }
            if let Some(name) = value.get("model").and_then(|v| v.as_str()) {
                model = name.to_string();
            }
        }
    }

    if parsed_any {
        Ok(GenerationResponse {
            model,
            response: full_response,
            done: true,
        })
    } else {
        Err(BackendError::ParseError(format!(
            "Failed to parse Ollama API response: {}",
            error
        )))
    }
}

#[async_trait]
impl Backend for Ollama {
    fn id(&self) -> &str {
        "ollama"
    }

    async fn translate(&self, text: &str) -> Result<String, BackendError> {
        let request = GenerationRequest::new(self.model.clone(), self.prompt_for(text))
            .temperature(self.temperature);
        let request = &request;

        let generated = self.retry
            .run("Ollama request", move || self.generate(request))
            .await?;

        Ok(clean_response(&generated.response))
    }
}
