use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::app_config::{BackendKind, Config};
use crate::errors::BackendError;

use super::retry::RetryPolicy;
use super::{classify_status, clean_response, from_reqwest, language_display_name, render_prompt, Backend};

/// System prompt naming the target language
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a translation assistant. Translate the user's text into \
{target_language}. Return only the translation, without the original text or any explanation.";

/// DeepSeek client for the OpenAI-compatible chat completions API
#[derive(Debug)]
pub struct DeepSeek {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL
    endpoint: String,
    /// Model name
    model: String,
    /// System prompt, already rendered for the target language
    system_prompt: String,
    /// Temperature for generation
    temperature: f32,
    /// Maximum number of tokens to generate
    max_tokens: u32,
    /// Retry policy for every request
    retry: RetryPolicy,
}

/// Chat message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<ChatMessage>,

    /// Temperature for generation
    temperature: f32,

    /// Maximum number of tokens to generate
    max_tokens: u32,

    /// Whether to stream the response
    stream: bool,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Candidate completions
    pub choices: Vec<ChatChoice>,
}

/// Individual completion choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// Generated message
    pub message: ChatMessage,
}

impl DeepSeek {
    /// Create a new DeepSeek client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        target_language: &str,
        retry: RetryPolicy,
    ) -> Result<Self, BackendError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BackendError::NotConfigured("DeepSeek API key is missing".to_string()));
        }

        Ok(Self {
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            api_key,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            system_prompt: render_prompt(DEFAULT_SYSTEM_PROMPT, target_language, ""),
            temperature: 0.3,
            max_tokens: 2000,
            retry,
        })
    }

    /// Create a client from the application configuration
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let translation = &config.translation;
        let settings = translation.get_backend_config(&BackendKind::DeepSeek);
        let endpoint = settings
            .map(|s| s.endpoint.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "https://api.deepseek.com/v1".to_string());
        let model = settings
            .map(|s| s.model.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "deepseek-chat".to_string());
        let api_key = settings.map(|s| s.api_key.clone()).unwrap_or_default();
        let target_language = language_display_name(&config.target_language);

        let mut client = Self::new(api_key, endpoint, model, &target_language, config.retry_policy())?;
        client.temperature = translation.common.temperature;
        client.max_tokens = translation.common.max_tokens;
        if let Some(template) = settings.map(|s| s.prompt_template.clone()).filter(|t| !t.trim().is_empty()) {
            client.system_prompt = render_prompt(&template, &target_language, "");
        }
        Ok(client)
    }

    /// The system prompt sent with every request
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn build_request(&self, text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }

    /// Send one chat completion request, without retrying
    pub async fn complete(&self, request: &ChatCompletionRequest) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.endpoint);

        let response = self.client.post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("DeepSeek API error ({}): {}", status, error_text);
            return Err(classify_status(status, error_text));
        }

        let body = response.text().await.map_err(from_reqwest)?;
        parse_completion(&body)
    }
}

fn parse_completion(body: &str) -> Result<String, BackendError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::ParseError(format!("Failed to parse DeepSeek response: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| BackendError::ParseError("DeepSeek response has no choices".to_string()))
}

#[async_trait]
impl Backend for DeepSeek {
    fn id(&self) -> &str {
        "deepseek"
    }

    async fn translate(&self, text: &str) -> Result<String, BackendError> {
        let request = self.build_request(text);
        let request = &request;

        let content = self.retry
            .run("DeepSeek request", move || self.complete(request))
            .await?;

        Ok(clean_response(&content))
    }
}
