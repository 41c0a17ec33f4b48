use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::providers::retry::RetryPolicy;
use crate::segmentation::{SegmentPolicy, ScriptClassifier};
use crate::translation::cache::TranslationCache;
use crate::translation::pipeline::PipelineConfig;
use crate::translation::reintegration::ReintegrationMode;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language code (ISO)
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Segment sizing
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Worker timings
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Directory for cache files; the platform data dir when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Keep each original passage followed by its translation
    #[serde(default)]
    pub bilingual: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    // @backend: Ollama (local)
    #[default]
    Ollama,
    // @backend: DeepSeek (OpenAI-compatible API)
    DeepSeek,
}

impl BackendKind {
    // @returns: Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::DeepSeek => "DeepSeek",
        }
    }

    // @returns: Lowercase backend identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::DeepSeek => "deepseek".to_string(),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "deepseek" => Ok(Self::DeepSeek),
            _ => Err(anyhow!("Invalid backend type: {}", s)),
        }
    }
}

/// Backend configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    // @field: Backend type identifier
    #[serde(rename = "type")]
    pub backend_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Prompt template, {target_language} and {text} placeholders; built-in when empty
    #[serde(default = "String::new")]
    pub prompt_template: String,
}

impl BackendConfig {
    // @param kind: Backend enum
    // @returns: Backend config with defaults
    pub fn new(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Ollama => Self {
                backend_type: kind.to_lowercase_string(),
                model: default_ollama_model(),
                api_key: String::new(),
                endpoint: default_ollama_endpoint(),
                prompt_template: String::new(),
            },
            BackendKind::DeepSeek => Self {
                backend_type: kind.to_lowercase_string(),
                model: default_deepseek_model(),
                api_key: String::new(),
                endpoint: default_deepseek_endpoint(),
                prompt_template: String::new(),
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Backend to use
    #[serde(default)]
    pub backend: BackendKind,

    /// Available backends
    #[serde(default)]
    pub available_backends: Vec<BackendConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all backends
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Attempts per unit, including the first one
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Timeout of a single attempt in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Segment size configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationConfig {
    /// Unit size limit for classical Chinese pages
    #[serde(default = "default_archaic_limit")]
    pub archaic_limit: usize,

    /// Unit size limit for every other page
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Classical marker density above which a page is archaic
    #[serde(default = "default_archaic_threshold")]
    pub archaic_threshold: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            archaic_limit: default_archaic_limit(),
            default_limit: default_limit(),
            archaic_threshold: default_archaic_threshold(),
        }
    }
}

/// Pipeline worker timings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineSettings {
    /// How long the worker waits for a task before checking for stop
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long stop waits for the worker to exit
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    90
}

fn default_archaic_limit() -> usize {
    300
}

fn default_limit() -> usize {
    1000
}

fn default_archaic_threshold() -> f64 {
    crate::segmentation::classifier::DEFAULT_ARCHAIC_THRESHOLD
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_stop_timeout_ms() -> u64 {
    2000
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_deepseek_endpoint() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_ollama_model() -> String {
    "deepseek-r1:14b".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

impl Config {
    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.target_language)?;

        let endpoint = self.translation.get_endpoint();
        url::Url::parse(&endpoint)
            .with_context(|| format!("Invalid endpoint for {}: {}", self.translation.backend, endpoint))?;

        if self.translation.get_model().is_empty() {
            return Err(anyhow!("A model is required for the {} backend", self.translation.backend.display_name()));
        }

        if self.translation.backend == BackendKind::DeepSeek && self.translation.get_api_key().is_empty() {
            return Err(anyhow!("Translation API key is required for DeepSeek backend"));
        }

        let common = &self.translation.common;
        if !(0.0..=2.0).contains(&common.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", common.temperature));
        }
        if common.retry_count == 0 {
            return Err(anyhow!("retry_count must be at least 1"));
        }
        if common.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be at least 1"));
        }

        let segmentation = &self.segmentation;
        if segmentation.archaic_limit == 0 || segmentation.default_limit == 0 {
            return Err(anyhow!("Segment limits must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&segmentation.archaic_threshold) {
            return Err(anyhow!(
                "archaic_threshold must be between 0.0 and 1.0, got {}",
                segmentation.archaic_threshold
            ));
        }

        Ok(())
    }

    /// Retry policy for the backend adapters
    pub fn retry_policy(&self) -> RetryPolicy {
        let common = &self.translation.common;
        RetryPolicy {
            max_attempts: common.retry_count,
            delay: Duration::from_millis(common.retry_delay_ms),
            attempt_timeout: Duration::from_secs(common.timeout_secs),
        }
    }

    /// Segment size policy
    pub fn segment_policy(&self) -> SegmentPolicy {
        SegmentPolicy {
            archaic_limit: self.segmentation.archaic_limit,
            default_limit: self.segmentation.default_limit,
        }
    }

    /// Register classifier
    pub fn classifier(&self) -> ScriptClassifier {
        ScriptClassifier::new(self.segmentation.archaic_threshold)
    }

    /// Pipeline timings
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            poll_interval: Duration::from_millis(self.pipeline.poll_interval_ms),
            stop_timeout: Duration::from_millis(self.pipeline.stop_timeout_ms),
        }
    }

    /// How translations are merged into pages
    pub fn reintegration_mode(&self) -> ReintegrationMode {
        if self.bilingual {
            ReintegrationMode::Bilingual
        } else {
            ReintegrationMode::Replace
        }
    }

    /// Directory holding the translation cache files
    pub fn cache_directory(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(TranslationCache::default_cache_dir)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: "zh".to_string(),
            translation: TranslationConfig::default(),
            segmentation: SegmentationConfig::default(),
            pipeline: PipelineSettings::default(),
            cache_dir: None,
            bilingual: false,
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active backend configuration from the available_backends array
    pub fn get_active_backend_config(&self) -> Option<&BackendConfig> {
        self.get_backend_config(&self.backend)
    }

    /// Get a specific backend configuration by type
    pub fn get_backend_config(&self, kind: &BackendKind) -> Option<&BackendConfig> {
        let kind_str = kind.to_lowercase_string();
        self.available_backends.iter()
            .find(|b| b.backend_type == kind_str)
    }

    /// Get a specific backend configuration by type, creating it with defaults if missing
    pub fn backend_config_mut(&mut self, kind: BackendKind) -> &mut BackendConfig {
        let kind_str = kind.to_lowercase_string();
        let position = match self.available_backends.iter().position(|b| b.backend_type == kind_str) {
            Some(position) => position,
            None => {
                self.available_backends.push(BackendConfig::new(kind));
                self.available_backends.len() - 1
            }
        };
        &mut self.available_backends[position]
    }

    /// Get the model for the active backend
    pub fn get_model(&self) -> String {
        if let Some(backend_config) = self.get_active_backend_config() {
            if !backend_config.model.is_empty() {
                return backend_config.model.clone();
            }
        }

        match self.backend {
            BackendKind::Ollama => default_ollama_model(),
            BackendKind::DeepSeek => default_deepseek_model(),
        }
    }

    /// Get the API key for the active backend
    pub fn get_api_key(&self) -> String {
        self.get_active_backend_config()
            .map(|b| b.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active backend
    pub fn get_endpoint(&self) -> String {
        if let Some(backend_config) = self.get_active_backend_config() {
            if !backend_config.endpoint.is_empty() {
                return backend_config.endpoint.clone();
            }
        }

        match self.backend {
            BackendKind::Ollama => default_ollama_endpoint(),
            BackendKind::DeepSeek => default_deepseek_endpoint(),
        }
    }

    /// Get the prompt template for the active backend, if one is configured
    pub fn get_prompt_template(&self) -> Option<String> {
        self.get_active_backend_config()
            .map(|b| b.prompt_template.clone())
            .filter(|t| !t.trim().is_empty())
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            available_backends: vec![
                BackendConfig::new(BackendKind::Ollama),
                BackendConfig::new(BackendKind::DeepSeek),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
