use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::core::{MatcherConfig, TitleMatchPolicy};
use crate::models::ScoringWeights;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub reasoning: ReasoningSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Offline feature hashing, no model download
    #[default]
    Hashing,
    /// Ollama `/api/embeddings`
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub backend: EmbeddingBackend,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            dimension: default_embedding_dimension(),
            ollama_host: default_ollama_host(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_dimension() -> usize { 384 }
fn default_ollama_host() -> String { "http://localhost:11434".to_string() }
fn default_embedding_model() -> String { "all-minilm".to_string() }
fn default_embedding_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningSettings {
    /// auto | ollama | hf | none
    #[serde(default = "default_reasoning_mode")]
    pub mode: String,
    /// Per-attempt timeout for each backend
    #[serde(default = "default_reasoning_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub ollama: OllamaSettings,
    #[serde(default)]
    pub huggingface: HuggingFaceSettings,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            mode: default_reasoning_mode(),
            timeout_secs: default_reasoning_timeout(),
            ollama: OllamaSettings::default(),
            huggingface: HuggingFaceSettings::default(),
        }
    }
}

fn default_reasoning_mode() -> String { "auto".to_string() }
fn default_reasoning_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaSettings {
    #[serde(default = "default_ollama_host")]
    pub host: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

fn default_ollama_model() -> String { "mistral".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct HuggingFaceSettings {
    #[serde(default = "default_hf_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_hf_model")]
    pub model: String,
    pub api_token: Option<String>,
}

impl Default for HuggingFaceSettings {
    fn default() -> Self {
        Self {
            endpoint: default_hf_endpoint(),
            model: default_hf_model(),
            api_token: None,
        }
    }
}

fn default_hf_endpoint() -> String { crate::services::huggingface::DEFAULT_HF_ENDPOINT.to_string() }
fn default_hf_model() -> String { crate::services::huggingface::DEFAULT_HF_MODEL.to_string() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub title_policy: TitleMatchPolicy,
    #[serde(default)]
    pub min_score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_structural_weight")]
    pub structural: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            structural: default_structural_weight(),
            semantic: default_semantic_weight(),
        }
    }
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

fn default_structural_weight() -> f64 { 0.45 }
fn default_semantic_weight() -> f64 { 0.55 }

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// Deadline for all reasoning tasks of one request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with MATCHMAKER)
    /// 5. Plain backend variables (OLLAMA_HOST, HF_API_TOKEN, LLM_BACKEND, ...)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., MATCHMAKER__REASONING__MODE -> reasoning.mode
            .add_source(
                Environment::with_prefix("MATCHMAKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Matcher tunables, rejecting weights that could push a blend outside 0-100
    pub fn matcher_config(&self) -> Result<MatcherConfig, ConfigError> {
        let weights = &self.scoring.weights;
        let valid = |w: f64| w.is_finite() && w >= 0.0;
        if !valid(weights.structural) || !valid(weights.semantic) {
            return Err(ConfigError::Message(format!(
                "scoring weights must be non-negative, got structural={} semantic={}",
                weights.structural, weights.semantic
            )));
        }
        if weights.structural + weights.semantic > 1.0 + WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Message(format!(
                "scoring weights must sum to at most 1.0, got {}",
                weights.structural + weights.semantic
            )));
        }

        Ok(MatcherConfig {
            weights: ScoringWeights {
                structural: weights.structural,
                semantic: weights.semantic,
            },
            title_policy: self.scoring.title_policy,
            min_score: self.scoring.min_score,
            request_timeout: Duration::from_secs(self.pipeline.request_timeout_secs),
        })
    }
}

/// Apply the plain backend variables the service has always honoured
///
/// These win over config files and prefixed variables:
/// OLLAMA_HOST, OLLAMA_MODEL, HF_API_TOKEN, LLM_BACKEND, LLM_TIMEOUT
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(host) = env::var("OLLAMA_HOST") {
        builder = builder
            .set_override("reasoning.ollama.host", host.clone())?
            .set_override("embedding.ollama_host", host)?;
    }
    if let Ok(model) = env::var("OLLAMA_MODEL") {
        builder = builder.set_override("reasoning.ollama.model", model)?;
    }
    if let Ok(token) = env::var("HF_API_TOKEN") {
        builder = builder.set_override("reasoning.huggingface.api_token", token)?;
    }
    if let Ok(mode) = env::var("LLM_BACKEND") {
        builder = builder.set_override("reasoning.mode", mode)?;
    }
    if let Ok(timeout) = env::var("LLM_TIMEOUT") {
        match timeout.trim().parse::<i64>() {
            Ok(secs) => builder = builder.set_override("reasoning.timeout_secs", secs)?,
            Err(_) => tracing::warn!("Ignoring non-numeric LLM_TIMEOUT: {}", timeout),
        }
    }

    builder.build()
}
