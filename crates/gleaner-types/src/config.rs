//! Global configuration types for Gleaner.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! extraction pipeline and the model provider connection.

use serde::{Deserialize, Serialize};

use crate::lesson::MIN_CONFIDENCE;

/// Top-level configuration.
///
/// Loaded from `~/.gleaner/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub provider: ProviderSettings,
}

/// Tuning for the lesson extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Model used for extraction. A small, fast tier is enough.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature; low values favour repeatable output.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Candidates below this confidence are dropped. Values under
    /// [`MIN_CONFIDENCE`] are raised to it.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// How many recent messages go into the prompt.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

fn default_model() -> String {
    "claude-haiku-4-5".to_string()
}

fn default_temperature() -> f64 {
    0.3
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_min_confidence() -> f64 {
    MIN_CONFIDENCE
}

fn default_context_window() -> usize {
    6
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            min_confidence: default_min_confidence(),
            context_window: default_context_window(),
        }
    }
}

impl ExtractionConfig {
    /// Clamp user-supplied values into their usable ranges.
    pub fn sanitized(mut self) -> Self {
        if !self.temperature.is_finite() {
            self.temperature = default_temperature();
        }
        self.temperature = self.temperature.clamp(0.0, 1.0);
        if !self.min_confidence.is_finite() {
            self.min_confidence = default_min_confidence();
        }
        self.min_confidence = self.min_confidence.clamp(MIN_CONFIDENCE, 1.0);
        self.context_window = self.context_window.max(1);
        self.max_tokens = self.max_tokens.max(1);
        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        self
    }
}

/// Connection settings for the Anthropic-compatible model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
