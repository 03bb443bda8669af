//! LLM provider implementations.
//!
//! Contains the Anthropic implementation of the [`LlmProvider`] trait defined
//! in `gleaner-core`, and [`create_provider`], which builds the extraction
//! provider from the global configuration.
//!
//! [`LlmProvider`]: gleaner_core::llm::provider::LlmProvider

pub mod anthropic;

use secrecy::SecretString;

use gleaner_core::llm::box_provider::BoxLlmProvider;
use gleaner_types::config::GlobalConfig;
use gleaner_types::llm::LlmError;

use self::anthropic::AnthropicProvider;

/// Create the [`BoxLlmProvider`] used for lesson extraction.
///
/// # Errors
///
/// Returns [`LlmError::AuthenticationFailed`] when no API key is available,
/// or a provider error if the HTTP client cannot be built.
pub fn create_provider(
    config: &GlobalConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key.ok_or(LlmError::AuthenticationFailed)?;
    let provider = AnthropicProvider::new(key, config.extraction.model.clone(), &config.provider)?;
    Ok(BoxLlmProvider::new(provider))
}
