//! LLM Provider implementations for rentwise.
//!
//! All providers implement the `rentwise_core::Provider` trait. The delegated
//! slot extractor is the only consumer.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use rentwise_config::LlmConfig;
use rentwise_core::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;

/// Default endpoint when only an API key is configured.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Build the extraction provider from configuration.
///
/// Returns `Ok(None)` when neither an API key nor a base URL is set, which
/// means slot extraction runs on rules only.
pub fn build_from_config(
    config: &LlmConfig,
) -> std::result::Result<Option<Arc<dyn rentwise_core::Provider>>, ProviderError> {
    if !config.is_configured() {
        return Ok(None);
    }

    let base_url = config
        .base_url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
    // Self-hosted model services accept any bearer token.
    let api_key = config.api_key.clone().unwrap_or_else(|| "dummy".into());

    let provider = OpenAiCompatProvider::new(
        "openai-compat",
        base_url,
        api_key,
        Duration::from_secs(config.timeout_secs),
    )?;
    Ok(Some(Arc::new(provider)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentwise_core::Provider;

    #[test]
    fn unconfigured_llm_builds_nothing() {
        let provider = build_from_config(&LlmConfig::default()).unwrap();
        assert!(provider.is_none());
    }

    #[test]
    fn base_url_alone_is_enough() {
        let config = LlmConfig {
            base_url: Some("http://10.0.0.5:8888/v1".into()),
            ..LlmConfig::default()
        };
        let provider = build_from_config(&config).unwrap().unwrap();
        assert_eq!(provider.name(), "openai-compat");
    }

    #[test]
    fn api_key_alone_targets_openai() {
        let config = LlmConfig {
            api_key: Some("sk-test".into()),
            ..LlmConfig::default()
        };
        assert!(build_from_config(&config).unwrap().is_some());
    }
}
