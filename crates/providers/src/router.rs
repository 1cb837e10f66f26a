//! Provider selection.
//!
//! Maps a run's provider name to a concrete [`Provider`] implementation,
//! threading through API keys and endpoint overrides from the app config.

use std::sync::Arc;

use loomweave_config::AppConfig;
use loomweave_core::error::ProviderError;
use loomweave_core::provider::Provider;
use loomweave_core::run::RunConfig;
use tracing::debug;

use crate::anthropic::AnthropicProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiCompatProvider;

/// Resolve the provider named by a run configuration.
///
/// Recognized names: `anthropic`, `openai`, `openai_compat`, `openrouter`,
/// and `ollama`. An `endpoint` on the run overrides the provider's
/// default base URL.
pub fn provider_for(
    run: &RunConfig,
    config: &AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    debug!(provider = %run.provider, model = %run.model, "Resolving provider");

    match run.provider.as_str() {
        "anthropic" => {
            let api_key = config.api_key_for("anthropic").ok_or_else(|| {
                ProviderError::NotConfigured("No API key configured for anthropic".into())
            })?;
            let mut provider = AnthropicProvider::new(api_key);
            if let Some(url) = endpoint_for(run, config, "anthropic") {
                provider = provider.with_base_url(url);
            }
            Ok(Arc::new(provider))
        }
        "openai" => {
            let api_key = config.api_key_for("openai").ok_or_else(|| {
                ProviderError::NotConfigured("No API key configured for openai".into())
            })?;
            match endpoint_for(run, config, "openai") {
                Some(url) => Ok(Arc::new(OpenAiCompatProvider::new("openai", url, api_key))),
                None => Ok(Arc::new(OpenAiCompatProvider::openai(api_key))),
            }
        }
        "openrouter" => {
            let api_key = config.api_key_for("openrouter").ok_or_else(|| {
                ProviderError::NotConfigured("No API key configured for openrouter".into())
            })?;
            Ok(Arc::new(OpenAiCompatProvider::openrouter(api_key)))
        }
        "openai_compat" => {
            let url = endpoint_for(run, config, "openai_compat").ok_or_else(|| {
                ProviderError::NotConfigured(
                    "openai_compat requires an endpoint (run or config)".into(),
                )
            })?;
            let api_key = config.api_key_for("openai_compat").unwrap_or_default();
            Ok(Arc::new(OpenAiCompatProvider::new(
                "openai_compat",
                url,
                api_key,
            )))
        }
        "ollama" => match endpoint_for(run, config, "ollama") {
            Some(url) => Ok(Arc::new(OllamaProvider::with_base_url(url))),
            None => Ok(Arc::new(OllamaProvider::new())),
        },
        other => Err(ProviderError::NotConfigured(format!(
            "Unknown provider: {other}"
        ))),
    }
}

fn endpoint_for(run: &RunConfig, config: &AppConfig, provider: &str) -> Option<String> {
    run.endpoint
        .clone()
        .or_else(|| config.api_url_for(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomweave_config::ProviderConfig;

    fn config_with_key(provider: &str, key: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.providers.insert(
            provider.to_string(),
            ProviderConfig {
                api_key: Some(key.to_string()),
                api_url: None,
                default_model: None,
            },
        );
        config
    }

    #[test]
    fn resolves_anthropic() {
        let config = config_with_key("anthropic", "sk-ant-test");
        let run = RunConfig::new("anthropic", "claude-sonnet-4-20250514");
        let provider = provider_for(&run, &config).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn resolves_openai() {
        let config = config_with_key("openai", "sk-test");
        let run = RunConfig::new("openai", "gpt-4o");
        let provider = provider_for(&run, &config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn resolves_openrouter() {
        let config = config_with_key("openrouter", "sk-or-test");
        let run = RunConfig::new("openrouter", "anthropic/claude-sonnet-4");
        let provider = provider_for(&run, &config).unwrap();
        assert_eq!(provider.name(), "openrouter");
    }

    #[test]
    fn resolves_ollama_without_key() {
        let config = AppConfig::default();
        let run = RunConfig::new("ollama", "llama3.2");
        let provider = provider_for(&run, &config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn resolves_ollama_with_endpoint_override() {
        let config = AppConfig::default();
        let run = RunConfig::new("ollama", "llama3.2").with_endpoint("http://gpu-box:11434");
        let provider = provider_for(&run, &config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn openai_compat_requires_endpoint() {
        let config = AppConfig::default();
        let run = RunConfig::new("openai_compat", "local-model");
        let err = provider_for(&run, &config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));

        let run = run.with_endpoint("http://localhost:8080/v1");
        assert!(provider_for(&run, &config).is_ok());
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = AppConfig::default();
        let run = RunConfig::new("grok", "grok-3");
        let err = provider_for(&run, &config).err().unwrap();
        match err {
            ProviderError::NotConfigured(msg) => assert!(msg.contains("grok")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_key_rejected() {
        let mut config = AppConfig::default();
        config.api_key = None;
        let run = RunConfig::new("anthropic", "claude-sonnet-4-20250514");
        assert!(provider_for(&run, &config).is_err());
    }
}
