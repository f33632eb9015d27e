//! Provider factory.
//!
//! Resolves a provider name plus its optional config.yaml entry into a
//! ready-to-use client.

use crate::client::LlmClient;
use crate::providers::{AzureOpenAiClient, OllamaClient};
use crate::types::ProviderType;
use marquee_core::config::ProviderConfig;
use marquee_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a text generation client.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "azure-openai")
/// * `settings` - The provider's entry from config.yaml, if any
/// * `api_key` - Resolved API key (required for Azure OpenAI)
///
/// # Errors
/// Returns a config error if the provider is unknown, its settings are
/// missing or of the wrong shape, or a required key is absent.
pub fn create_client(
    provider: &str,
    settings: Option<&ProviderConfig>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    match provider_type {
        ProviderType::Ollama => match settings {
            Some(ProviderConfig::Ollama {
                endpoint,
                timeout: Some(secs),
                ..
            }) => Ok(Arc::new(OllamaClient::with_timeout(endpoint.as_str(), *secs)?)),
            Some(ProviderConfig::Ollama { endpoint, .. }) => {
                Ok(Arc::new(OllamaClient::with_base_url(endpoint.as_str())))
            }
            _ => Ok(Arc::new(OllamaClient::new())),
        },
        ProviderType::AzureOpenAI => {
            let Some(ProviderConfig::AzureOpenAI {
                endpoint,
                deployment,
                api_version,
                ..
            }) = settings
            else {
                return Err(AppError::Config(
                    "Azure OpenAI provider requires endpoint, deployment and apiVersion in config.yaml"
                        .to_string(),
                ));
            };

            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Azure OpenAI provider requires API key".to_string())
            })?;

            Ok(Arc::new(AzureOpenAiClient::new(
                endpoint.as_str(),
                deployment.as_str(),
                api_version.as_str(),
                api_key,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azure_settings() -> ProviderConfig {
        ProviderConfig::AzureOpenAI {
            endpoint: "https://movies.openai.azure.com".to_string(),
            deployment: "movies-gpt".to_string(),
            api_version: "2024-02-01".to_string(),
            api_key_env: "AD_OPENAI_API_KEY".to_string(),
        }
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let settings = ProviderConfig::Ollama {
            endpoint: "http://localhost:8080".to_string(),
            model: "llama3.2".to_string(),
            timeout: Some(30),
        };
        assert!(create_client("ollama", Some(&settings), None).is_ok());
    }

    #[test]
    fn test_azure_requires_api_key() {
        match create_client("azure-openai", Some(&azure_settings()), None) {
            Err(err) => assert!(err.to_string().contains("requires API key")),
            Ok(_) => panic!("Expected error for Azure without API key"),
        }
    }

    #[test]
    fn test_azure_requires_settings() {
        assert!(create_client("azure", None, Some("secret")).is_err());
    }

    #[test]
    fn test_create_azure_client() {
        let client = create_client("azure-openai", Some(&azure_settings()), Some("secret")).unwrap();
        assert_eq!(client.provider_name(), "azure-openai");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
