//! LLM provider factory.
//!
//! Resolves the configured server type into a concrete client shared by
//! every request the process serves.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiCompatibleClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;
use studyqa_core::{AppError, AppResult};

/// Create an LLM client for the given server type.
///
/// # Arguments
/// * `provider` - Server type ("VLLM", "OLLAMA", "openai", ...)
/// * `endpoint` - Base URL of the model server
/// * `api_key` - Optional bearer key (OpenAI-compatible servers only)
/// * `timeout_secs` - Optional per-call HTTP timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or the endpoint is
/// unusable.
pub fn create_client(
    provider: &str,
    endpoint: &str,
    api_key: Option<&str>,
    timeout_secs: Option<u64>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown LLM server type: '{}' (expected VLLM or OLLAMA)",
            provider
        ))
    })?;

    tracing::debug!(provider = provider_type.as_str(), endpoint, "Creating LLM client");

    match provider_type {
        ProviderType::Ollama => {
            let client = match timeout_secs {
                Some(secs) => OllamaClient::with_timeout(endpoint, Duration::from_secs(secs))?,
                None => OllamaClient::with_base_url(endpoint),
            };
            Ok(Arc::new(client))
        }
        ProviderType::OpenAiCompatible => {
            let client = OpenAiCompatibleClient::new(endpoint, api_key, timeout_secs)?;
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("OLLAMA", "http://localhost:11434", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_vllm_client_without_key() {
        let client = create_client("VLLM", "http://localhost:8000", None, Some(30)).unwrap();
        assert_eq!(client.provider_name(), "openai-compatible");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("tgi", "http://localhost:8080", None, None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("Unknown LLM server type")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }

    #[test]
    fn test_bad_endpoint_for_vllm() {
        assert!(create_client("vllm", "not-a-url", None, None).is_err());
    }
}
