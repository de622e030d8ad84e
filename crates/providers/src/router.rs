//! Provider construction: turns the `[model]` config section into a backend.

use std::sync::Arc;
use agentbridge_config::ModelConfig;
use agentbridge_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the model backend described by configuration.
///
/// Every supported provider speaks the OpenAI chat-completions dialect, so
/// they differ only in base URL and credentials.
pub fn build_from_config(config: &ModelConfig) -> Arc<dyn Provider> {
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.provider));

    let api_key = match (&config.api_key, config.provider.as_str()) {
        (Some(key), _) => key.clone(),
        (None, "ollama") => "ollama".into(),
        (None, name) => {
            tracing::warn!(provider = %name, "No API key configured; requests will likely be rejected");
            String::new()
        }
    };

    Arc::new(OpenAiCompatProvider::new(&config.provider, base_url, api_key))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
