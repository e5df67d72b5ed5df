use crate::config::Config;
use crate::providers::{GeminiProvider, OllamaProvider, OpenAIProvider};
use crate::traits::Provider;
use anyhow::{Result, anyhow};
use std::sync::Arc;

const OPENAI_KEY_VARS: &[&str] = &["OPENAI_API_KEY", "TOOLCHAT_OPENAI_API_KEY"];
const GEMINI_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "TOOLCHAT_GEMINI_API_KEY"];

/// Builds the provider named in `config`, reading its API key once.
pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    create_provider_with_env(config, |var| std::env::var(var).ok())
}

fn create_provider_with_env(
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn Provider>> {
    let provider_name = config.provider.as_deref().unwrap_or("openai");

    match provider_name.to_lowercase().as_str() {
        "openai" => {
            let api_key = resolve_api_key(provider_name, OPENAI_KEY_VARS, &config.api_key, &env)?;
            let mut provider = OpenAIProvider::new(api_key).with_temperature(config.temperature);
            if let Some(model) = &config.model {
                provider = provider.with_model(model.clone());
            }
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        "ollama" => {
            let mut provider = OllamaProvider::new().with_temperature(config.temperature);
            if let Some(model) = &config.model {
                provider = provider.with_model(model.clone());
            }
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        "gemini" | "google" => {
            let api_key = resolve_api_key(provider_name, GEMINI_KEY_VARS, &config.api_key, &env)?;
            let mut provider = GeminiProvider::new(api_key).with_temperature(config.temperature);
            if let Some(model) = &config.model {
                provider = provider.with_model(model.clone());
            }
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        _ => Err(anyhow!(
            "Unknown provider: {}. Available: openai, ollama, gemini",
            provider_name
        )),
    }
}

fn resolve_api_key(
    provider_name: &str,
    env_vars: &[&str],
    config_key: &str,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<String> {
    for var_name in env_vars {
        if let Some(key) = env(var_name).filter(|k| !k.trim().is_empty()) {
            tracing::debug!(var = var_name, "Using API key from environment");
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!(
            "No API key found for provider '{}': set {} or api_key in {}",
            provider_name,
            env_vars[0],
            crate::config::get_config_path().display()
        ))
    }
}
