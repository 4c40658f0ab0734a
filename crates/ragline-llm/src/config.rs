//! Generator configuration persistence and provider selection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::ProviderKind;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Stored generator configuration (persisted to llm-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    /// Chat-completions URL; point it at any OpenAI-compatible gateway.
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> usize {
    2048
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            anthropic_api_key: None,
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            config_path: PathBuf::new(),
        }
    }
}

/// Generator config update request (all fields optional, merged in).
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfigUpdate {
    #[serde(rename = "preferredProvider")]
    pub preferred_provider: Option<String>,
    #[serde(rename = "openaiApiKey")]
    pub openai_api_key: Option<String>,
    #[serde(rename = "anthropicApiKey")]
    pub anthropic_api_key: Option<String>,
    #[serde(rename = "openaiBaseUrl")]
    pub openai_base_url: Option<String>,
    #[serde(rename = "openaiModel")]
    pub openai_model: Option<String>,
    #[serde(rename = "anthropicModel")]
    pub anthropic_model: Option<String>,
    pub temperature: Option<f64>,
    #[serde(rename = "maxTokens")]
    pub max_tokens: Option<usize>,
}

/// Generator config response (keys masked).
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorConfigResponse {
    #[serde(rename = "preferredProvider")]
    pub preferred_provider: String,
    #[serde(rename = "openaiConfigured")]
    pub openai_configured: bool,
    #[serde(rename = "anthropicConfigured")]
    pub anthropic_configured: bool,
    #[serde(rename = "openaiBaseUrl")]
    pub openai_base_url: String,
    #[serde(rename = "openaiModel")]
    pub openai_model: String,
    #[serde(rename = "anthropicModel")]
    pub anthropic_model: String,
    pub temperature: f64,
    #[serde(rename = "maxTokens")]
    pub max_tokens: usize,
    #[serde(rename = "activeProvider")]
    pub active_provider: Option<String>,
}

/// Everything the remote generator needs for one backend.
#[derive(Debug, Clone)]
pub struct ResolvedGenerator {
    pub provider: ProviderKind,
    pub url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f64,
    pub max_tokens: usize,
}

impl GeneratorConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: GeneratorConfig = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        config.config_path = config_path.to_path_buf();

        // Env vars as fallback for API keys
        if config.openai_api_key.is_none() {
            config.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if config.anthropic_api_key.is_none() {
            config.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }

        config
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved generator config to {}", self.config_path.display());
        Ok(())
    }

    /// Apply an update, merging with existing config.
    pub fn apply_update(&mut self, update: &GeneratorConfigUpdate) {
        if let Some(p) = &update.preferred_provider {
            self.preferred_provider = p.clone();
        }
        if let Some(k) = &update.openai_api_key {
            self.openai_api_key = Some(k.clone());
        }
        if let Some(k) = &update.anthropic_api_key {
            self.anthropic_api_key = Some(k.clone());
        }
        if let Some(u) = &update.openai_base_url {
            self.openai_base_url = u.clone();
        }
        if let Some(m) = &update.openai_model {
            self.openai_model = m.clone();
        }
        if let Some(m) = &update.anthropic_model {
            self.anthropic_model = m.clone();
        }
        if let Some(t) = update.temperature {
            self.temperature = t;
        }
        if let Some(m) = update.max_tokens {
            self.max_tokens = m;
        }
    }

    /// Resolve which backend to use, if any is configured.
    pub fn resolve(&self) -> Option<ResolvedGenerator> {
        // Explicit preference
        if self.preferred_provider != "auto" {
            return match self.preferred_provider.as_str() {
                "openai" => self.openai_api_key.as_ref().map(|k| self.openai_backend(k)),
                "anthropic" => self
                    .anthropic_api_key
                    .as_ref()
                    .map(|k| self.anthropic_backend(k)),
                _ => None,
            };
        }

        // Auto mode: Anthropic > OpenAI-compatible
        if let Some(k) = &self.anthropic_api_key {
            return Some(self.anthropic_backend(k));
        }
        if let Some(k) = &self.openai_api_key {
            return Some(self.openai_backend(k));
        }

        None
    }

    fn openai_backend(&self, api_key: &str) -> ResolvedGenerator {
        ResolvedGenerator {
            provider: ProviderKind::OpenAi,
            url: self.openai_base_url.clone(),
            model: self.openai_model.clone(),
            api_key: api_key.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn anthropic_backend(&self, api_key: &str) -> ResolvedGenerator {
        ResolvedGenerator {
            provider: ProviderKind::Anthropic,
            url: ANTHROPIC_MESSAGES_URL.to_string(),
            model: self.anthropic_model.clone(),
            api_key: api_key.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Build the public config response (no API keys exposed).
    pub fn to_response(&self) -> GeneratorConfigResponse {
        let resolved = self.resolve();
        GeneratorConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_configured: self.anthropic_api_key.is_some(),
            openai_base_url: self.openai_base_url.clone(),
            openai_model: self.openai_model.clone(),
            anthropic_model: self.anthropic_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            active_provider: resolved.map(|r| r.provider.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_prefers_anthropic() {
        let config = GeneratorConfig {
            openai_api_key: Some("sk-o".into()),
            anthropic_api_key: Some("sk-a".into()),
            ..Default::default()
        };
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.provider, ProviderKind::Anthropic);
        assert_eq!(resolved.model, DEFAULT_ANTHROPIC_MODEL);
    }

    #[test]
    fn test_explicit_provider_wins() {
        let config = GeneratorConfig {
            preferred_provider: "openai".into(),
            openai_api_key: Some("sk-o".into()),
            anthropic_api_key: Some("sk-a".into()),
            ..Default::default()
        };
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.provider, ProviderKind::OpenAi);
        assert_eq!(resolved.url, DEFAULT_OPENAI_BASE_URL);
    }

    #[test]
    fn test_unconfigured_resolves_to_none() {
        let config = GeneratorConfig::default();
        assert!(config.resolve().is_none());
    }

    #[test]
    fn test_apply_update_merges() {
        let mut config = GeneratorConfig::default();
        config.apply_update(&GeneratorConfigUpdate {
            preferred_provider: None,
            openai_api_key: Some("sk-new".into()),
            anthropic_api_key: None,
            openai_base_url: Some("http://localhost:11434/v1/chat/completions".into()),
            openai_model: None,
            anthropic_model: None,
            temperature: Some(0.4),
            max_tokens: None,
        });
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-new"));
        assert!(config.openai_base_url.starts_with("http://localhost"));
        assert_eq!(config.temperature, 0.4);
        assert_eq!(config.max_tokens, default_max_tokens());
    }

    #[test]
    fn test_response_never_carries_keys() {
        let config = GeneratorConfig {
            anthropic_api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config.to_response()).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("\"anthropicConfigured\":true"));
    }
}
