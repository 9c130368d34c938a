// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{Error, Result};

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// "gemini" | "openai" | "mock" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model override; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key: default_api_key(),
        }
    }
}

impl AiConfig {
    pub fn provider_normalized(&self) -> String {
        self.provider.trim().to_ascii_lowercase()
    }

    /// Resolve the provider key. Called per request so that a key exported after
    /// startup is picked up, and so that a missing key only fails the summarization
    /// stage instead of the whole process.
    pub fn resolve_api_key(&self) -> Result<String> {
        let raw = self.api_key.trim();
        if !raw.eq_ignore_ascii_case("env") {
            if raw.is_empty() {
                return Err(Error::Configuration("ai.api_key is empty".into()));
            }
            return Ok(raw.to_string());
        }

        let var = match self.provider_normalized().as_str() {
            "gemini" => "GEMINI_API_KEY",
            "openai" => "OPENAI_API_KEY",
            other => {
                return Err(Error::Configuration(format!(
                    "provider {other} has no API key variable"
                )))
            }
        };
        match env::var(var) {
            Ok(k) if !k.trim().is_empty() => Ok(k.trim().to_string()),
            _ => Err(Error::Configuration(format!("{var} is not configured"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn env_key_resolves_per_provider() {
        env::remove_var("GEMINI_API_KEY");
        let cfg = AiConfig::default();
        let err = cfg.resolve_api_key().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        env::set_var("GEMINI_API_KEY", "  abc123 ");
        assert_eq!(cfg.resolve_api_key().unwrap(), "abc123");
        env::remove_var("GEMINI_API_KEY");
    }

    #[test]
    fn literal_key_wins_over_env() {
        let cfg = AiConfig {
            provider: "OpenAI".into(),
            model: None,
            api_key: "sk-literal".into(),
        };
        assert_eq!(cfg.provider_normalized(), "openai");
        assert_eq!(cfg.resolve_api_key().unwrap(), "sk-literal");
    }

    #[test]
    fn mock_provider_has_no_env_key() {
        let cfg = AiConfig {
            provider: "mock".into(),
            ..AiConfig::default()
        };
        assert!(cfg.resolve_api_key().is_err());
    }
}
