//! Process configuration, read from environment variables.
//!
//! This is startup-only configuration (paths, credentials, timeouts). The
//! user-editable settings live in [`crate::settings`].

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{openai, perplexity};

/// API credentials and endpoint for one relevance provider.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where the user settings JSON file lives.
    pub settings_path: PathBuf,
    /// Identity chat of the console channel.
    pub own_chat_id: String,
    /// Upper bound on a single provider call.
    pub provider_timeout: Duration,
    /// Whether usage metrics are collected.
    pub analytics_enabled: bool,
    /// How often collected metrics are logged and reset.
    pub analytics_report_interval: Duration,
    pub perplexity: Option<ProviderCredentials>,
    pub openai: Option<ProviderCredentials>,
}

impl AppConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let settings_path = non_empty("CHAT_SIEVE_SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/user_config.json"));

        let own_chat_id =
            non_empty("CHAT_SIEVE_SELF_CHAT_ID").unwrap_or_else(|| "self@console".to_string());

        let provider_timeout = match non_empty("CHAT_SIEVE_PROVIDER_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("CHAT_SIEVE_PROVIDER_TIMEOUT_SECS", &raw)?),
            None => crate::llm::orchestrator::DEFAULT_PROVIDER_TIMEOUT,
        };

        let analytics_report_interval = match non_empty("CHAT_SIEVE_ANALYTICS_REPORT_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("CHAT_SIEVE_ANALYTICS_REPORT_SECS", &raw)?),
            None => Duration::from_secs(15 * 60),
        };

        // Only an explicit "false" turns analytics off.
        let analytics_enabled = !non_empty("CHAT_SIEVE_ANALYTICS_ENABLED")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("false"));

        let perplexity = non_empty("PERPLEXITY_API_KEY").map(|key| ProviderCredentials {
            api_key: SecretString::from(key),
            model: non_empty("PERPLEXITY_MODEL")
                .unwrap_or_else(|| perplexity::DEFAULT_MODEL.to_string()),
            base_url: non_empty("PERPLEXITY_BASE_URL")
                .unwrap_or_else(|| perplexity::DEFAULT_BASE_URL.to_string()),
        });

        let openai = non_empty("OPENAI_API_KEY").map(|key| ProviderCredentials {
            api_key: SecretString::from(key),
            model: non_empty("OPENAI_MODEL").unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            base_url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
        });

        Ok(Self {
            settings_path,
            own_chat_id,
            provider_timeout,
            analytics_enabled,
            analytics_report_interval,
            perplexity,
            openai,
        })
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".into(),
        }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = config(&[]).unwrap();
        assert_eq!(config.settings_path, PathBuf::from("./data/user_config.json"));
        assert_eq!(config.own_chat_id, "self@console");
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert!(config.analytics_enabled);
        assert!(config.perplexity.is_none());
        assert!(config.openai.is_none());
    }

    #[test]
    fn credentials_pick_up_models_and_urls() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("PERPLEXITY_API_KEY", "pplx-1"),
            ("PERPLEXITY_BASE_URL", "http://localhost:9999"),
        ])
        .unwrap();

        let openai = config.openai.unwrap();
        assert_eq!(openai.api_key.expose_secret(), "sk-1");
        assert_eq!(openai.model, "gpt-4o");
        assert_eq!(openai.base_url, openai::DEFAULT_BASE_URL);

        let pplx = config.perplexity.unwrap();
        assert_eq!(pplx.model, "sonar");
        assert_eq!(pplx.base_url, "http://localhost:9999");
    }

    #[test]
    fn blank_api_key_means_absent() {
        let config = config(&[("OPENAI_API_KEY", "  ")]).unwrap();
        assert!(config.openai.is_none());
    }

    #[test]
    fn analytics_only_disabled_by_explicit_false() {
        assert!(!config(&[("CHAT_SIEVE_ANALYTICS_ENABLED", "FALSE")]).unwrap().analytics_enabled);
        assert!(config(&[("CHAT_SIEVE_ANALYTICS_ENABLED", "no")]).unwrap().analytics_enabled);
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = config(&[("CHAT_SIEVE_PROVIDER_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(config(&[("CHAT_SIEVE_PROVIDER_TIMEOUT_SECS", "0")]).is_err());
        assert_eq!(
            config(&[("CHAT_SIEVE_PROVIDER_TIMEOUT_SECS", "5")])
                .unwrap()
                .provider_timeout,
            Duration::from_secs(5)
        );
    }
}
