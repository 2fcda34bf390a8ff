//! Perplexity relevance provider (structured output via JSON schema).

use async_trait::async_trait;
use secrecy::SecretString;

use super::completion::chat_completion;
use super::provider::{ProviderVerdict, RelevanceProvider, parse_verdict, response_schema};
use crate::config::ProviderCredentials;
use crate::error::ProviderError;

pub const DEFAULT_MODEL: &str = "sonar";
pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant with access to the world's information.";

pub struct PerplexityProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl PerplexityProvider {
    pub fn new(credentials: &ProviderCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: credentials.api_key.clone(),
            model: credentials.model.clone(),
            base_url: credentials.base_url.clone(),
        }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": { "schema": response_schema() }
            }
        })
    }
}

#[async_trait]
impl RelevanceProvider for PerplexityProvider {
    fn name(&self) -> &str {
        "perplexity"
    }

    async fn check(&self, prompt: &str) -> Result<ProviderVerdict, ProviderError> {
        let body = self.request_body(prompt);
        let content =
            chat_completion(&self.client, self.name(), &self.base_url, &self.api_key, &body)
                .await?;
        parse_verdict(self.name(), &content)
    }
}
