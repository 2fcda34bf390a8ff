//! OpenAI relevance provider (JSON mode).

use async_trait::async_trait;
use secrecy::SecretString;

use super::completion::chat_completion;
use super::provider::{ProviderVerdict, RelevanceProvider, parse_verdict};
use crate::config::ProviderCredentials;
use crate::error::ProviderError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
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
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" }
        })
    }
}

#[async_trait]
impl RelevanceProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn check(&self, prompt: &str) -> Result<ProviderVerdict, ProviderError> {
        let body = self.request_body(prompt);
        let content =
            chat_completion(&self.client, self.name(), &self.base_url, &self.api_key, &body)
                .await?;
        parse_verdict(self.name(), &content)
    }
}
