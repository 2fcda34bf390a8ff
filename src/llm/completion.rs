//! OpenAI-compatible `/chat/completions` transport shared by the providers.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// POST a chat completion request and return the first choice's content.
pub(crate) async fn chat_completion(
    client: &reqwest::Client,
    provider: &str,
    base_url: &str,
    api_key: &SecretString,
    body: &serde_json::Value,
) -> Result<String, ProviderError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    debug!(provider, url = %url, "Sending relevance request");

    let response = client
        .post(&url)
        .bearer_auth(api_key.expose_secret())
        .json(body)
        .send()
        .await
        .map_err(|e| ProviderError::RequestFailed {
            provider: provider.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Http {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: format!("unparseable completion body: {e}"),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: "no message content in response".into(),
        })
}
