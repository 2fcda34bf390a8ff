//! Relevance provider trait, verdict type, prompt template and response
//! validation shared by every provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A provider's structured judgment on one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderVerdict {
    pub relevant: bool,
    pub confidence: Option<f64>,
    pub reasoning: String,
    /// Which provider produced this verdict.
    pub provider: String,
}

/// An external model that can judge relevance.
#[async_trait]
pub trait RelevanceProvider: Send + Sync {
    /// Provider name, used in logs and metrics.
    fn name(&self) -> &str;

    /// Send the prompt and return a validated verdict.
    async fn check(&self, prompt: &str) -> Result<ProviderVerdict, ProviderError>;
}

/// Build the relevance prompt for a message.
pub fn relevance_prompt(interests: &[String], message: &str) -> String {
    format!(
        "Given the user's interests: \"{}\". Determine if the following chat message is \
         relevant to these interests, along with your confidence in your response and the \
         reason why you think the message is or isn't relevant to the user's interests. \
         Respond with a JSON object conforming to the schema: \
         {{\"relevant\": boolean, \"confidence\": number, \"reasoning\": string}}. \
         Message: \"{}\"",
        interests.join(", "),
        message
    )
}

/// JSON schema for the expected response, for providers that accept one.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "title": "RelevanceCheck",
        "type": "object",
        "properties": {
            "relevant": { "title": "Relevant", "type": "boolean" },
            "confidence": { "title": "Confidence", "type": "number" },
            "reasoning": { "title": "Reasoning", "type": "string" }
        },
        "required": ["relevant", "confidence", "reasoning"]
    })
}

/// The response shape. `confidence` is optional, the rest is required.
#[derive(Debug, Deserialize)]
struct RelevanceResponse {
    relevant: bool,
    #[serde(default)]
    confidence: Option<f64>,
    reasoning: String,
}

/// Validate a provider's message content into a verdict.
pub fn parse_verdict(provider: &str, content: &str) -> Result<ProviderVerdict, ProviderError> {
    let json = extract_json_object(content);
    let response: RelevanceResponse =
        serde_json::from_str(&json).map_err(|e| ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: format!("schema mismatch: {e}"),
        })?;

    Ok(ProviderVerdict {
        relevant: response.relevant,
        confidence: response.confidence,
        reasoning: response.reasoning,
        provider: provider.to_string(),
    })
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
