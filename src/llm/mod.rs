//! LLM relevance checking.
//!
//! Supports:
//! - **Perplexity**: `sonar` with JSON-schema structured output
//! - **OpenAI**: chat completions in JSON mode
//!
//! Providers are assembled once at startup, in that order, from whichever
//! API keys are present. The [`RelevanceOrchestrator`] walks them until one
//! returns a valid verdict.

mod completion;
pub mod openai;
pub mod orchestrator;
pub mod perplexity;
pub mod provider;

pub use openai::OpenAiProvider;
pub use orchestrator::{RelevanceOrchestrator, RelevanceOutcome};
pub use perplexity::PerplexityProvider;
pub use provider::{ProviderVerdict, RelevanceProvider};

use std::sync::Arc;

use crate::config::AppConfig;

/// Build the ordered provider list from the configured credentials.
pub fn create_providers(config: &AppConfig) -> Vec<Arc<dyn RelevanceProvider>> {
    let mut providers: Vec<Arc<dyn RelevanceProvider>> = Vec::new();

    if let Some(creds) = &config.perplexity {
        tracing::info!("Using Perplexity (model: {})", creds.model);
        providers.push(Arc::new(PerplexityProvider::new(creds)));
    }
    if let Some(creds) = &config.openai {
        tracing::info!("Using OpenAI (model: {})", creds.model);
        providers.push(Arc::new(OpenAiProvider::new(creds)));
    }

    if providers.is_empty() {
        tracing::warn!("No relevance providers configured; messages will not be analyzed");
    }
    providers
}
