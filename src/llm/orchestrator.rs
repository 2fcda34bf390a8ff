//! Relevance orchestrator: asks providers in a fixed order and returns the
//! first valid verdict.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::provider::{ProviderVerdict, RelevanceProvider, relevance_prompt};
use crate::error::{ConfigError, ProviderError};
use crate::metrics::Metrics;
use crate::settings::SettingsService;

/// Default bound on a single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Reasoning attached to the synthesized verdict when every provider failed.
pub const ALL_FAILED_REASONING: &str = "all providers failed";

/// The decision handed back to the router.
#[derive(Debug, Clone, PartialEq)]
pub enum RelevanceOutcome {
    /// First successful provider verdict.
    Verdict(ProviderVerdict),
    /// No provider produced a valid verdict; treated as not relevant.
    AllProvidersFailed,
}

impl RelevanceOutcome {
    pub fn is_relevant(&self) -> bool {
        match self {
            Self::Verdict(v) => v.relevant,
            Self::AllProvidersFailed => false,
        }
    }

    pub fn reasoning(&self) -> &str {
        match self {
            Self::Verdict(v) => &v.reasoning,
            Self::AllProvidersFailed => ALL_FAILED_REASONING,
        }
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Verdict(v) => Some(&v.provider),
            Self::AllProvidersFailed => None,
        }
    }
}

/// Ordered provider fallback with per-provider metrics.
///
/// The provider list is fixed at construction; interests are re-read from
/// settings on every call.
pub struct RelevanceOrchestrator {
    providers: Vec<Arc<dyn RelevanceProvider>>,
    settings: Arc<SettingsService>,
    metrics: Arc<dyn Metrics>,
    call_timeout: Duration,
}

impl RelevanceOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn RelevanceProvider>>,
        settings: Arc<SettingsService>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        info!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Relevance providers configured"
        );
        Self {
            providers,
            settings,
            metrics,
            call_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Judge one message body against the configured interests.
    ///
    /// Fails only on configuration problems. Provider failures fall through
    /// to the next provider, and exhausting all of them yields
    /// [`RelevanceOutcome::AllProvidersFailed`].
    pub async fn analyze(&self, body: &str) -> Result<RelevanceOutcome, ConfigError> {
        let settings = self.settings.reload().await;
        if settings.interests.is_empty() {
            return Err(ConfigError::MissingInterests);
        }
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        let prompt = relevance_prompt(&settings.interests, body);

        for provider in &self.providers {
            let name = provider.name();
            debug!(provider = name, "Attempting relevance check");
            self.metrics.provider_attempt(name);

            let started = Instant::now();
            match self.call(provider.as_ref(), &prompt).await {
                Ok(verdict) => {
                    self.metrics.provider_latency(name, started.elapsed());
                    self.metrics.provider_success(name);
                    info!(
                        provider = name,
                        relevant = verdict.relevant,
                        confidence = ?verdict.confidence,
                        reasoning = %verdict.reasoning,
                        "Message analyzed"
                    );
                    return Ok(RelevanceOutcome::Verdict(verdict));
                }
                Err(e) => {
                    self.metrics.provider_failure(name);
                    warn!(provider = name, error = %e, "Provider failed, trying next");
                }
            }
        }

        warn!(
            attempted = self.providers.len(),
            "All relevance providers failed"
        );
        Ok(RelevanceOutcome::AllProvidersFailed)
    }

    async fn call(
        &self,
        provider: &dyn RelevanceProvider,
        prompt: &str,
    ) -> Result<ProviderVerdict, ProviderError> {
        match tokio::time::timeout(self.call_timeout, provider.check(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: provider.name().to_string(),
                timeout: self.call_timeout,
            }),
        }
    }
}
