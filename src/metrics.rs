//! Usage metrics: per-provider attempt/latency/success/failure counters and
//! message analyzed/relevant counters.
//!
//! Recording is fire-and-forget: callers never wait on or fail because of it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::info;

/// Metrics collaborator.
pub trait Metrics: Send + Sync {
    fn provider_attempt(&self, provider: &str);
    fn provider_latency(&self, provider: &str, latency: Duration);
    fn provider_success(&self, provider: &str);
    fn provider_failure(&self, provider: &str);
    fn message_analyzed(&self);
    fn message_relevant(&self);
}

/// Discards everything.
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn provider_attempt(&self, _provider: &str) {}
    fn provider_latency(&self, _provider: &str, _latency: Duration) {}
    fn provider_success(&self, _provider: &str) {}
    fn provider_failure(&self, _provider: &str) {}
    fn message_analyzed(&self) {}
    fn message_relevant(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
struct LatencyTotals {
    total_ms: f64,
    count: u64,
}

#[derive(Debug, Default)]
struct Counters {
    messages_analyzed: u64,
    messages_relevant: u64,
    attempts: BTreeMap<String, u64>,
    latency: BTreeMap<String, LatencyTotals>,
    successes: BTreeMap<String, u64>,
    failures: BTreeMap<String, u64>,
}

/// Point-in-time view of the counters, latency averaged per provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub messages_analyzed_count: u64,
    pub messages_relevant_count: u64,
    pub ai_provider_message_counts: BTreeMap<String, u64>,
    /// Average latency in milliseconds, rounded to two decimals.
    pub ai_api_latency_ms: BTreeMap<String, f64>,
    pub ai_api_success_counts: BTreeMap<String, u64>,
    pub ai_api_failure_counts: BTreeMap<String, u64>,
}

impl From<&Counters> for MetricsSnapshot {
    fn from(c: &Counters) -> Self {
        let ai_api_latency_ms = c
            .latency
            .iter()
            .map(|(provider, t)| {
                let avg = if t.count > 0 {
                    (t.total_ms / t.count as f64 * 100.0).round() / 100.0
                } else {
                    0.0
                };
                (provider.clone(), avg)
            })
            .collect();

        Self {
            messages_analyzed_count: c.messages_analyzed,
            messages_relevant_count: c.messages_relevant,
            ai_provider_message_counts: c.attempts.clone(),
            ai_api_latency_ms,
            ai_api_success_counts: c.successes.clone(),
            ai_api_failure_counts: c.failures.clone(),
        }
    }
}

/// In-memory recorder. When disabled, recording is a no-op and snapshots
/// are `None`.
pub struct AnalyticsRecorder {
    enabled: bool,
    counters: Mutex<Counters>,
}

impl AnalyticsRecorder {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn record(&self, f: impl FnOnce(&mut Counters)) {
        if !self.enabled {
            return;
        }
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut counters);
    }

    /// Current counters without resetting them.
    pub fn snapshot(&self) -> Option<MetricsSnapshot> {
        if !self.enabled {
            return None;
        }
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        Some(MetricsSnapshot::from(&*counters))
    }

    /// Current counters, then reset for the next reporting period.
    pub fn take(&self) -> Option<MetricsSnapshot> {
        if !self.enabled {
            return None;
        }
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = MetricsSnapshot::from(&*counters);
        *counters = Counters::default();
        Some(snapshot)
    }
}

fn bump(map: &mut BTreeMap<String, u64>, provider: &str) {
    *map.entry(provider.to_string()).or_default() += 1;
}

impl Metrics for AnalyticsRecorder {
    fn provider_attempt(&self, provider: &str) {
        self.record(|c| bump(&mut c.attempts, provider));
    }

    fn provider_latency(&self, provider: &str, latency: Duration) {
        self.record(|c| {
            let t = c.latency.entry(provider.to_string()).or_default();
            t.total_ms += latency.as_secs_f64() * 1000.0;
            t.count += 1;
        });
    }

    fn provider_success(&self, provider: &str) {
        self.record(|c| bump(&mut c.successes, provider));
    }

    fn provider_failure(&self, provider: &str) {
        self.record(|c| bump(&mut c.failures, provider));
    }

    fn message_analyzed(&self) {
        self.record(|c| c.messages_analyzed += 1);
    }

    fn message_relevant(&self) {
        self.record(|c| c.messages_relevant += 1);
    }
}

/// Spawn a background task that logs and resets the counters every `every`.
pub fn spawn_report_task(
    recorder: Arc<AnalyticsRecorder>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick fires immediately; skip the empty report.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Some(snapshot) = recorder.take() {
                info!(
                    analyzed = snapshot.messages_analyzed_count,
                    relevant = snapshot.messages_relevant_count,
                    attempts = ?snapshot.ai_provider_message_counts,
                    failures = ?snapshot.ai_api_failure_counts,
                    latency_ms = ?snapshot.ai_api_latency_ms,
                    "Usage metrics"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_averages() {
        let recorder = AnalyticsRecorder::new(true);
        recorder.provider_attempt("openai");
        recorder.provider_attempt("openai");
        recorder.provider_failure("openai");
        recorder.provider_success("openai");
        recorder.provider_latency("openai", Duration::from_millis(100));
        recorder.provider_latency("openai", Duration::from_millis(201));
        recorder.message_analyzed();
        recorder.message_relevant();

        let snap = recorder.snapshot().unwrap();
        assert_eq!(snap.ai_provider_message_counts["openai"], 2);
        assert_eq!(snap.ai_api_failure_counts["openai"], 1);
        assert_eq!(snap.ai_api_success_counts["openai"], 1);
        assert_eq!(snap.ai_api_latency_ms["openai"], 150.5);
        assert_eq!(snap.messages_analyzed_count, 1);
        assert_eq!(snap.messages_relevant_count, 1);
    }

    #[test]
    fn take_resets() {
        let recorder = AnalyticsRecorder::new(true);
        recorder.message_analyzed();
        assert_eq!(recorder.take().unwrap().messages_analyzed_count, 1);
        assert_eq!(recorder.take().unwrap(), MetricsSnapshot::default());
    }

    #[test]
    fn noop_sink_stands_in_for_recorder() {
        let sink: Arc<dyn Metrics> = Arc::new(NoopMetrics);
        sink.provider_attempt("openai");
        sink.provider_latency("openai", Duration::from_millis(10));
        sink.provider_success("openai");
        sink.provider_failure("openai");
        sink.message_analyzed();
        sink.message_relevant();
    }

    #[test]
    fn disabled_recorder_records_nothing() {
        let recorder = AnalyticsRecorder::new(false);
        recorder.message_analyzed();
        recorder.provider_attempt("perplexity");
        assert!(!recorder.is_enabled());
        assert!(recorder.snapshot().is_none());
        assert!(recorder.take().is_none());
    }
}
