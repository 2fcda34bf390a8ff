use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use chat_sieve::channels::{Channel, ConsoleChannel};
use chat_sieve::commands::{self, CommandInterpreter, GroupWizard};
use chat_sieve::config::AppConfig;
use chat_sieve::llm::{RelevanceOrchestrator, create_providers};
use chat_sieve::metrics::{AnalyticsRecorder, Metrics, NoopMetrics, spawn_report_task};
use chat_sieve::pipeline::MessageRouter;
use chat_sieve::settings::{JsonFileStore, SettingsService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env().context("invalid environment configuration")?;

    eprintln!("🔎 Chat Sieve v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Settings: {}", config.settings_path.display());
    eprintln!("   Identity chat: {}", config.own_chat_id);
    eprintln!("   Feed one JSON message event per line on stdin.\n");

    // ── Settings ─────────────────────────────────────────────────────────
    let store = Arc::new(JsonFileStore::new(&config.settings_path));
    let settings = Arc::new(SettingsService::open(store).await);

    // ── Channel ──────────────────────────────────────────────────────────
    let channel: Arc<dyn Channel> = Arc::new(ConsoleChannel::new(config.own_chat_id.clone()));
    settings
        .apply_identity_defaults(channel.own_chat_id())
        .await;

    // ── Relevance ────────────────────────────────────────────────────────
    let metrics: Arc<dyn Metrics> = if config.analytics_enabled {
        let recorder = Arc::new(AnalyticsRecorder::new(true));
        let _report = spawn_report_task(recorder.clone(), config.analytics_report_interval);
        recorder
    } else {
        info!("Usage analytics disabled");
        Arc::new(NoopMetrics)
    };
    let providers = create_providers(&config);
    if providers.is_empty() {
        warn!("No relevance providers configured; set PERPLEXITY_API_KEY or OPENAI_API_KEY");
    }
    let relevance = RelevanceOrchestrator::new(providers, settings.clone(), metrics.clone())
        .with_timeout(config.provider_timeout);

    // ── Commands ─────────────────────────────────────────────────────────
    let wizard = Arc::new(GroupWizard::new());
    let _sweep = commands::spawn_sweep_task(Arc::clone(&wizard));
    let interpreter = CommandInterpreter::new(channel.clone(), settings.clone(), wizard);

    // ── Router ───────────────────────────────────────────────────────────
    let router = Arc::new(MessageRouter::new(
        channel.clone(),
        settings,
        interpreter,
        relevance,
        metrics,
    ));

    let stream = channel
        .start()
        .await
        .context("failed to start message channel")?;
    router.greet().await;
    info!(channel = channel.name(), "Listening for messages");

    router.run(stream).await;
    Ok(())
}
