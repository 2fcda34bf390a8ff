//! Message router: classifies each inbound event and hands it to the
//! command interpreter or the relevance pipeline.
//!
//! Self-sent messages:
//! 1. `!set_command_chat` / `!set_notification_chat` → persist the chat
//! 2. other `!` commands in the command chat → interpreter
//! 3. everything else → ignored
//!
//! Messages from others: skip rules → filter policy → relevance check →
//! notification (with a fallback to the own chat if delivery fails).

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::channels::{Channel, MessageStream};
use crate::commands::CommandInterpreter;
use crate::commands::interpreter::{GETTING_STARTED, GREETING};
use crate::llm::{RelevanceOrchestrator, RelevanceOutcome};
use crate::metrics::Metrics;
use crate::pipeline::filter::{self, FilterVerdict};
use crate::pipeline::types::{IncomingMessage, SendOptions};
use crate::settings::SettingsService;

const SET_COMMAND_CHAT: &str = "!set_command_chat";
const SET_NOTIFICATION_CHAT: &str = "!set_notification_chat";

/// Why an inbound message was skipped before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Status,
    Enterprise,
    /// Posted in the command or notification chat.
    ControlChat,
}

/// What the router did with one message.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    CommandChatSet,
    NotificationChatSet,
    CommandHandled,
    SelfIgnored,
    Skipped(SkipReason),
    Filtered(FilterVerdict),
    NotRelevant,
    Notified,
    /// Notification chat unreachable; the alert went to the own chat.
    NotifiedViaFallback,
    /// Neither the notification chat nor the own chat accepted the alert.
    Undelivered,
    /// The relevance check could not run (missing interests, no providers).
    AnalysisUnavailable,
}

pub struct MessageRouter {
    channel: Arc<dyn Channel>,
    settings: Arc<SettingsService>,
    commands: CommandInterpreter,
    relevance: RelevanceOrchestrator,
    metrics: Arc<dyn Metrics>,
}

impl MessageRouter {
    pub fn new(
        channel: Arc<dyn Channel>,
        settings: Arc<SettingsService>,
        commands: CommandInterpreter,
        relevance: RelevanceOrchestrator,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            channel,
            settings,
            commands,
            relevance,
            metrics,
        }
    }

    /// Send the greeting and getting-started messages to the own chat.
    pub async fn greet(&self) {
        let own = self.channel.own_chat_id();
        for text in [GREETING, GETTING_STARTED] {
            if let Err(e) = self
                .channel
                .send_message(own, text, SendOptions::default())
                .await
            {
                warn!(chat_id = own, error = %e, "Failed to send greeting");
            }
        }
    }

    /// Consume the event stream until it ends.
    ///
    /// Self-sent messages run inline so commands apply in the order typed;
    /// everything else gets its own task.
    pub async fn run(self: Arc<Self>, mut stream: MessageStream) {
        info!(channel = self.channel.name(), "Router started");
        while let Some(message) = stream.next().await {
            if message.from_self {
                self.route(&message).await;
            } else {
                let router = Arc::clone(&self);
                tokio::spawn(async move {
                    router.route(&message).await;
                });
            }
        }
        info!("Message stream ended");
    }

    /// Handle one message.
    pub async fn route(&self, message: &IncomingMessage) -> RouteOutcome {
        let outcome = if message.from_self {
            self.route_own(message).await
        } else {
            self.route_inbound(message).await
        };
        debug!(id = %message.id, chat_id = message.actual_chat_id(), outcome = ?outcome, "Routed message");
        outcome
    }

    async fn route_own(&self, message: &IncomingMessage) -> RouteOutcome {
        let chat_id = message.actual_chat_id();
        let body = message.body.trim();

        if body.eq_ignore_ascii_case(SET_COMMAND_CHAT) {
            self.settings
                .update(|s| s.command_chat_id = Some(chat_id.to_string()))
                .await;
            info!(chat_id, "Command chat set");
            self.reply(message, "This chat is now your command chat. Send !help to see what I can do.")
                .await;
            return RouteOutcome::CommandChatSet;
        }

        if body.eq_ignore_ascii_case(SET_NOTIFICATION_CHAT) {
            self.settings
                .update(|s| s.notification_chat_id = Some(chat_id.to_string()))
                .await;
            info!(chat_id, "Notification chat set");
            self.reply(message, "Relevant messages will be sent to this chat from now on.")
                .await;
            return RouteOutcome::NotificationChatSet;
        }

        if message.is_command() {
            let settings = self.settings.snapshot().await;
            if chat_id == settings.command_chat_or(self.channel.own_chat_id()) {
                let reply = self.commands.execute(chat_id, body).await;
                self.reply(message, &reply).await;
                return RouteOutcome::CommandHandled;
            }
            debug!(chat_id, "Command outside the command chat, ignoring");
        }

        RouteOutcome::SelfIgnored
    }

    async fn route_inbound(&self, message: &IncomingMessage) -> RouteOutcome {
        if message.is_status {
            return RouteOutcome::Skipped(SkipReason::Status);
        }
        if message.sender_is_enterprise {
            return RouteOutcome::Skipped(SkipReason::Enterprise);
        }

        let own = self.channel.own_chat_id();
        let settings = self.settings.snapshot().await;
        let chat_id = message.actual_chat_id();
        if chat_id == settings.command_chat_or(own) || chat_id == settings.notification_chat_or(own)
        {
            return RouteOutcome::Skipped(SkipReason::ControlChat);
        }

        let verdict = filter::evaluate(message, &settings);
        if !verdict.is_accepted() {
            debug!(chat_id, reason = verdict.label(), "Message filtered out");
            return RouteOutcome::Filtered(verdict);
        }

        let outcome = match self.relevance.analyze(&message.body).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(chat_id, error = %e, "Relevance check unavailable");
                let command_chat = settings.command_chat_or(own);
                if let Err(send_err) = self
                    .channel
                    .send_message(command_chat, &e.to_string(), SendOptions::default())
                    .await
                {
                    warn!(chat_id = command_chat, error = %send_err, "Failed to report configuration problem");
                }
                return RouteOutcome::AnalysisUnavailable;
            }
        };

        self.metrics.message_analyzed();
        if !outcome.is_relevant() {
            debug!(chat_id, reasoning = outcome.reasoning(), "Not relevant");
            return RouteOutcome::NotRelevant;
        }
        self.metrics.message_relevant();

        let target = settings.notification_chat_or(own).to_string();
        self.notify(message, &outcome, &target).await
    }

    async fn notify(
        &self,
        message: &IncomingMessage,
        outcome: &RelevanceOutcome,
        target: &str,
    ) -> RouteOutcome {
        let text = self.notification_text(message, outcome).await;

        let err = match self
            .channel
            .send_message(target, &text, SendOptions::quoting(&message.id))
            .await
        {
            Ok(_) => {
                info!(chat_id = message.actual_chat_id(), target, "Relevant message forwarded");
                return RouteOutcome::Notified;
            }
            Err(e) => e,
        };

        warn!(target, error = %err, "Notification failed, falling back to own chat");
        let own = self.channel.own_chat_id();
        let fallback = format!("[Could not deliver to {target}: {err}]\n{text}");
        match self
            .channel
            .send_message(own, &fallback, SendOptions::default())
            .await
        {
            Ok(_) => RouteOutcome::NotifiedViaFallback,
            Err(e) => {
                error!(
                    id = %message.id,
                    target,
                    own,
                    error = %e,
                    "Relevant message could not be delivered anywhere"
                );
                RouteOutcome::Undelivered
            }
        }
    }

    async fn notification_text(&self, message: &IncomingMessage, outcome: &RelevanceOutcome) -> String {
        let chat_id = message.actual_chat_id();
        let sender_id = message.author.as_deref().unwrap_or(chat_id);
        let sender = match self.channel.get_contact_by_id(sender_id).await {
            Ok(contact) => contact
                .display_name()
                .unwrap_or("Unknown Contact")
                .to_string(),
            Err(e) => {
                debug!(sender_id, error = %e, "Contact lookup failed");
                "Unknown Contact".to_string()
            }
        };

        let group = if message.is_group {
            let name = match self.channel.get_chat_by_id(chat_id).await {
                Ok(chat) if !chat.name.is_empty() => chat.name,
                _ => chat_id.to_string(),
            };
            format!(" in group \"{name}\"")
        } else {
            String::new()
        };

        format!(
            "[Relevant Message] From: {sender}{group}\nContent: {}\n\nRelevance logic: {}\n\nChat ID: {chat_id}",
            message.body,
            outcome.reasoning()
        )
    }

    async fn reply(&self, message: &IncomingMessage, text: &str) {
        let chat_id = message.actual_chat_id();
        if let Err(e) = self
            .channel
            .send_message(chat_id, text, SendOptions::quoting(&message.id))
            .await
        {
            warn!(chat_id, error = %e, "Failed to send reply");
        }
    }
}
