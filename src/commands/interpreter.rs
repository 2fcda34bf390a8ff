//! Command interpreter for `!`-prefixed text typed in the command chat.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::wizard::GroupWizard;
use crate::channels::Channel;
use crate::settings::{SettingKey, SettingsService, UserSettings};

const SET_USAGE: &str = "Usage: !set <key>=<value>";
const GET_USAGE: &str = "Usage: !get <key>";

pub const HELP_TEXT: &str = "Available commands:\n\
    !set interests=<topic>, <topic> - topics you care about\n\
    !set processDirectMessages=on|off - whether direct messages are checked\n\
    !set <key>=<value> - store any other setting\n\
    !set groups - choose which group chats are checked\n\
    !set groups cancel - stop group setup\n\
    !get <key> - show one setting\n\
    !list - show all settings\n\
    !help - this message\n\
    Send !set_command_chat or !set_notification_chat in a chat to use it for commands or alerts.";

pub const GREETING: &str = "Hi! I read your incoming messages and forward the ones that match \
    your interests to this chat. By default this chat is both where you send commands and \
    where alerts arrive. Direct messages and all groups are checked until you say otherwise.";

pub const GETTING_STARTED: &str = "To get started, tell me what you care about:\n\
    !set interests=rust, concerts, job offers\n\
    Send !help for everything else.";

/// Parses and executes commands. Every mutation goes through
/// [`SettingsService::update`] and is persisted.
pub struct CommandInterpreter {
    channel: Arc<dyn Channel>,
    settings: Arc<SettingsService>,
    wizard: Arc<GroupWizard>,
}

impl CommandInterpreter {
    pub fn new(
        channel: Arc<dyn Channel>,
        settings: Arc<SettingsService>,
        wizard: Arc<GroupWizard>,
    ) -> Self {
        Self {
            channel,
            settings,
            wizard,
        }
    }

    /// Execute one command from `user` and return the reply text.
    pub async fn execute(&self, user: &str, text: &str) -> String {
        let text = text.trim();
        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (text, ""),
        };
        let command = head.to_lowercase();
        debug!(user, command = %command, "Executing command");

        match command.as_str() {
            "!set" => self.set(user, rest).await,
            "!get" => self.get(rest).await,
            "!list" => self.list().await,
            "!help" => HELP_TEXT.to_string(),
            _ => format!(
                "Unknown command: {head}. Available commands: !set, !get, !list, !help.\n\
                 To set command/notification chats, use '!set_command_chat' or \
                 '!set_notification_chat' in the desired chat."
            ),
        }
    }

    async fn set(&self, user: &str, args: &str) -> String {
        let (first, wizard_args) = match args.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest),
            None => (args, ""),
        };
        if first.eq_ignore_ascii_case("groups") {
            return self
                .wizard
                .handle(user, wizard_args, self.channel.as_ref(), &self.settings)
                .await;
        }

        let Some((key, value)) = args.split_once('=') else {
            return SET_USAGE.to_string();
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return SET_USAGE.to_string();
        }

        match SettingKey::parse(key) {
            Some(SettingKey::Interests) => {
                let interests = self
                    .settings
                    .update(|s| {
                        s.set_interests_from_csv(value);
                        s.interests.clone()
                    })
                    .await;
                info!(count = interests.len(), "Interests updated");
                format!("Set \"interests\" to: \"{}\"", interests.join(", "))
            }
            Some(SettingKey::ProcessDirectMessages) => {
                let enabled = matches!(value.to_ascii_lowercase().as_str(), "on" | "true");
                self.settings
                    .update(|s| s.process_direct_messages = Some(enabled))
                    .await;
                info!(enabled, "Direct message processing updated");
                format!(
                    "Set \"processDirectMessages\" to: \"{}\"",
                    if enabled { "on" } else { "off" }
                )
            }
            Some(SettingKey::GroupInclusionList | SettingKey::GroupExclusionList) => {
                "Group lists can't be set directly. Send !set groups to pick groups step by step."
                    .to_string()
            }
            _ => {
                let stored = value.to_string();
                self.settings.update(|s| s.assign_string(key, stored)).await;
                info!(key, "Setting updated");
                format!("Set \"{key}\" to: \"{value}\"")
            }
        }
    }

    async fn get(&self, args: &str) -> String {
        let Some(key) = args.split_whitespace().next() else {
            return GET_USAGE.to_string();
        };
        let settings = self.settings.snapshot().await;

        if let Some(known) = SettingKey::parse(key) {
            return match self.render_known(&settings, known).await {
                Some(rendered) => format!("{}:\n{rendered}", known.as_str()),
                None => format!("Key \"{key}\" not found."),
            };
        }

        match settings.extra_entry(key) {
            Some((name, value)) => format!("{name}: {}", render_raw(value)),
            None => format!("Key \"{key}\" not found."),
        }
    }

    async fn list(&self) -> String {
        let settings = self.settings.snapshot().await;
        let mut lines = Vec::new();

        for key in SettingKey::ALL {
            if let Some(rendered) = self.render_known(&settings, key).await {
                lines.push(format!("- {}: {}", key.as_str(), rendered.replace('\n', "\n  ")));
            }
        }
        for (name, value) in &settings.extra {
            lines.push(format!("- {name}: {}", render_raw(value)));
        }

        if lines.is_empty() {
            return "No configurations set yet.".to_string();
        }
        format!("Your current configurations:\n{}", lines.join("\n"))
    }

    /// Render a known key, or `None` when it holds no value.
    async fn render_known(&self, settings: &UserSettings, key: SettingKey) -> Option<String> {
        if !settings.is_set(key) {
            return None;
        }
        let rendered = match key {
            SettingKey::Interests => bullets(settings.interests.iter().cloned()),
            SettingKey::CommandChatId => self.chat_label(settings.command_chat_id.as_deref()?).await,
            SettingKey::NotificationChatId => {
                self.chat_label(settings.notification_chat_id.as_deref()?)
                    .await
            }
            SettingKey::ProcessDirectMessages => {
                Value::Bool(settings.process_direct_messages()).to_string()
            }
            SettingKey::GroupInclusionList => {
                self.chat_labels(&settings.group_inclusion_list).await
            }
            SettingKey::GroupExclusionList => {
                self.chat_labels(&settings.group_exclusion_list).await
            }
        };
        Some(rendered)
    }

    async fn chat_labels(&self, ids: &BTreeSet<String>) -> String {
        let mut labels = Vec::new();
        for id in ids {
            labels.push(self.chat_label(id).await);
        }
        bullets(labels.into_iter())
    }

    /// "Name (id)" when the chat resolves, otherwise the raw id.
    async fn chat_label(&self, id: &str) -> String {
        match self.channel.get_chat_by_id(id).await {
            Ok(chat) if !chat.name.is_empty() => format!("{} ({id})", chat.name),
            Ok(_) => id.to_string(),
            Err(e) => {
                debug!(chat_id = id, error = %e, "Chat lookup failed, showing raw id");
                id.to_string()
            }
        }
    }
}

fn bullets(items: impl Iterator<Item = String>) -> String {
    items
        .map(|item| format!("• {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
