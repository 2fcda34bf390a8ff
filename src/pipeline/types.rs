//! Shared types for the message pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(DateTime<Utc>),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            serde::de::Error::custom(format!("timestamp {secs} is out of range"))
        }),
        Raw::Text(ts) => Ok(ts),
    }
}

// ── Inbound message ─────────────────────────────────────────────────

/// One message event as delivered by the messaging channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    /// Channel-native message ID (used for quoting).
    #[serde(default = "new_message_id")]
    pub id: String,
    /// The sender field: the remote chat, or our own id for self-sent messages.
    pub chat_id: String,
    /// Where a self-sent message was actually posted.
    #[serde(default)]
    pub originating_chat_id: Option<String>,
    /// Group member who wrote the message, if known.
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub from_self: bool,
    #[serde(default)]
    pub is_group: bool,
    /// Status/broadcast updates.
    #[serde(default)]
    pub is_status: bool,
    #[serde(default)]
    pub sender_is_enterprise: bool,
    pub body: String,
    /// RFC 3339 string or unix seconds on input.
    #[serde(default = "Utc::now", deserialize_with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl IncomingMessage {
    /// A direct message from someone else.
    pub fn direct(chat_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            chat_id: chat_id.into(),
            originating_chat_id: None,
            author: None,
            from_self: false,
            is_group: false,
            is_status: false,
            sender_is_enterprise: false,
            body: body.into(),
            timestamp: Utc::now(),
        }
    }

    /// A group message from someone else.
    pub fn group(
        chat_id: impl Into<String>,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            author: Some(author.into()),
            is_group: true,
            ..Self::direct(chat_id, body)
        }
    }

    /// A message we sent ourselves into `to_chat`.
    pub fn from_self(
        own_chat: impl Into<String>,
        to_chat: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            originating_chat_id: Some(to_chat.into()),
            from_self: true,
            ..Self::direct(own_chat, body)
        }
    }

    /// The chat this message belongs to.
    ///
    /// Self-sent messages carry our own id as sender, so the conversation is
    /// taken from `originating_chat_id` instead.
    pub fn actual_chat_id(&self) -> &str {
        if self.from_self {
            self.originating_chat_id.as_deref().unwrap_or(&self.chat_id)
        } else {
            &self.chat_id
        }
    }

    /// Whether the body looks like a `!` command.
    pub fn is_command(&self) -> bool {
        self.body.trim_start().starts_with('!')
    }
}

// ── Chat metadata ───────────────────────────────────────────────────

/// A chat known to the messaging channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_group: bool,
}

/// A contact known to the messaging channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub id: String,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_enterprise: bool,
}

impl ContactInfo {
    /// Best display name: push name, then saved name.
    pub fn display_name(&self) -> Option<&str> {
        self.push_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.name.as_deref().filter(|n| !n.is_empty()))
    }
}

/// Options for an outbound message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    /// Message to quote/reply to.
    pub quoted_message_id: Option<String>,
    /// Contact ids to mention.
    pub mentions: Vec<String>,
}

impl SendOptions {
    pub fn quoting(message_id: impl Into<String>) -> Self {
        Self {
            quoted_message_id: Some(message_id.into()),
            mentions: Vec::new(),
        }
    }
}
