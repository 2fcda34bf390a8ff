//! Console channel: line-delimited JSON events on stdin, sends on stdout.
//!
//! Lets the bot run locally without a chat protocol. Each stdin line is one
//! event, e.g.
//!
//! ```text
//! {"chatId": "G1@g.us", "isGroup": true, "chatName": "Rustaceans", "author": "bob@c.us", "senderName": "Bob", "body": "new tokio release"}
//! {"chatId": "me@console", "originatingChatId": "me@console", "fromSelf": true, "body": "!list"}
//! ```
//!
//! Chats and contacts seen in events are remembered so lookups and the
//! group wizard have something to work with.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::channels::{Channel, MessageStream};
use crate::error::ChannelError;
use crate::pipeline::types::{ChatInfo, ContactInfo, IncomingMessage, SendOptions};

/// Chat ids with this suffix are status/broadcast updates.
const BROADCAST_SUFFIX: &str = "@broadcast";

/// One stdin line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsoleEvent {
    #[serde(flatten)]
    message: IncomingMessage,
    #[serde(default)]
    chat_name: Option<String>,
    #[serde(default)]
    sender_name: Option<String>,
}

#[derive(Default)]
struct Directory {
    /// In order of first appearance.
    chats: Vec<ChatInfo>,
    contacts: HashMap<String, ContactInfo>,
}

impl Directory {
    fn observe(&mut self, event: &ConsoleEvent) {
        let msg = &event.message;
        let chat_id = msg.actual_chat_id().to_string();

        match self.chats.iter_mut().find(|c| c.id == chat_id) {
            Some(chat) => {
                if let Some(name) = &event.chat_name {
                    chat.name = name.clone();
                }
            }
            None => self.chats.push(ChatInfo {
                id: chat_id.clone(),
                name: event.chat_name.clone().unwrap_or_default(),
                is_group: msg.is_group,
            }),
        }

        if msg.from_self {
            return;
        }
        let contact_id = msg.author.clone().unwrap_or(chat_id);
        let contact = self
            .contacts
            .entry(contact_id.clone())
            .or_insert_with(|| ContactInfo {
                id: contact_id,
                ..Default::default()
            });
        if let Some(name) = &event.sender_name {
            contact.push_name = Some(name.clone());
        }
        contact.is_enterprise = msg.sender_is_enterprise;
    }
}

/// Parse one stdin line into an event.
fn parse_event(line: &str) -> Result<ConsoleEvent, ChannelError> {
    let mut event: ConsoleEvent =
        serde_json::from_str(line).map_err(|e| ChannelError::InvalidEvent(e.to_string()))?;
    if event.message.chat_id.ends_with(BROADCAST_SUFFIX) {
        event.message.is_status = true;
    }
    Ok(event)
}

/// A console channel that reads events from stdin and writes sends to stdout.
pub struct ConsoleChannel {
    own_chat_id: String,
    directory: Arc<RwLock<Directory>>,
}

impl ConsoleChannel {
    pub fn new(own_chat_id: impl Into<String>) -> Self {
        Self {
            own_chat_id: own_chat_id.into(),
            directory: Arc::new(RwLock::new(Directory::default())),
        }
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn own_chat_id(&self) -> &str {
        &self.own_chat_id
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let directory = Arc::clone(&self.directory);

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let mut lines = BufReader::new(stdin).lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        let event = match parse_event(line) {
                            Ok(event) => event,
                            Err(e) => {
                                tracing::warn!(error = %e, "Skipping malformed console event");
                                continue;
                            }
                        };
                        directory.write().await.observe(&event);
                        if tx.send(event.message).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<String, ChannelError> {
        let id = uuid::Uuid::new_v4().to_string();
        let line = serde_json::json!({
            "id": id,
            "to": chat_id,
            "text": text,
            "quotedMessageId": options.quoted_message_id,
            "mentions": options.mentions,
        });
        println!("{line}");
        Ok(id)
    }

    async fn get_chats(&self) -> Result<Vec<ChatInfo>, ChannelError> {
        Ok(self.directory.read().await.chats.clone())
    }

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<ChatInfo, ChannelError> {
        if chat_id == self.own_chat_id {
            return Ok(ChatInfo {
                id: chat_id.to_string(),
                name: "You".into(),
                is_group: false,
            });
        }
        self.directory
            .read()
            .await
            .chats
            .iter()
            .find(|c| c.id == chat_id)
            .cloned()
            .ok_or_else(|| ChannelError::LookupFailed {
                id: chat_id.to_string(),
                reason: "chat not seen yet".into(),
            })
    }

    async fn get_contact_by_id(&self, contact_id: &str) -> Result<ContactInfo, ChannelError> {
        self.directory
            .read()
            .await
            .contacts
            .get(contact_id)
            .cloned()
            .ok_or_else(|| ChannelError::LookupFailed {
                id: contact_id.to_string(),
                reason: "contact not seen yet".into(),
            })
    }
}
