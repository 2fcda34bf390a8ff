//! In-memory channel double shared by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::channels::{Channel, MessageStream};
use crate::error::ChannelError;
use crate::pipeline::types::{ChatInfo, ContactInfo, SendOptions};

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub options: SendOptions,
}

#[derive(Default)]
pub struct FakeChannel {
    own_chat_id: String,
    chats: Vec<ChatInfo>,
    contacts: Vec<ContactInfo>,
    chats_error: Option<String>,
    failing_sends: Vec<String>,
    sent: Mutex<Vec<SentMessage>>,
}

impl FakeChannel {
    pub fn new(own_chat_id: &str) -> Self {
        Self {
            own_chat_id: own_chat_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_chat(mut self, id: &str, name: &str, is_group: bool) -> Self {
        self.chats.push(ChatInfo {
            id: id.to_string(),
            name: name.to_string(),
            is_group,
        });
        self
    }

    pub fn with_contact(mut self, id: &str, push_name: &str) -> Self {
        self.contacts.push(ContactInfo {
            id: id.to_string(),
            push_name: Some(push_name.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn failing_chats(mut self, reason: &str) -> Self {
        self.chats_error = Some(reason.to_string());
        self
    }

    pub fn failing_sends_to(mut self, chat_id: &str) -> Self {
        self.failing_sends.push(chat_id.to_string());
        self
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for FakeChannel {
    fn name(&self) -> &str {
        "fake"
    }

    fn own_chat_id(&self) -> &str {
        &self.own_chat_id
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<String, ChannelError> {
        if self.failing_sends.iter().any(|c| c == chat_id) {
            return Err(ChannelError::SendFailed {
                chat_id: chat_id.to_string(),
                reason: "unreachable".into(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            options,
        });
        Ok(format!("msg-{}", sent.len()))
    }

    async fn get_chats(&self) -> Result<Vec<ChatInfo>, ChannelError> {
        match &self.chats_error {
            Some(reason) => Err(ChannelError::LookupFailed {
                id: "*".into(),
                reason: reason.clone(),
            }),
            None => Ok(self.chats.clone()),
        }
    }

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<ChatInfo, ChannelError> {
        self.chats
            .iter()
            .find(|c| c.id == chat_id)
            .cloned()
            .ok_or_else(|| ChannelError::LookupFailed {
                id: chat_id.to_string(),
                reason: "unknown chat".into(),
            })
    }

    async fn get_contact_by_id(&self, contact_id: &str) -> Result<ContactInfo, ChannelError> {
        self.contacts
            .iter()
            .find(|c| c.id == contact_id)
            .cloned()
            .ok_or_else(|| ChannelError::LookupFailed {
                id: contact_id.to_string(),
                reason: "unknown contact".into(),
            })
    }
}
