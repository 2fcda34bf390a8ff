//! The messaging collaborator: event delivery, sends, and chat/contact lookups.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::pipeline::types::{ChatInfo, ContactInfo, IncomingMessage, SendOptions};

/// Stream of inbound message events.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A messaging channel the bot is logged into.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    /// The bot's own identity chat (the self-chat).
    fn own_chat_id(&self) -> &str;

    /// Start delivering inbound events.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a text message. Returns the new message's ID.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<String, ChannelError>;

    /// All chats the account can see.
    async fn get_chats(&self) -> Result<Vec<ChatInfo>, ChannelError>;

    /// Look up one chat.
    async fn get_chat_by_id(&self, chat_id: &str) -> Result<ChatInfo, ChannelError>;

    /// Look up one contact.
    async fn get_contact_by_id(&self, contact_id: &str) -> Result<ContactInfo, ChannelError>;
}
