use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{Menu, MessagingCapabilities},
    Result,
};

/// Outbound messaging port.
///
/// The poller fan-out and the command path both talk to the chat transport
/// through this trait, so tests can substitute a recording fake.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    /// Send a message with a reply keyboard attached.
    async fn send_menu(&self, chat_id: ChatId, html: &str, menu: &Menu) -> Result<MessageRef>;
}
