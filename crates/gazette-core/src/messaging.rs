use async_trait::async_trait;

use crate::{
    domain::{ChannelId, MessageRef, UserId},
    Result,
};

/// Cross-messenger port.
///
/// The console front end is the first implementation; the shape is designed
/// so platform adapters (Discord/Telegram/Slack) can fit behind the same
/// interface.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Post to a channel (the enriched summary goes here).
    async fn send_to_channel(&self, channel_id: ChannelId, text: &str) -> Result<()>;

    /// Reply to the message that shared the link (duplicate notices, errors).
    async fn reply(&self, msg: MessageRef, text: &str) -> Result<()>;

    /// Direct-message a single user (follow-up notifications).
    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<()>;
}
