//! Console implementation of the messaging port, for local operation.

use async_trait::async_trait;

use gazette_core::{
    domain::{ChannelId, MessageRef, UserId},
    messaging::MessagingPort,
    Result,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleMessenger;

#[async_trait]
impl MessagingPort for ConsoleMessenger {
    async fn send_to_channel(&self, channel_id: ChannelId, text: &str) -> Result<()> {
        println!("\n[#channel {}]\n{text}\n", channel_id.0);
        Ok(())
    }

    async fn reply(&self, msg: MessageRef, text: &str) -> Result<()> {
        println!("\n[reply to message {}] {text}\n", msg.message_id.0);
        Ok(())
    }

    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<()> {
        println!("\n[dm to user {}]\n{text}\n", user_id.0);
        Ok(())
    }
}
