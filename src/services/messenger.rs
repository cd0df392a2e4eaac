use crate::error::AppResult;

/// Delivery of messages back into the chat server
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    /// Posts a message into `channel_id` that only `user_id` can see
    async fn send_ephemeral(&self, user_id: &str, channel_id: &str, text: &str) -> AppResult<()>;
}
