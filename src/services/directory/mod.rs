/// Chat server directory abstraction
///
/// The recommender only ever reads from the directory: channel lookups,
/// member listings and per-user channel memberships. Implementations carry
/// their own timeout policy; failures are reported immediately and never
/// retried here.
use crate::{
    error::AppResult,
    models::{Channel, ChannelMember, ChannelStats},
};

pub mod memory;

pub use memory::InMemoryDirectory;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DirectoryService: Send + Sync {
    /// Looks up a single channel. A missing channel is a `Lookup` error.
    async fn get_channel(&self, channel_id: &str) -> AppResult<Channel>;

    /// Member statistics for a channel
    async fn get_channel_stats(&self, channel_id: &str) -> AppResult<ChannelStats>;

    /// One page of a channel's members. Pages are zero-based.
    async fn get_channel_members(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<ChannelMember>>;

    /// Every channel of `team_id` that `user_id` belongs to
    async fn get_channels_for_user_in_team(
        &self,
        team_id: &str,
        user_id: &str,
        include_deleted: bool,
    ) -> AppResult<Vec<Channel>>;
}
