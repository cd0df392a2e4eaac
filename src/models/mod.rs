use serde::{Deserialize, Serialize};

pub mod channel;
pub mod recommendation;

pub use channel::{Channel, ChannelMember, ChannelStats, User, CHANNEL_MENTION_PREFIX};
pub use recommendation::{ChannelCount, CoMembershipCounts};

/// Payload delivered by the chat server when a user joins a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserJoinedEvent {
    pub channel_member: ChannelMember,
    #[serde(default)]
    pub actor: Option<User>,
}
