use serde::{Deserialize, Serialize};

/// Mention sigil the chat server renders as a channel link
pub const CHANNEL_MENTION_PREFIX: char = '~';

/// A channel as returned by the directory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub team_id: String,
    /// URL-safe handle, the part after `~` in a mention
    pub name: String,
    /// Soft-delete timestamp in milliseconds; 0 while the channel is live
    #[serde(default)]
    pub delete_at: i64,
}

impl Channel {
    pub fn is_deleted(&self) -> bool {
        self.delete_at != 0
    }

    /// Formats the channel handle as a mention, e.g. `~town-square`
    pub fn mention(&self) -> String {
        format!("{}{}", CHANNEL_MENTION_PREFIX, self.name)
    }
}

/// A user's membership in a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    pub user_id: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub member_count: u64,
}

/// The user that triggered a membership change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}
