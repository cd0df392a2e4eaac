use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{Channel, ChannelMember, ChannelStats},
    services::directory::DirectoryService,
};

/// In-process directory with deterministic ordering and failure injection
///
/// Members are listed in the order they were added. Every call is recorded
/// so callers can assert which lookups happened.
#[derive(Default)]
pub struct InMemoryDirectory {
    channels: HashMap<String, Channel>,
    members: Vec<ChannelMember>,
    failing_member_pages: HashSet<u32>,
    failing_users: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live channel
    pub fn add_channel(&mut self, id: &str, team_id: &str, name: &str) -> &mut Self {
        self.channels.insert(
            id.to_string(),
            Channel {
                id: id.to_string(),
                team_id: team_id.to_string(),
                name: name.to_string(),
                delete_at: 0,
            },
        );
        self
    }

    /// Marks a channel as soft-deleted
    pub fn delete_channel(&mut self, id: &str, delete_at: i64) -> &mut Self {
        if let Some(channel) = self.channels.get_mut(id) {
            channel.delete_at = delete_at;
        }
        self
    }

    pub fn add_member(&mut self, channel_id: &str, user_id: &str) -> &mut Self {
        self.members.push(ChannelMember {
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
        });
        self
    }

    /// Makes every member listing of `page` fail
    pub fn fail_member_page(&mut self, page: u32) -> &mut Self {
        self.failing_member_pages.insert(page);
        self
    }

    /// Makes membership lookups for `user_id` fail
    pub fn fail_user(&mut self, user_id: &str) -> &mut Self {
        self.failing_users.insert(user_id.to_string());
        self
    }

    /// Calls made so far, e.g. `get_channel:c1`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn members_of<'a>(&'a self, channel_id: &'a str) -> impl Iterator<Item = &'a ChannelMember> {
        self.members.iter().filter(move |m| m.channel_id == channel_id)
    }
}

#[async_trait::async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn get_channel(&self, channel_id: &str) -> AppResult<Channel> {
        self.record(format!("get_channel:{}", channel_id));
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| AppError::Lookup(format!("channel {} not found", channel_id)))
    }

    async fn get_channel_stats(&self, channel_id: &str) -> AppResult<ChannelStats> {
        self.record(format!("get_channel_stats:{}", channel_id));
        if !self.channels.contains_key(channel_id) {
            return Err(AppError::Fetch(format!("no stats for channel {}", channel_id)));
        }

        Ok(ChannelStats {
            member_count: self.members_of(channel_id).count() as u64,
        })
    }

    async fn get_channel_members(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<ChannelMember>> {
        self.record(format!("get_channel_members:{}:{}", channel_id, page));
        if self.failing_member_pages.contains(&page) {
            return Err(AppError::Fetch(format!(
                "member page {} of channel {} unavailable",
                page, channel_id
            )));
        }

        Ok(self
            .members_of(channel_id)
            .skip(page as usize * per_page as usize)
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn get_channels_for_user_in_team(
        &self,
        team_id: &str,
        user_id: &str,
        include_deleted: bool,
    ) -> AppResult<Vec<Channel>> {
        self.record(format!("get_channels_for_user_in_team:{}:{}", team_id, user_id));
        if self.failing_users.contains(user_id) {
            return Err(AppError::Fetch(format!(
                "channels for user {} unavailable",
                user_id
            )));
        }

        Ok(self
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| self.channels.get(&m.channel_id))
            .filter(|c| c.team_id == team_id)
            .filter(|c| include_deleted || !c.is_deleted())
            .cloned()
            .collect())
    }
}
