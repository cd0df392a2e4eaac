use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    config::ExclusionSet,
    error::AppResult,
    models::CoMembershipCounts,
    services::directory::DirectoryService,
};

/// Turns co-membership counts into the channel mentions to recommend
pub struct RecommendationSelector {
    directory: Arc<dyn DirectoryService>,
}

impl RecommendationSelector {
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }

    /// Picks up to `top_n` channel mentions, most shared channel first.
    ///
    /// Channels the joining user already belongs to are dropped before
    /// ranking. Excluded channels and candidates whose lookup fails are
    /// skipped without using up a slot.
    pub async fn select(
        &self,
        mut counts: CoMembershipCounts,
        joining_user_id: &str,
        team_id: &str,
        top_n: usize,
        excluded: &ExclusionSet,
    ) -> AppResult<Vec<String>> {
        let joined: HashSet<String> = self
            .directory
            .get_channels_for_user_in_team(team_id, joining_user_id, false)
            .await
            .map_err(|e| {
                tracing::error!(
                    team_id = %team_id,
                    user_id = %joining_user_id,
                    error = %e,
                    "Failed to get channels for joining user"
                );
                e
            })?
            .into_iter()
            .map(|c| c.id)
            .collect();

        counts.remove_all(&joined);

        let mut handles = Vec::with_capacity(top_n);

        for candidate in counts.ranked() {
            if handles.len() >= top_n {
                break;
            }

            let channel = match self.directory.get_channel(&candidate.channel_id).await {
                Ok(channel) => channel,
                Err(e) => {
                    tracing::warn!(
                        channel_id = %candidate.channel_id,
                        error = %e,
                        "Failed to get candidate channel, skipping"
                    );
                    continue;
                }
            };

            if excluded.contains(&channel.name) {
                tracing::debug!(channel_name = %channel.name, "Skipping excluded channel");
                continue;
            }

            tracing::debug!(
                channel_name = %channel.name,
                count = candidate.count,
                "Accepted recommendation"
            );
            handles.push(channel.mention());
        }

        Ok(handles)
    }
}
