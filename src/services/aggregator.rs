use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::instrument;

use crate::{
    config::ExclusionSet,
    error::{AppError, AppResult},
    models::{Channel, CoMembershipCounts},
    services::directory::DirectoryService,
};

/// Upper bound on concurrent per-member membership lookups for one event
const MAX_CONCURRENT_MEMBER_FETCHES: usize = 8;

/// Result of aggregating one channel's co-memberships
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// The channel the user joined; carries the team context
    pub channel: Channel,
    pub counts: CoMembershipCounts,
}

impl Aggregation {
    fn empty(channel: Channel) -> Self {
        Self {
            channel,
            counts: CoMembershipCounts::new(),
        }
    }
}

/// Counts, for every channel in the team, how many of the joined channel's
/// other members already belong to it
pub struct MembershipAggregator {
    directory: Arc<dyn DirectoryService>,
}

impl MembershipAggregator {
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }

    /// Builds the co-membership counts for `channel_id`.
    ///
    /// All-or-nothing: any failed member page or member lookup fails the
    /// whole aggregation and nothing fetched so far is returned. Excluded
    /// channels and channels without other members yield empty counts.
    #[instrument(skip_all, fields(channel_id = %channel_id, user_id = %joining_user_id))]
    pub async fn aggregate(
        &self,
        channel_id: &str,
        joining_user_id: &str,
        excluded: &ExclusionSet,
        per_page: u32,
    ) -> AppResult<Aggregation> {
        let channel = self.directory.get_channel(channel_id).await.map_err(|e| {
            tracing::error!(channel_id = %channel_id, error = %e, "Failed to get channel");
            e
        })?;

        if excluded.contains(&channel.name) {
            tracing::debug!(
                channel_id = %channel_id,
                channel_name = %channel.name,
                "Channel excluded from recommendations"
            );
            return Ok(Aggregation::empty(channel));
        }

        let members = self
            .fetch_other_members(channel_id, joining_user_id, per_page)
            .await?;

        tracing::debug!(member_count = members.len(), "Found channel members");

        if members.is_empty() {
            return Ok(Aggregation::empty(channel));
        }

        let counts = self.count_memberships(&channel.team_id, members).await?;

        tracing::debug!(candidate_count = counts.len(), "Counted co-memberships");

        Ok(Aggregation { channel, counts })
    }

    /// Pages through the channel's members, dropping the joining user
    async fn fetch_other_members(
        &self,
        channel_id: &str,
        joining_user_id: &str,
        per_page: u32,
    ) -> AppResult<Vec<String>> {
        let stats = self
            .directory
            .get_channel_stats(channel_id)
            .await
            .map_err(|e| {
                tracing::error!(channel_id = %channel_id, error = %e, "Failed to get channel stats");
                e
            })?;

        let mut seen = HashSet::new();
        let mut members = Vec::new();
        let mut fetched: u64 = 0;
        let mut page: u32 = 0;

        // advance by rows actually returned; the server may serve smaller pages
        while fetched < stats.member_count {
            let batch = self
                .directory
                .get_channel_members(channel_id, page, per_page)
                .await
                .map_err(|e| {
                    tracing::error!(
                        channel_id = %channel_id,
                        page = page,
                        per_page = per_page,
                        error = %e,
                        "Failed to get channel members"
                    );
                    e
                })?;

            // membership shrank since the stats were read
            if batch.is_empty() {
                break;
            }

            fetched += batch.len() as u64;

            for member in batch {
                if member.user_id != joining_user_id && seen.insert(member.user_id.clone()) {
                    members.push(member.user_id);
                }
            }

            page += 1;
        }

        Ok(members)
    }

    /// Fetches every member's team channels concurrently and tallies them.
    /// The first failure aborts the outstanding lookups.
    async fn count_memberships(
        &self,
        team_id: &str,
        member_ids: Vec<String>,
    ) -> AppResult<CoMembershipCounts> {
        let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_MEMBER_FETCHES));
        let mut tasks = JoinSet::new();

        for user_id in member_ids {
            let directory = Arc::clone(&self.directory);
            let permits = Arc::clone(&permits);
            let team_id = team_id.to_string();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let channels = directory
                    .get_channels_for_user_in_team(&team_id, &user_id, false)
                    .await;
                (user_id, channels)
            });
        }

        let mut counts = CoMembershipCounts::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(channels))) => {
                    counts.record_member(
                        channels
                            .into_iter()
                            .filter(|c| !c.is_deleted())
                            .map(|c| c.id),
                    );
                }
                Ok((user_id, Err(e))) => {
                    tracing::error!(
                        team_id = %team_id,
                        user_id = %user_id,
                        error = %e,
                        "Failed to get channels for team for user"
                    );
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Membership lookup task failed");
                    tasks.abort_all();
                    return Err(AppError::Internal(e.to_string()));
                }
            }
        }

        Ok(counts)
    }
}
