use std::sync::Arc;

use tracing::instrument;

use crate::{
    config::ConfigStore,
    error::AppResult,
    models::{ChannelMember, User},
    services::{
        aggregator::MembershipAggregator, directory::DirectoryService, messenger::Messenger,
        selector::RecommendationSelector,
    },
};

/// Handles "user joined channel" events end to end
pub struct Recommender {
    aggregator: MembershipAggregator,
    selector: RecommendationSelector,
    messenger: Arc<dyn Messenger>,
    config: ConfigStore,
}

impl Recommender {
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        messenger: Arc<dyn Messenger>,
        config: ConfigStore,
    ) -> Self {
        Self {
            aggregator: MembershipAggregator::new(Arc::clone(&directory)),
            selector: RecommendationSelector::new(directory),
            messenger,
            config,
        }
    }

    /// Event entry point. Never fails: errors are logged and the user simply
    /// gets no recommendation.
    #[instrument(skip_all, fields(
        channel_id = %member.channel_id,
        user_id = %member.user_id,
        actor_id = actor.map(|a| a.id.as_str()).unwrap_or("")
    ))]
    pub async fn on_user_joined(&self, member: &ChannelMember, actor: Option<&User>) {
        tracing::debug!("Handling user joined channel");

        let message = match self.recommend(member).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::debug!("No recommendation for this join");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to build channel recommendation");
                return;
            }
        };

        if let Err(e) = self
            .messenger
            .send_ephemeral(&member.user_id, &member.channel_id, &message)
            .await
        {
            tracing::error!(error = %e, "Failed to send recommendation");
            return;
        }

        tracing::info!("Sent channel recommendation");
    }

    /// Computes the rendered recommendation message for a join, if any
    pub async fn recommend(&self, member: &ChannelMember) -> AppResult<Option<String>> {
        // snapshot; the lock is not held past this point
        let config = self.config.current().await;

        let Some(template) = config.template.as_ref() else {
            tracing::warn!("No valid message template configured, skipping recommendation");
            return Ok(None);
        };

        let aggregation = self
            .aggregator
            .aggregate(
                &member.channel_id,
                &member.user_id,
                &config.excluded,
                config.members_per_page,
            )
            .await?;

        if aggregation.counts.is_empty() {
            return Ok(None);
        }

        let handles = self
            .selector
            .select(
                aggregation.counts,
                &member.user_id,
                &aggregation.channel.team_id,
                config.top_n,
                &config.excluded,
            )
            .await?;

        if handles.is_empty() {
            return Ok(None);
        }

        template.render(&handles).map(Some)
    }
}
