/// Mattermost REST API client
///
/// Implements both the directory reads and ephemeral post delivery against
/// the v4 API, authenticating with a bot or personal access token.
///
/// Endpoints:
/// - `GET  /api/v4/channels/{id}`
/// - `GET  /api/v4/channels/{id}/stats`
/// - `GET  /api/v4/channels/{id}/members?page=&per_page=`
/// - `GET  /api/v4/users/{user_id}/teams/{team_id}/channels?include_deleted=`
/// - `POST /api/v4/posts/ephemeral`
use crate::{
    error::{AppError, AppResult},
    models::{Channel, ChannelMember, ChannelStats},
    services::{directory::DirectoryService, messenger::Messenger},
};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Clone)]
pub struct MattermostClient {
    http_client: HttpClient,
    base_url: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct EphemeralPost<'a> {
    user_id: &'a str,
    post: EphemeralPostBody<'a>,
}

#[derive(Debug, Serialize)]
struct EphemeralPostBody<'a> {
    channel_id: &'a str,
    message: &'a str,
}

impl MattermostClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.base_url, path)
    }

    /// Issues a GET and maps transport failures and non-success statuses to
    /// `Fetch` errors
    async fn get(&self, path: &str, query: &[(&str, String)]) -> AppResult<Response> {
        tracing::debug!(path = %path, "Calling Mattermost API");

        let response = self
            .http_client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("GET {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(status_error(path, response).await);
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        self.get(path, query)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AppError::Fetch(format!("GET {} returned an invalid body: {}", path, e)))
    }
}

async fn status_error(path: &str, response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        path = %path,
        status = %status,
        body = %body,
        "Mattermost API request failed"
    );
    AppError::Fetch(format!("GET {} returned status {}", path, status))
}

#[async_trait::async_trait]
impl DirectoryService for MattermostClient {
    async fn get_channel(&self, channel_id: &str) -> AppResult<Channel> {
        let path = format!("/channels/{}", channel_id);

        let response = self
            .http_client
            .get(self.url(&path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::Lookup(format!("channel {}: {}", channel_id, e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<Channel>()
                .await
                .map_err(|e| AppError::Lookup(format!("channel {}: invalid body: {}", channel_id, e))),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Err(AppError::Lookup(format!(
                "channel {} not found",
                channel_id
            ))),
            status => Err(AppError::Lookup(format!(
                "channel {}: status {}",
                channel_id, status
            ))),
        }
    }

    async fn get_channel_stats(&self, channel_id: &str) -> AppResult<ChannelStats> {
        self.get_json(&format!("/channels/{}/stats", channel_id), &[])
            .await
    }

    async fn get_channel_members(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<ChannelMember>> {
        self.get_json(
            &format!("/channels/{}/members", channel_id),
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    async fn get_channels_for_user_in_team(
        &self,
        team_id: &str,
        user_id: &str,
        include_deleted: bool,
    ) -> AppResult<Vec<Channel>> {
        let channels: Vec<Channel> = self
            .get_json(
                &format!("/users/{}/teams/{}/channels", user_id, team_id),
                &[("include_deleted", include_deleted.to_string())],
            )
            .await?;

        Ok(channels
            .into_iter()
            .filter(|c| include_deleted || !c.is_deleted())
            .collect())
    }
}

#[async_trait::async_trait]
impl Messenger for MattermostClient {
    async fn send_ephemeral(&self, user_id: &str, channel_id: &str, text: &str) -> AppResult<()> {
        let path = "/posts/ephemeral";
        let body = EphemeralPost {
            user_id,
            post: EphemeralPostBody {
                channel_id,
                message: text,
            },
        };

        let response = self
            .http_client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(path, response).await);
        }

        tracing::debug!(user_id = %user_id, channel_id = %channel_id, "Sent ephemeral post");
        Ok(())
    }
}
