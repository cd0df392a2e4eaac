use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};
use tracing::Instrument;

use crate::{
    config::RecommenderSettings,
    error::AppResult,
    middleware::request_id::RequestId,
    models::UserJoinedEvent,
};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Receives a "user joined channel" event.
///
/// The recommendation runs in the background; the chat server only needs to
/// know the event was accepted.
pub async fn user_joined(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(event): Json<UserJoinedEvent>,
) -> StatusCode {
    tracing::info!(
        request_id = %request_id,
        channel_id = %event.channel_member.channel_id,
        user_id = %event.channel_member.user_id,
        "Received user joined event"
    );

    let recommender = state.recommender.clone();
    let span = tracing::info_span!("user_joined", request_id = %request_id);

    tokio::spawn(
        async move {
            recommender
                .on_user_joined(&event.channel_member, event.actor.as_ref())
                .await;
        }
        .instrument(span),
    );

    StatusCode::ACCEPTED
}

/// Returns the settings of the active configuration
pub async fn get_config(State(state): State<AppState>) -> Json<RecommenderSettings> {
    Json(state.config.current().await.settings.clone())
}

/// Validates and activates new settings. Invalid settings leave the active
/// configuration untouched.
pub async fn update_config(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(settings): Json<RecommenderSettings>,
) -> AppResult<StatusCode> {
    state.config.apply(settings).await.map_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "Rejected configuration");
        e
    })?;

    Ok(StatusCode::NO_CONTENT)
}
