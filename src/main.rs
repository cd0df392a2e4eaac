use std::sync::Arc;

use channel_recommender::{
    api::{create_router, AppState},
    config::{Config, ConfigStore},
    services::{MattermostClient, Recommender},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "channel_recommender=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // An invalid initial template leaves recommendations disabled until a
    // valid configuration is submitted.
    let store = ConfigStore::new();
    if let Err(e) = store.apply(config.settings()).await {
        tracing::error!(error = %e, "Initial recommender configuration rejected");
    }

    let client = Arc::new(MattermostClient::new(
        config.mattermost_url.clone(),
        config.mattermost_token.clone(),
    ));
    let recommender = Recommender::new(client.clone(), client, store.clone());

    let app = create_router(AppState::new(recommender, store));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, mattermost_url = %config.mattermost_url, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
