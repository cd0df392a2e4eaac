use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::services::template::MessageTemplate;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the Mattermost server
    #[serde(default = "default_mattermost_url")]
    pub mattermost_url: String,

    /// Bot or personal access token used for the REST API
    pub mattermost_token: String,

    /// Space-separated channel names that are never recommended
    #[serde(default)]
    pub excluded_channels: String,

    /// Message template containing `{{.Channels}}`
    #[serde(default)]
    pub message_template: String,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_members_per_page")]
    pub members_per_page: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_mattermost_url() -> String {
    "http://localhost:8065".to_string()
}

fn default_top_n() -> usize {
    3
}

fn default_members_per_page() -> u32 {
    50
}

/// Largest page size the chat server honours for member listings
pub const MAX_MEMBERS_PER_PAGE: u32 = 200;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Runtime settings seeded from the environment
    pub fn settings(&self) -> RecommenderSettings {
        RecommenderSettings {
            excluded_channels: self.excluded_channels.clone(),
            message_template: self.message_template.clone(),
            top_n: self.top_n,
            members_per_page: self.members_per_page,
        }
    }
}

/// Operator-editable settings, as submitted before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderSettings {
    #[serde(default)]
    pub excluded_channels: String,
    #[serde(default)]
    pub message_template: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_members_per_page")]
    pub members_per_page: u32,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            excluded_channels: String::new(),
            message_template: String::new(),
            top_n: default_top_n(),
            members_per_page: default_members_per_page(),
        }
    }
}

/// Channel names that are never recommended and never trigger recommendations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(HashSet<String>);

impl ExclusionSet {
    /// Parses a whitespace-separated list of channel names
    pub fn parse(raw: &str) -> Self {
        Self(raw.split_whitespace().map(str::to_string).collect())
    }

    pub fn contains(&self, channel_name: &str) -> bool {
        self.0.contains(channel_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validated, immutable configuration snapshot used by one event
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    pub settings: RecommenderSettings,
    pub excluded: ExclusionSet,
    /// `None` until a valid configuration has been loaded
    pub template: Option<MessageTemplate>,
    pub top_n: usize,
    pub members_per_page: u32,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        let settings = RecommenderSettings::default();
        Self {
            excluded: ExclusionSet::default(),
            template: None,
            top_n: settings.top_n,
            members_per_page: settings.members_per_page,
            settings,
        }
    }
}

impl RecommenderConfig {
    /// Validates raw settings into a snapshot
    pub fn from_settings(settings: RecommenderSettings) -> AppResult<Self> {
        let template = MessageTemplate::parse(&settings.message_template)?;

        if settings.top_n == 0 {
            return Err(AppError::Config("top_n must be at least 1".to_string()));
        }
        if settings.members_per_page == 0 || settings.members_per_page > MAX_MEMBERS_PER_PAGE {
            return Err(AppError::Config(format!(
                "members_per_page must be between 1 and {}",
                MAX_MEMBERS_PER_PAGE
            )));
        }

        Ok(Self {
            excluded: ExclusionSet::parse(&settings.excluded_channels),
            template: Some(template),
            top_n: settings.top_n,
            members_per_page: settings.members_per_page,
            settings,
        })
    }
}

/// Holder of the active configuration snapshot
///
/// Readers get an `Arc` to the snapshot and the lock is released before the
/// call returns, so no lock is ever held while talking to the chat server.
#[derive(Clone, Default)]
pub struct ConfigStore {
    active: Arc<RwLock<Arc<RecommenderConfig>>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the active snapshot
    pub async fn current(&self) -> Arc<RecommenderConfig> {
        self.active.read().await.clone()
    }

    /// Validates `settings` and activates them. On error the previous
    /// snapshot stays active.
    pub async fn apply(&self, settings: RecommenderSettings) -> AppResult<Arc<RecommenderConfig>> {
        let config = Arc::new(RecommenderConfig::from_settings(settings)?);

        *self.active.write().await = config.clone();

        tracing::info!(
            excluded_count = config.excluded.len(),
            top_n = config.top_n,
            members_per_page = config.members_per_page,
            "Activated recommender configuration"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(template: &str, excluded: &str) -> RecommenderSettings {
        RecommenderSettings {
            excluded_channels: excluded.to_string(),
            message_template: template.to_string(),
            ..RecommenderSettings::default()
        }
    }

    #[test]
    fn test_exclusion_set_splits_on_whitespace() {
        let excluded = ExclusionSet::parse("town-square  off-topic\tannouncements ");

        assert_eq!(excluded.len(), 3);
        assert!(excluded.contains("off-topic"));
        assert!(excluded.contains("announcements"));
        assert!(!excluded.contains(""));
    }

    #[test]
    fn test_empty_exclusion_string_excludes_nothing() {
        assert!(ExclusionSet::parse("").is_empty());
    }

    #[test]
    fn test_from_settings_valid() {
        let config = RecommenderConfig::from_settings(settings("Try {{.Channels}}", "a b")).unwrap();

        assert!(config.template.is_some());
        assert_eq!(config.top_n, 3);
        assert_eq!(config.members_per_page, 50);
        assert!(config.excluded.contains("b"));
    }

    #[test]
    fn test_from_settings_rejects_zero_top_n() {
        let mut raw = settings("{{.Channels}}", "");
        raw.top_n = 0;

        let err = RecommenderConfig::from_settings(raw).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_from_settings_bounds_members_per_page() {
        let mut raw = settings("{{.Channels}}", "");
        raw.members_per_page = MAX_MEMBERS_PER_PAGE + 1;
        let err = RecommenderConfig::from_settings(raw.clone()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        raw.members_per_page = MAX_MEMBERS_PER_PAGE;
        let config = RecommenderConfig::from_settings(raw).unwrap();
        assert_eq!(config.members_per_page, 200);
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let raw: RecommenderSettings =
            serde_json::from_str(r#"{"message_template": "{{.Channels}}"}"#).unwrap();

        assert_eq!(raw.top_n, 3);
        assert_eq!(raw.members_per_page, 50);
        assert_eq!(raw.excluded_channels, "");
    }

    #[tokio::test]
    async fn test_store_starts_with_empty_default() {
        let store = ConfigStore::new();
        let config = store.current().await;

        assert!(config.template.is_none());
        assert!(config.excluded.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_settings_keep_previous_snapshot() {
        let store = ConfigStore::new();
        tokio_test::assert_ok!(store.apply(settings("First {{.Channels}}", "x")).await);

        tokio_test::assert_err!(store.apply(settings("no placeholder", "y")).await);

        let config = store.current().await;
        assert_eq!(config.settings.message_template, "First {{.Channels}}");
        assert!(config.excluded.contains("x"));
    }

    #[tokio::test]
    async fn test_snapshot_held_by_reader_survives_swap() {
        let store = ConfigStore::new();
        store.apply(settings("Old {{.Channels}}", "")).await.unwrap();
        let held = store.current().await;

        store.apply(settings("New {{.Channels}}", "")).await.unwrap();

        assert_eq!(held.settings.message_template, "Old {{.Channels}}");
        assert_eq!(
            store.current().await.settings.message_template,
            "New {{.Channels}}"
        );
    }
}
