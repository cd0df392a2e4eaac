use std::sync::Arc;

use crate::config::ConfigStore;
use crate::services::Recommender;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub config: ConfigStore,
}

impl AppState {
    pub fn new(recommender: Recommender, config: ConfigStore) -> Self {
        Self {
            recommender: Arc::new(recommender),
            config,
        }
    }
}
