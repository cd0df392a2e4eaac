pub mod aggregator;
pub mod directory;
pub mod mattermost;
pub mod messenger;
pub mod recommender;
pub mod selector;
pub mod template;

pub use aggregator::{Aggregation, MembershipAggregator};
pub use directory::{DirectoryService, InMemoryDirectory};
pub use mattermost::MattermostClient;
pub use messenger::Messenger;
pub use recommender::Recommender;
pub use selector::RecommendationSelector;
pub use template::MessageTemplate;
