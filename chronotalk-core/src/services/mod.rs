//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod assistant;
pub mod feed;
pub mod logging;
pub mod sync;

pub use assistant::{AssistantService, CancelToken, Mood};
pub use feed::{load_initial_posts, load_initial_user, FeedStats, FeedStore, POSTS_KEY, USER_KEY};
pub use logging::{LogEntry, LogEvent, LogStats, LoggingService};
pub use sync::{SyncListener, SyncOutcome};
