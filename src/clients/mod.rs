//! Remote search clients.

pub mod block_detect;
pub mod rate_limit;
pub mod reddit;

pub use rate_limit::RateLimiter;
pub use reddit::RedditClient;

use crate::models::SearchResult;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Search request failed: {0}")]
    Network(String),

    #[error("Failed to parse search response: {0}")]
    Parse(String),

    #[error("Search service is blocking requests: {0}")]
    Blocked(String),
}

impl FetchError {
    /// Anti-bot or throttling answer from the remote service.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

/// Searches for replay posts around a match.
#[async_trait::async_trait]
pub trait GoalSearch: Send + Sync {
    /// Returns media posts matching `query`, created in the window around
    /// `match_time` when it is known.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        match_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<SearchResult>, FetchError>;
}
