use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved `url` value for a goal that was searched but has no replay post.
pub const NOT_FOUND_MARKER: &str = "__NOT_FOUND__";

/// A single goal event to find a replay for. Supplied by the match data layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalInfo {
    pub match_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub scorer_name: Option<String>,
    pub minute: u32,
    pub is_home_team: bool,
    /// Kickoff time. `None` disables the time-window filters.
    pub match_time: Option<DateTime<Utc>>,
}

impl GoalInfo {
    #[must_use]
    pub const fn key(&self) -> GoalLinkKey {
        GoalLinkKey::new(self.match_id, self.minute)
    }

    /// The team credited with the goal.
    #[must_use]
    pub fn scoring_team(&self) -> &str {
        if self.is_home_team {
            &self.home_team
        } else {
            &self.away_team
        }
    }
}

/// Cache identity of a goal. Two goals in the same match and minute share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GoalLinkKey {
    pub match_id: i64,
    pub minute: u32,
}

impl GoalLinkKey {
    #[must_use]
    pub const fn new(match_id: i64, minute: u32) -> Self {
        Self { match_id, minute }
    }
}

impl std::fmt::Display for GoalLinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.match_id, self.minute)
    }
}

/// A resolved replay link, or a "not found" marker sharing the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalLink {
    pub match_id: i64,
    pub minute: u32,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub post_url: String,
    pub fetched_at: DateTime<Utc>,
}

impl GoalLink {
    #[must_use]
    pub fn found(goal: &GoalInfo, result: &SearchResult) -> Self {
        Self {
            match_id: goal.match_id,
            minute: goal.minute,
            url: result.media_url.clone(),
            title: result.title.clone(),
            post_url: result.post_url.clone(),
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn not_found(match_id: i64, minute: u32) -> Self {
        Self {
            match_id,
            minute,
            url: NOT_FOUND_MARKER.to_string(),
            title: String::new(),
            post_url: String::new(),
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn key(&self) -> GoalLinkKey {
        GoalLinkKey::new(self.match_id, self.minute)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.url == NOT_FOUND_MARKER
    }
}

/// Returns true if the entry is a cached "not found" marker.
#[must_use]
pub fn is_not_found(link: Option<&GoalLink>) -> bool {
    link.is_some_and(GoalLink::is_not_found)
}

/// A candidate post returned by a search. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    /// Direct video/GIF link when available, otherwise the post's link target.
    pub media_url: String,
    pub post_url: String,
    pub flair: String,
    pub created_at: DateTime<Utc>,
    pub popularity: i64,
}
