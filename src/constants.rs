pub mod cache {

    pub const FILE_NAME: &str = "goal_links.json";

    pub const LINK_TTL_HOURS: i64 = 7 * 24;

    /// Replay posts can surface after a first failed search.
    pub const NOT_FOUND_TTL_HOURS: i64 = 24;
}

pub mod search {

    /// Posts older than kickoff minus this are ignored.
    pub const WINDOW_BEFORE_HOURS: i64 = 24;

    pub const WINDOW_AFTER_HOURS: i64 = 48;

    pub const CLOSE_WINDOW_BEFORE_HOURS: i64 = 6;

    pub const CLOSE_WINDOW_AFTER_HOURS: i64 = 12;

    pub const DEFAULT_LIMIT: usize = 15;

    pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 5;

    pub const BLOCK_BACKOFF_MINUTES: u64 = 10;
}

pub mod scoring {

    pub const MIN_ACCEPTED_SCORE: u32 = 20;

    pub const CLOSE_TIME_BONUS: u32 = 5;

    pub const TEAM_MATCH: u32 = 10;

    pub const MINUTE_MATCH: u32 = 25;

    pub const SCORER_MATCH: u32 = 15;

    pub const MAX_POPULARITY_BONUS: u32 = 5;
}

pub mod resolver {

    pub const MAX_ATTEMPTS: u32 = 2;

    pub const RETRY_BASE_DELAY_SECONDS: u64 = 60;

    pub const BATCH_SIZE: usize = 3;

    pub const BATCH_DELAY_SECONDS: u64 = 5;

    pub const RESOLVE_TIMEOUT_SECONDS: u64 = 180;
}
