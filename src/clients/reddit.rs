use super::block_detect::{BodyClass, block_reason, classify_body};
use super::{FetchError, GoalSearch, RateLimiter};
use crate::config::RedditConfig;
use crate::constants::search::{WINDOW_AFTER_HOURS, WINDOW_BEFORE_HOURS};
use crate::models::SearchResult;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct SearchListing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RedditPost {
    title: String,
    url: String,
    permalink: String,
    link_flair_text: Option<String>,
    created_utc: f64,
    score: i64,
    secure_media: Option<SecureMedia>,
}

#[derive(Debug, Deserialize)]
struct SecureMedia {
    reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Deserialize)]
struct RedditVideo {
    #[serde(default)]
    fallback_url: String,
}

impl RedditPost {
    fn into_search_result(self, base_url: &str) -> SearchResult {
        let media_url = self
            .secure_media
            .and_then(|m| m.reddit_video)
            .map(|v| v.fallback_url)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.url);

        #[allow(clippy::cast_possible_truncation)]
        let created_at = DateTime::from_timestamp(self.created_utc as i64, 0).unwrap_or_default();

        SearchResult {
            title: self.title,
            media_url,
            post_url: format!("{}{}", base_url.trim_end_matches('/'), self.permalink),
            flair: self.link_flair_text.unwrap_or_default(),
            created_at,
            popularity: self.score,
        }
    }
}

/// Client for the public subreddit search endpoint. No authentication; requests
/// are paced by an adaptive [`RateLimiter`].
pub struct RedditClient {
    client: Client,
    base_url: String,
    subreddit: String,
    flair: String,
    limiter: RateLimiter,
}

impl RedditClient {
    pub fn new(config: &RedditConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(u64::from(
                config.request_timeout_seconds,
            )))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self::with_client(client, config))
    }

    #[must_use]
    pub fn with_client(client: Client, config: &RedditConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            subreddit: config.subreddit.clone(),
            flair: config.flair.clone(),
            limiter: RateLimiter::new(config.requests_per_minute, config.user_agents.clone()),
        }
    }

    #[must_use]
    pub const fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Search URL restricted to the subreddit, the media flair and, when the
    /// kickoff is known, posts created from a day before to two days after it.
    pub fn search_url(
        &self,
        query: &str,
        limit: usize,
        match_time: Option<DateTime<Utc>>,
    ) -> Result<Url, FetchError> {
        let base = format!(
            "{}/r/{}/search.json",
            self.base_url.trim_end_matches('/'),
            self.subreddit
        );
        let mut url = Url::parse(&base)
            .map_err(|e| FetchError::Network(format!("Invalid search URL {base}: {e}")))?;

        let mut q = format!("{query} flair:{}", self.flair);
        if let Some(kickoff) = match_time {
            let start = (kickoff - Duration::hours(WINDOW_BEFORE_HOURS)).timestamp();
            let end = (kickoff + Duration::hours(WINDOW_AFTER_HOURS)).timestamp();
            q.push_str(&format!(" timestamp:{start}..{end}"));
        }

        url.query_pairs_mut()
            .append_pair("q", &q)
            .append_pair("restrict_sr", "on")
            .append_pair("sort", "relevance")
            .append_pair("limit", &limit.to_string());

        Ok(url)
    }

    /// Maps a response to results or an error. 429 and 403 are blocks; other
    /// failure statuses are blocks only when the body looks like a block page.
    fn classify_response(
        &self,
        status: StatusCode,
        body: &str,
    ) -> Result<Vec<SearchResult>, FetchError> {
        if matches!(status, StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN) {
            self.limiter.record_block();
            return Err(FetchError::Blocked(format!("status {status}")));
        }

        if !status.is_success() {
            if let Some(reason) = block_reason(body) {
                self.limiter.record_block();
                return Err(FetchError::Blocked(reason.to_string()));
            }
            return Err(FetchError::Network(format!("status {status}")));
        }

        self.parse_body(body)
    }

    /// Turns a response body into media-flaired results, recording blocks.
    fn parse_body(&self, body: &str) -> Result<Vec<SearchResult>, FetchError> {
        match classify_body::<SearchListing>(body) {
            BodyClass::Parsed(listing) => Ok(listing
                .data
                .children
                .into_iter()
                .map(|child| child.data.into_search_result(&self.base_url))
                .filter(|result| result.flair == self.flair)
                .collect()),
            BodyClass::Blocked(reason) => {
                self.limiter.record_block();
                Err(FetchError::Blocked(reason.to_string()))
            }
            BodyClass::Malformed(e) => Err(FetchError::Parse(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl GoalSearch for RedditClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        match_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<SearchResult>, FetchError> {
        let url = self.search_url(query, limit, match_time)?;
        self.limiter.wait().await;

        debug!(%url, "Searching for replay posts");

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, self.limiter.next_user_agent())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response: {e}")))?;

        self.classify_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client() -> RedditClient {
        RedditClient::with_client(Client::new(), &RedditConfig::default())
    }

    const LISTING: &str = r#"{
        "kind": "Listing",
        "data": {
            "children": [
                {"data": {
                    "title": "Wolves [3] - 0 West Ham - Mateus Mane 41'",
                    "url": "https://v.redd.it/abc123",
                    "permalink": "/r/soccer/comments/abc123/wolves_3_0_west_ham/",
                    "link_flair_text": "Media",
                    "created_utc": 1736004000.0,
                    "score": 812,
                    "secure_media": {"reddit_video": {"fallback_url": "https://v.redd.it/abc123/DASH_720.mp4"}}
                }},
                {"data": {
                    "title": "Wolves 3-0 West Ham post match thread",
                    "url": "https://www.reddit.com/r/soccer/comments/def456/",
                    "permalink": "/r/soccer/comments/def456/pmt/",
                    "link_flair_text": "Post Match Thread",
                    "created_utc": 1736010000.0,
                    "score": 2400
                }},
                {"data": {
                    "title": "Wolves [2] - 0 West Ham - Cunha 30'",
                    "url": "https://streamable.com/xyz",
                    "permalink": "/r/soccer/comments/ghi789/cunha/",
                    "link_flair_text": "Media",
                    "created_utc": 1736003000.0,
                    "score": 40,
                    "secure_media": null
                }}
            ]
        }
    }"#;

    #[test]
    fn test_search_url_includes_filters() {
        let kickoff = Utc.with_ymd_and_hms(2025, 1, 4, 15, 0, 0).unwrap();
        let url = client()
            .search_url("Wolves West Ham 41'", 15, Some(kickoff))
            .unwrap();

        assert_eq!(url.path(), "/r/soccer/search.json");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        let start = (kickoff - Duration::hours(24)).timestamp();
        let end = (kickoff + Duration::hours(48)).timestamp();
        assert_eq!(
            pairs["q"],
            format!("Wolves West Ham 41' flair:Media timestamp:{start}..{end}")
        );
        assert_eq!(pairs["restrict_sr"], "on");
        assert_eq!(pairs["sort"], "relevance");
        assert_eq!(pairs["limit"], "15");
    }

    #[test]
    fn test_search_url_without_kickoff_has_no_timestamp() {
        let url = client().search_url("Wolves 41'", 5, None).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["q"], "Wolves 41' flair:Media");
    }

    #[test]
    fn test_parse_keeps_media_flair_and_prefers_video() {
        let results = client().parse_body(LISTING).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].media_url, "https://v.redd.it/abc123/DASH_720.mp4");
        assert_eq!(
            results[0].post_url,
            "https://www.reddit.com/r/soccer/comments/abc123/wolves_3_0_west_ham/"
        );
        assert_eq!(results[0].popularity, 812);
        assert_eq!(results[0].created_at.timestamp(), 1_736_004_000);
        assert_eq!(results[1].media_url, "https://streamable.com/xyz");
    }

    #[test]
    fn test_parse_block_page_records_block() {
        let reddit = client();
        let err = reddit
            .parse_body("<html><body>Our CAPTCHA thinks you are a robot</body></html>")
            .unwrap_err();

        assert!(err.is_blocked());
        assert_eq!(reddit.rate_limiter().blocked_count(), 1);
    }

    #[test]
    fn test_throttle_statuses_are_blocks() {
        let reddit = client();

        let err = reddit
            .classify_response(StatusCode::TOO_MANY_REQUESTS, "")
            .unwrap_err();
        assert!(err.is_blocked());
        assert_eq!(reddit.rate_limiter().blocked_count(), 1);

        let err = reddit
            .classify_response(StatusCode::FORBIDDEN, LISTING)
            .unwrap_err();
        assert!(err.is_blocked());
        assert_eq!(reddit.rate_limiter().blocked_count(), 2);
    }

    #[test]
    fn test_server_error_with_captcha_page_is_block() {
        let reddit = client();
        let err = reddit
            .classify_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "<html><body>Please complete the CAPTCHA</body></html>",
            )
            .unwrap_err();

        assert!(err.is_blocked());
        assert_eq!(reddit.rate_limiter().blocked_count(), 1);
    }

    #[test]
    fn test_plain_server_error_is_network() {
        let reddit = client();
        let err = reddit
            .classify_response(StatusCode::BAD_GATEWAY, "upstream connect error")
            .unwrap_err();

        assert!(matches!(err, FetchError::Network(ref msg) if msg.contains("502")));
        assert_eq!(reddit.rate_limiter().blocked_count(), 0);
    }

    #[test]
    fn test_success_status_parses_listing() {
        let reddit = client();
        let results = reddit.classify_response(StatusCode::OK, LISTING).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(reddit.rate_limiter().blocked_count(), 0);
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let reddit = client();
        let err = reddit.parse_body("{\"data\": 12").unwrap_err();

        assert!(matches!(err, FetchError::Parse(_)));
        assert_eq!(reddit.rate_limiter().blocked_count(), 0);
    }
}
