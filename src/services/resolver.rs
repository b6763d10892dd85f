//! Cache-first goal replay lookup.
//!
//! A lookup checks the [`GoalLinkCache`] and only searches on a miss. Each search
//! attempt tries the most specific query first (both teams and the minute) and
//! falls back to the scoring team and the minute, pooling both result sets for a
//! final scoring pass. Clean "nothing found" outcomes are cached as markers; hard
//! failures are not cached so a later call can try again.

use crate::cache::{CacheError, GoalLinkCache};
use crate::clients::{FetchError, GoalSearch};
use crate::config::Config;
use crate::constants::{resolver, search};
use crate::matcher::GoalMatcher;
use crate::models::{GoalInfo, GoalLink, GoalLinkKey, SearchResult};
use crate::services::pacing::{Pacer, TokioPacer};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Search(#[from] FetchError),

    #[error("Goal link lookup cancelled")]
    Cancelled,
}

impl ResolveError {
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Search(e) if e.is_blocked())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_network_errors: bool,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub search_limit: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_attempts: resolver::MAX_ATTEMPTS,
            retry_base_delay: Duration::from_secs(resolver::RETRY_BASE_DELAY_SECONDS),
            retry_network_errors: false,
            batch_size: resolver::BATCH_SIZE,
            batch_delay: Duration::from_secs(resolver::BATCH_DELAY_SECONDS),
            search_limit: search::DEFAULT_LIMIT,
        }
    }
}

impl ResolverSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.resolver.max_attempts.max(1),
            retry_base_delay: Duration::from_secs(config.resolver.retry_base_delay_seconds),
            retry_network_errors: config.resolver.retry_network_errors,
            batch_size: config.resolver.batch_size.max(1),
            batch_delay: Duration::from_secs(config.resolver.batch_delay_seconds),
            search_limit: config.reddit.search_limit,
        }
    }
}

pub struct GoalLinkResolver {
    cache: Arc<GoalLinkCache>,
    search: Arc<dyn GoalSearch>,
    pacer: Arc<dyn Pacer>,
    settings: ResolverSettings,
}

impl GoalLinkResolver {
    #[must_use]
    pub fn new(
        cache: Arc<GoalLinkCache>,
        search: Arc<dyn GoalSearch>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            cache,
            search,
            pacer: Arc::new(TokioPacer),
            settings,
        }
    }

    #[must_use]
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<GoalLinkCache> {
        &self.cache
    }

    #[must_use]
    pub const fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Cached replay link for rendering. Never searches; markers read as absent.
    #[must_use]
    pub fn link_for(&self, key: GoalLinkKey) -> Option<GoalLink> {
        self.cache.get(key).filter(|link| !link.is_not_found())
    }

    #[must_use]
    pub fn links_for_match(&self, match_id: i64) -> Vec<GoalLink> {
        self.cache.get_all(match_id)
    }

    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear()
    }

    /// Replay link for `goal`, searching only when the cache has no live entry.
    ///
    /// `Ok(None)` means no replay was found (now or on an earlier search).
    pub async fn resolve(
        &self,
        goal: &GoalInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<GoalLink>, ResolveError> {
        let key = goal.key();

        if let Some(link) = self.cache.get(key) {
            if link.is_not_found() {
                debug!(%key, "Goal previously searched without result");
                return Ok(None);
            }
            return Ok(Some(link));
        }

        match self.search_with_retry(goal, cancel).await? {
            Some(result) => {
                let link = GoalLink::found(goal, &result);
                info!(%key, url = %link.url, "Found goal replay");
                if let Err(e) = self.cache.set(link.clone()) {
                    warn!(%key, error = %e, "Failed to persist goal link");
                }
                Ok(Some(link))
            }
            None => {
                debug!(%key, "No goal replay found");
                if let Err(e) = self.cache.set_not_found(goal.match_id, goal.minute) {
                    warn!(%key, error = %e, "Failed to persist goal link marker");
                }
                Ok(None)
            }
        }
    }

    /// [`resolve`](Self::resolve) bounded by `limit`.
    pub async fn resolve_within(
        &self,
        goal: &GoalInfo,
        limit: Duration,
    ) -> Result<Option<GoalLink>, ResolveError> {
        let cancel = CancellationToken::new();
        let deadline = cancel.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            deadline.cancel();
        });

        let result = self.resolve(goal, &cancel).await;
        timer.abort();
        result
    }

    /// Resolves many goals with batch pacing. Only found links are returned; goals
    /// without a replay, or whose lookup failed, are absent from the map.
    pub async fn resolve_many(
        &self,
        goals: &[GoalInfo],
        cancel: &CancellationToken,
    ) -> HashMap<GoalLinkKey, GoalLink> {
        let mut results = HashMap::new();
        let mut seen = HashSet::new();
        let mut uncached = Vec::new();

        for goal in goals {
            let key = goal.key();
            if !seen.insert(key) {
                continue;
            }

            if let Some(link) = self.cache.get(key) {
                if !link.is_not_found() {
                    results.insert(key, link);
                }
                continue;
            }

            uncached.push(goal);
        }

        let cached = results.len();
        let (mut found, mut negative, mut failed) = (0usize, 0usize, 0usize);

        'batches: for (index, batch) in uncached.chunks(self.settings.batch_size).enumerate() {
            if index > 0 && self.pause(self.settings.batch_delay, cancel).await.is_err() {
                break;
            }

            for goal in batch {
                match self.resolve(goal, cancel).await {
                    Ok(Some(link)) => {
                        found += 1;
                        results.insert(goal.key(), link);
                    }
                    Ok(None) => negative += 1,
                    Err(ResolveError::Cancelled) => break 'batches,
                    Err(e) => {
                        failed += 1;
                        warn!(key = %goal.key(), error = %e, "Goal replay lookup failed");
                    }
                }
            }
        }

        info!(
            event = "goal_links_batch_finished",
            requested = goals.len(),
            cached = cached,
            searched = uncached.len(),
            found = found,
            not_found = negative,
            failed = failed,
            "Goal replay batch complete"
        );

        results
    }

    async fn search_with_retry(
        &self,
        goal: &GoalInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<SearchResult>, ResolveError> {
        let mut attempts = 0;

        loop {
            if attempts > 0 {
                self.pause(self.retry_delay(attempts), cancel).await?;
            }

            match until_cancelled(self.search_once(goal), cancel).await? {
                Ok(found) => return Ok(found),
                Err(e) => {
                    attempts += 1;
                    if e.is_blocked() {
                        warn!(key = %goal.key(), error = %e, "Search blocked, giving up on goal");
                        return Err(e.into());
                    }
                    if !self.should_retry(&e, attempts) {
                        return Err(e.into());
                    }
                    warn!(key = %goal.key(), attempt = attempts, error = %e, "Search failed, retrying");
                }
            }
        }
    }

    /// Linear backoff, saturating for oversized configured delays.
    fn retry_delay(&self, attempts: u32) -> Duration {
        self.settings
            .retry_base_delay
            .checked_mul(attempts)
            .unwrap_or(Duration::MAX)
    }

    fn should_retry(&self, error: &FetchError, attempts: u32) -> bool {
        self.settings.retry_network_errors
            && matches!(error, FetchError::Network(_))
            && attempts < self.settings.max_attempts
    }

    async fn search_once(&self, goal: &GoalInfo) -> Result<Option<SearchResult>, FetchError> {
        let matcher = GoalMatcher::new(goal);
        let limit = self.settings.search_limit;

        let both_teams = format!("{} {} {}'", goal.home_team, goal.away_team, goal.minute);
        let first = self
            .search
            .search(&both_teams, limit, goal.match_time)
            .await?;
        debug!(query = %both_teams, results = first.len(), "Search returned");

        if let Some(best) = matcher.best(&first) {
            debug!(confidence = ?matcher.confidence(best), title = %best.title, "Matched on first query");
            return Ok(Some(best.clone()));
        }

        let scoring_team = format!("{} {}'", goal.scoring_team(), goal.minute);
        let second = self
            .search
            .search(&scoring_team, limit, goal.match_time)
            .await?;
        debug!(query = %scoring_team, results = second.len(), "Search returned");

        let mut seen_urls = HashSet::new();
        let pooled: Vec<SearchResult> = first
            .into_iter()
            .chain(second)
            .filter(|result| seen_urls.insert(result.media_url.clone()))
            .collect();

        let best = matcher.best(&pooled);
        if let Some(best) = best {
            debug!(confidence = ?matcher.confidence(best), title = %best.title, "Matched on pooled results");
        }
        Ok(best.cloned())
    }

    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), ResolveError> {
        until_cancelled(self.pacer.pause(duration), cancel).await
    }
}

async fn until_cancelled<F: Future>(
    future: F,
    cancel: &CancellationToken,
) -> Result<F::Output, ResolveError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ResolveError::Cancelled),
        output = future => Ok(output),
    }
}
