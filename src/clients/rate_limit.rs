//! Adaptive request pacing for the search client.
//!
//! Requests are spaced at least `60s / requests_per_minute` apart. After the remote
//! service blocks a request the spacing doubles until the backoff window passes.

use crate::constants::search::BLOCK_BACKOFF_MINUTES;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_USER_AGENT: &str = "goalclip:v0.1.0 (replay link finder)";

#[derive(Debug, Default)]
struct BlockState {
    count: u32,
    last_at: Option<Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    backoff_window: Duration,
    // Held across the pacing sleep so concurrent callers queue up.
    last_request: tokio::sync::Mutex<Option<Instant>>,
    blocks: Mutex<BlockState>,
    user_agents: Vec<String>,
    next_agent: AtomicUsize,
}

impl RateLimiter {
    #[must_use]
    pub fn new(requests_per_minute: u32, user_agents: Vec<String>) -> Self {
        let per_minute = requests_per_minute.max(1);
        Self {
            min_interval: Duration::from_secs(60) / per_minute,
            backoff_window: Duration::from_secs(BLOCK_BACKOFF_MINUTES * 60),
            last_request: tokio::sync::Mutex::new(None),
            blocks: Mutex::new(BlockState::default()),
            user_agents,
            next_agent: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn with_backoff_window(mut self, window: Duration) -> Self {
        self.backoff_window = window;
        self
    }

    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Spacing currently enforced: doubled while a recent block is inside the
    /// backoff window.
    #[must_use]
    pub fn current_interval(&self) -> Duration {
        let blocks = self.blocks.lock().unwrap_or_else(PoisonError::into_inner);
        let recently_blocked = blocks.count > 0
            && blocks
                .last_at
                .is_some_and(|at| at.elapsed() < self.backoff_window);

        if recently_blocked {
            self.min_interval * 2
        } else {
            self.min_interval
        }
    }

    /// Sleeps until the next request may be issued, then claims the slot.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        let interval = self.current_interval();

        if let Some(previous) = *last {
            let ready_at = previous + interval;
            if ready_at > Instant::now() {
                debug!(
                    wait_ms = u64::try_from((ready_at - Instant::now()).as_millis())
                        .unwrap_or(u64::MAX),
                    "Pacing search request"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }

    pub fn record_block(&self) {
        let mut blocks = self.blocks.lock().unwrap_or_else(PoisonError::into_inner);
        blocks.count += 1;
        blocks.last_at = Some(Instant::now());
        warn!(
            blocked_count = blocks.count,
            "Search service blocked a request, slowing down"
        );
    }

    #[must_use]
    pub fn blocked_count(&self) -> u32 {
        self.blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count
    }

    /// Rotates through the configured client identities.
    #[must_use]
    pub fn next_user_agent(&self) -> &str {
        if self.user_agents.is_empty() {
            return DEFAULT_USER_AGENT;
        }
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[index]
    }
}
