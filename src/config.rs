use crate::cache::CacheTtl;
use crate::constants::{cache, resolver, search};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub reddit: RedditConfig,

    pub resolver: ResolverConfig,

    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Overrides `<config dir>/goalclip/goal_links.json`.
    pub cache_path: Option<String>,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            cache_path: None,
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub base_url: String,

    pub subreddit: String,

    /// Only posts carrying exactly this flair are considered.
    pub flair: String,

    pub requests_per_minute: u32,

    pub request_timeout_seconds: u32,

    pub search_limit: usize,

    /// Client identities rotated per request.
    pub user_agents: Vec<String>,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            subreddit: "soccer".to_string(),
            flair: "Media".to_string(),
            requests_per_minute: search::DEFAULT_REQUESTS_PER_MINUTE,
            request_timeout_seconds: 10,
            search_limit: search::DEFAULT_LIMIT,
            user_agents: vec![crate::clients::rate_limit::DEFAULT_USER_AGENT.to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_attempts: u32,

    pub retry_base_delay_seconds: u64,

    /// Let network failures use the remaining attempts. Blocks and malformed
    /// responses never retry.
    pub retry_network_errors: bool,

    pub batch_size: usize,

    pub batch_delay_seconds: u64,

    /// Upper bound for a single interactive lookup.
    pub resolve_timeout_seconds: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: resolver::MAX_ATTEMPTS,
            retry_base_delay_seconds: resolver::RETRY_BASE_DELAY_SECONDS,
            retry_network_errors: false,
            batch_size: resolver::BATCH_SIZE,
            batch_delay_seconds: resolver::BATCH_DELAY_SECONDS,
            resolve_timeout_seconds: resolver::RESOLVE_TIMEOUT_SECONDS,
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub const fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub link_ttl_hours: u32,

    pub not_found_ttl_hours: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            link_ttl_hours: u32::try_from(cache::LINK_TTL_HOURS).unwrap_or(168),
            not_found_ttl_hours: u32::try_from(cache::NOT_FOUND_TTL_HOURS).unwrap_or(24),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> CacheTtl {
        CacheTtl {
            link: chrono::Duration::hours(i64::from(self.link_ttl_hours)),
            not_found: chrono::Duration::hours(i64::from(self.not_found_ttl_hours)),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::default_config_path()];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("goalclip").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".goalclip").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("goalclip.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Location of the goal link cache file.
    pub fn cache_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.general.cache_path {
            return Ok(PathBuf::from(path));
        }

        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(dir.join("goalclip").join(cache::FILE_NAME))
    }

    pub fn validate(&self) -> Result<()> {
        if self.reddit.requests_per_minute == 0 {
            anyhow::bail!("reddit.requests_per_minute must be > 0");
        }

        if self.reddit.search_limit == 0 {
            anyhow::bail!("reddit.search_limit must be > 0");
        }

        if self.reddit.user_agents.iter().all(|a| a.trim().is_empty()) {
            anyhow::bail!("reddit.user_agents needs at least one non-empty entry");
        }

        if self.resolver.max_attempts == 0 {
            anyhow::bail!("resolver.max_attempts must be > 0");
        }

        if self.resolver.batch_size == 0 {
            anyhow::bail!("resolver.batch_size must be > 0");
        }

        if self.cache.not_found_ttl_hours > self.cache.link_ttl_hours {
            anyhow::bail!("cache.not_found_ttl_hours cannot exceed cache.link_ttl_hours");
        }

        Ok(())
    }
}
