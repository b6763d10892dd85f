pub mod cache;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod matcher;
pub mod models;
pub mod services;

use std::path::Path;
use std::sync::Arc;

pub use cli::Cli;
use cli::Commands;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use cache::{GoalLinkCache, JsonFileStorage};
use clients::RedditClient;
pub use config::Config;
pub use models::{GoalInfo, GoalLink, GoalLinkKey};
pub use services::{GoalLinkResolver, ResolveError, ResolverSettings};

/// Config from `--config` when given, otherwise from the default search paths.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

pub async fn run(args: Cli, config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    // stdout carries command output
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    match args.command {
        Commands::Find {
            match_id,
            home,
            away,
            minute,
            scorer,
            away_goal,
            kickoff,
        } => {
            let goal = GoalInfo {
                match_id,
                home_team: home,
                away_team: away,
                scorer_name: scorer,
                minute,
                is_home_team: !away_goal,
                match_time: kickoff,
            };
            cli::cmd_find(&config, goal).await
        }

        Commands::Batch { path } => cli::cmd_batch(&config, &path).await,

        Commands::Lookup { match_id, minute } => cli::cmd_lookup(&config, match_id, minute),

        Commands::Links { match_id } => cli::cmd_links(&config, match_id),

        Commands::Clean => cli::cmd_clean(&config),

        Commands::Clear => cli::cmd_clear(&config),

        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("Created goalclip.toml with default settings");
            } else {
                println!("goalclip.toml already exists");
            }
            Ok(())
        }
    }
}

/// Opens the on-disk link cache, dropping expired entries.
pub fn open_cache(config: &Config) -> anyhow::Result<GoalLinkCache> {
    let path = config.cache_path()?;
    info!(path = %path.display(), "Opening goal link cache");
    Ok(GoalLinkCache::open(
        JsonFileStorage::new(path),
        config.cache.ttl(),
    ))
}

/// Wires the cache, the subreddit search client and the resolver settings.
pub fn build_resolver(config: &Config) -> anyhow::Result<GoalLinkResolver> {
    let cache = Arc::new(open_cache(config)?);
    let search = Arc::new(RedditClient::new(&config.reddit)?);

    Ok(GoalLinkResolver::new(
        cache,
        search,
        ResolverSettings::from_config(config),
    ))
}
