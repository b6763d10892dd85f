//! CLI module - Command-line interface for goalclip
//!
//! Operator commands for looking up goal replays and managing the link cache.

mod commands;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// goalclip - Goal replay link finder
/// Finds replay clips for football goals on r/soccer and caches the result
#[derive(Parser)]
#[command(name = "goalclip")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search locations
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find the replay for a single goal
    #[command(alias = "f")]
    Find {
        #[arg(long)]
        match_id: i64,
        /// Home team name
        #[arg(long)]
        home: String,
        /// Away team name
        #[arg(long)]
        away: String,
        #[arg(long)]
        minute: u32,
        /// Goal scorer, improves matching
        #[arg(long)]
        scorer: Option<String>,
        /// The away team scored
        #[arg(long)]
        away_goal: bool,
        /// Kickoff time (RFC 3339), restricts the search window
        #[arg(long)]
        kickoff: Option<DateTime<Utc>>,
    },

    /// Find replays for every goal in a JSON file
    Batch {
        /// JSON array of goals
        path: PathBuf,
    },

    /// Show the cached replay for a goal without searching
    #[command(alias = "l")]
    Lookup { match_id: i64, minute: u32 },

    /// List cached replays for a match
    #[command(alias = "ls")]
    Links { match_id: i64 },

    /// Remove expired cache entries
    Clean,

    /// Remove every cache entry
    Clear,

    /// Create default config file
    Init,
}

pub use commands::*;
