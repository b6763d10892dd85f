//! Loose matching of replay post titles against a goal.
//!
//! Typical titles:
//!   - "Wolves [3] - 0 West Ham - Mateus Mane 41'"
//!   - "Manchester United [2] - 1 Liverpool - Marcus Rashford 67'"
//!   - "Barcelona 0 - [1] Real Madrid - Vinicius Jr 90+2'"

use crate::constants::scoring::{
    CLOSE_TIME_BONUS, MAX_POPULARITY_BONUS, MIN_ACCEPTED_SCORE, MINUTE_MATCH, SCORER_MATCH,
    TEAM_MATCH,
};
use crate::constants::search::{
    CLOSE_WINDOW_AFTER_HOURS, CLOSE_WINDOW_BEFORE_HOURS, WINDOW_AFTER_HOURS, WINDOW_BEFORE_HOURS,
};
use crate::models::{GoalInfo, SearchResult};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;

const TEAM_SUFFIXES: &[&str] = &[" fc", " cf", " sc", " afc", " united", " city"];

/// Coarse match quality, for diagnostics only. Selection uses the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchConfidence {
    None,
    Low,
    Medium,
    High,
}

/// Lowercases, strips common club suffixes and drops punctuation.
#[must_use]
pub fn normalize_team_name(name: &str) -> String {
    let mut norm = name.trim().to_lowercase();
    for suffix in TEAM_SUFFIXES {
        if let Some(stripped) = norm.strip_suffix(suffix) {
            norm = stripped.to_string();
        }
    }

    let cleaned: String = norm
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercases and keeps letters only.
#[must_use]
pub fn normalize_player_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole name as a substring, or any word longer than three characters of a
/// multi-word name.
fn contains_team_name(title_lower: &str, team_norm: &str) -> bool {
    if team_norm.is_empty() {
        return false;
    }
    if title_lower.contains(team_norm) {
        return true;
    }

    let words: Vec<&str> = team_norm.split_whitespace().collect();
    words.len() > 1
        && words
            .iter()
            .any(|w| w.chars().count() > 3 && title_lower.contains(w))
}

/// Full name, or the last name when it is longer than two characters.
fn contains_player_name(title_lower: &str, name_norm: &str) -> bool {
    if name_norm.is_empty() {
        return false;
    }
    if title_lower.contains(name_norm) {
        return true;
    }

    name_norm
        .split_whitespace()
        .last()
        .is_some_and(|last| last.chars().count() > 2 && title_lower.contains(last))
}

/// Matches `41`, `41'`, `41+2` and `41+2'` on word boundaries.
struct MinutePattern {
    regex: Option<Regex>,
    plain: String,
}

impl MinutePattern {
    fn new(minute: u32) -> Self {
        Self {
            regex: Regex::new(&format!(r"\b{minute}(\+\d+)?'?\b")).ok(),
            plain: minute.to_string(),
        }
    }

    fn is_match(&self, title: &str) -> bool {
        self.regex
            .as_ref()
            .map_or_else(|| title.contains(&self.plain), |re| re.is_match(title))
    }
}

/// A goal prepared for scoring many candidates.
pub struct GoalMatcher {
    home: String,
    away: String,
    scorer: Option<String>,
    minute: MinutePattern,
    match_time: Option<DateTime<Utc>>,
}

impl GoalMatcher {
    #[must_use]
    pub fn new(goal: &GoalInfo) -> Self {
        Self {
            home: normalize_team_name(&goal.home_team),
            away: normalize_team_name(&goal.away_team),
            scorer: goal
                .scorer_name
                .as_deref()
                .map(normalize_player_name)
                .filter(|s| !s.is_empty()),
            minute: MinutePattern::new(goal.minute),
            match_time: goal.match_time,
        }
    }

    /// Relevance score, or `None` when the candidate is excluded outright
    /// (outside the time window or naming neither team).
    #[must_use]
    pub fn score(&self, result: &SearchResult) -> Option<u32> {
        let mut score = 0;

        if let Some(match_time) = self.match_time {
            let created = result.created_at;
            if created < match_time - Duration::hours(WINDOW_BEFORE_HOURS)
                || created > match_time + Duration::hours(WINDOW_AFTER_HOURS)
            {
                return None;
            }

            if created > match_time - Duration::hours(CLOSE_WINDOW_BEFORE_HOURS)
                && created < match_time + Duration::hours(CLOSE_WINDOW_AFTER_HOURS)
            {
                score += CLOSE_TIME_BONUS;
            }
        }

        let title_lower = result.title.to_lowercase();
        let home_found = contains_team_name(&title_lower, &self.home);
        let away_found = contains_team_name(&title_lower, &self.away);
        if !home_found && !away_found {
            return None;
        }
        if home_found {
            score += TEAM_MATCH;
        }
        if away_found {
            score += TEAM_MATCH;
        }

        if self.minute.is_match(&result.title) {
            score += MINUTE_MATCH;
        }

        if let Some(ref scorer) = self.scorer
            && contains_player_name(&title_lower, scorer)
        {
            score += SCORER_MATCH;
        }

        Some(score + popularity_bonus(result.popularity))
    }

    /// Highest scoring candidate at or above the acceptance threshold. Ties keep
    /// the earlier candidate.
    #[must_use]
    pub fn best<'a>(&self, results: &'a [SearchResult]) -> Option<&'a SearchResult> {
        let mut best: Option<(&SearchResult, u32)> = None;

        for result in results {
            let Some(score) = self.score(result) else {
                continue;
            };
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((result, score));
            }
        }

        best.filter(|(_, score)| *score >= MIN_ACCEPTED_SCORE)
            .map(|(result, _)| result)
    }

    #[must_use]
    pub fn confidence(&self, result: &SearchResult) -> MatchConfidence {
        let title_lower = result.title.to_lowercase();
        let has_home = contains_team_name(&title_lower, &self.home);
        let has_away = contains_team_name(&title_lower, &self.away);
        let has_minute = self.minute.is_match(&result.title);

        match (has_home || has_away, has_home && has_away, has_minute) {
            (_, true, true) => MatchConfidence::High,
            (true, _, true) => MatchConfidence::Medium,
            (true, _, false) => MatchConfidence::Low,
            _ => MatchConfidence::None,
        }
    }
}

fn popularity_bonus(popularity: i64) -> u32 {
    let capped = (popularity / 100).clamp(0, i64::from(MAX_POPULARITY_BONUS));
    u32::try_from(capped).unwrap_or(0)
}

/// Best accepted candidate for `goal`, if any.
#[must_use]
pub fn find_best_match<'a>(results: &'a [SearchResult], goal: &GoalInfo) -> Option<&'a SearchResult> {
    if results.is_empty() {
        return None;
    }
    GoalMatcher::new(goal).best(results)
}

#[must_use]
pub fn calculate_confidence(result: &SearchResult, goal: &GoalInfo) -> MatchConfidence {
    GoalMatcher::new(goal).confidence(result)
}
