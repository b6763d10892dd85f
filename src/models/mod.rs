pub mod goal;

pub use goal::{GoalInfo, GoalLink, GoalLinkKey, NOT_FOUND_MARKER, SearchResult, is_not_found};
