//! Durable backends for the goal link cache.
//!
//! The cache rewrites the whole entry set on every mutation, so a backend only
//! needs to load and replace a snapshot.

use super::CacheError;
use crate::models::GoalLink;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait LinkStorage: Send + Sync {
    /// Reads every persisted entry. A missing store is an empty one.
    fn load(&self) -> Result<Vec<GoalLink>, CacheError>;

    /// Replaces the persisted entries with `links`.
    fn save(&self, links: &[GoalLink]) -> Result<(), CacheError>;
}

/// JSON array on disk, rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LinkStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<GoalLink>, CacheError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CacheError::Persistence {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        serde_json::from_str(&content).map_err(|e| CacheError::Corrupt {
            path: self.path.clone(),
            source: e,
        })
    }

    fn save(&self, links: &[GoalLink]) -> Result<(), CacheError> {
        let content = serde_json::to_string_pretty(links).map_err(CacheError::Serialize)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Persistence {
                path: self.path.clone(),
                source: e,
            })?;
        }

        std::fs::write(&self.path, content).map_err(|e| CacheError::Persistence {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// In-process backend for tests and embedders that do not want a file.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    links: Mutex<Vec<GoalLink>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_links(links: Vec<GoalLink>) -> Self {
        Self {
            links: Mutex::new(links),
        }
    }

    /// Snapshot of what was last saved.
    #[must_use]
    pub fn saved(&self) -> Vec<GoalLink> {
        self.links
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl LinkStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<GoalLink>, CacheError> {
        Ok(self.saved())
    }

    fn save(&self, links: &[GoalLink]) -> Result<(), CacheError> {
        let mut guard = self
            .links
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = links.to_vec();
        Ok(())
    }
}
