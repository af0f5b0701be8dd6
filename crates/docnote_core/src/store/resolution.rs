//! Resolution flags keyed by comment id.
//!
//! # Invariants
//! - Persisted independently of the comment collection under
//!   `RESOLVED_STORAGE_KEY` as a JSON object of `id -> bool`.
//! - A failed load yields an empty state; in-memory state stays authoritative.

use crate::model::comment::CommentId;
use crate::repo::kv_repo::{KvStore, RepoError};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key of the serialized resolution map.
pub const RESOLVED_STORAGE_KEY: &str = "resolvedReplies";

/// Failure while persisting resolution flags.
#[derive(Debug)]
pub enum ResolutionError {
    Serialize(serde_json::Error),
    Repo(RepoError),
}

impl Display for ResolutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "failed to encode resolution state: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResolutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ResolutionError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

impl From<RepoError> for ResolutionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Map of comment id to resolved flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionState {
    entries: BTreeMap<CommentId, bool>,
}

impl ResolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self, comment_id: &str) -> bool {
        self.entries.get(comment_id).copied().unwrap_or(false)
    }

    /// Sets the resolved flag. Returns `false` when it was already set.
    pub fn mark(&mut self, comment_id: impl Into<CommentId>) -> bool {
        let previous = self.entries.insert(comment_id.into(), true);
        previous != Some(true)
    }

    /// Ids whose flag is `true`, sorted.
    pub fn resolved_ids(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, resolved)| **resolved)
            .map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, ResolutionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Loads persisted flags, falling back to an empty state on any failure.
    pub fn load(kv: &impl KvStore) -> Self {
        let raw = match kv.get(RESOLVED_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(err) => {
                error!(
                    "event=resolution_load module=store status=error error_code=kv_read_failed error={}",
                    err
                );
                return Self::default();
            }
        };

        match Self::from_json(&raw) {
            Ok(state) => {
                info!(
                    "event=resolution_load module=store status=ok entries={}",
                    state.len()
                );
                state
            }
            Err(err) => {
                warn!(
                    "event=resolution_load module=store status=error error_code=decode_failed error={}",
                    err
                );
                Self::default()
            }
        }
    }

    /// Writes the full map under `RESOLVED_STORAGE_KEY`.
    pub fn save(&self, kv: &impl KvStore) -> Result<(), ResolutionError> {
        let raw = self.to_json()?;
        kv.put(RESOLVED_STORAGE_KEY, &raw)?;
        Ok(())
    }
}
