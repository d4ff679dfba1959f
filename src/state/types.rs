//! Persisted queue identities.
//!
//! The only state that survives a reconciliation run is the identity the
//! provider assigned to each queue. Caching it keeps the comparison key
//! stable between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::{Result, StateError};
use crate::queue::{IdentityUpdate, QueueTask};

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// Number of run history entries kept.
const MAX_HISTORY: usize = 50;

/// Identities of every queue reconciled for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityState {
    /// State format version.
    pub version: String,
    /// Project name.
    pub project: String,
    /// Known identities, keyed by queue name.
    #[serde(default)]
    pub queues: BTreeMap<String, QueueIdentity>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
    /// Recent runs.
    #[serde(default)]
    pub history: Vec<RunHistoryEntry>,
}

/// Provider identity of one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueIdentity {
    /// Queue ARN.
    pub arn: String,
    /// Queue URL.
    #[serde(default)]
    pub url: Option<String>,
    /// When the identity was last confirmed.
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistoryEntry {
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Target name.
    pub target: String,
    /// Queues that were created or had pending changes.
    pub queues: Vec<String>,
    /// Whether the run succeeded.
    pub success: bool,
    /// Error message of a failed run.
    #[serde(default)]
    pub error: Option<String>,
}

impl IdentityState {
    /// Creates an empty state.
    #[must_use]
    pub fn new(project: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            project: project.to_string(),
            queues: BTreeMap::new(),
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Fails if the state was written by an incompatible format.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::VersionMismatch`].
    pub fn check_version(&self) -> Result<()> {
        if self.version != STATE_VERSION {
            return Err(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: self.version.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Cached ARN of a queue.
    #[must_use]
    pub fn arn_for(&self, name: &str) -> Option<&str> {
        self.queues.get(name).map(|identity| identity.arn.as_str())
    }

    /// Records a discovered identity.
    ///
    /// Returns true if the stored identity changed.
    pub fn record(&mut self, update: &IdentityUpdate) -> bool {
        let now = Utc::now();
        if let Some(existing) = self.queues.get_mut(&update.name) {
            let url = update.url.clone().or_else(|| existing.url.clone());
            if existing.arn == update.arn && existing.url == url {
                return false;
            }
            if existing.arn != update.arn {
                warn!(
                    "Stored ARN of SQS queue {} changed from {} to {}",
                    update.name, existing.arn, update.arn
                );
            }
            existing.arn.clone_from(&update.arn);
            existing.url = url;
            existing.updated_at = now;
        } else {
            self.queues.insert(
                update.name.clone(),
                QueueIdentity {
                    arn: update.arn.clone(),
                    url: update.url.clone(),
                    updated_at: now,
                },
            );
        }
        self.last_updated = now;
        true
    }

    /// Copies cached ARNs into desired tasks that have none.
    pub fn seed(&self, tasks: &mut [QueueTask]) {
        for task in tasks {
            if task.arn.is_some() {
                continue;
            }
            if let Some(arn) = task.declared_name().and_then(|name| self.arn_for(name)) {
                task.arn = Some(arn.to_string());
            }
        }
    }

    /// Removes a queue's identity.
    pub fn forget(&mut self, name: &str) -> Option<QueueIdentity> {
        let removed = self.queues.remove(name);
        if removed.is_some() {
            self.last_updated = Utc::now();
        }
        removed
    }

    /// Adds a history entry, dropping the oldest beyond the cap.
    pub fn add_history(&mut self, entry: RunHistoryEntry) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(entry);
    }
}

impl RunHistoryEntry {
    /// Creates a successful history entry.
    #[must_use]
    pub fn new(target: &str, queues: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            target: target.to_string(),
            queues,
            success: true,
            error: None,
        }
    }

    /// Creates a failed history entry.
    #[must_use]
    pub fn failed(target: &str, queues: Vec<String>, error: &str) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::new(target, queues)
        }
    }
}
