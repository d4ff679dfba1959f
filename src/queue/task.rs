//! Queue task definition.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::error::{Result, ValidationError};
use crate::resource::{SharedResource, StringResource};
use crate::terraform::Literal;

use super::render::TERRAFORM_RESOURCE_TYPE;

/// SQS default retention period (4 days).
pub const DEFAULT_MESSAGE_RETENTION_SECS: i32 = 345_600;

/// Name suffix SQS requires for FIFO queues.
pub const FIFO_SUFFIX: &str = ".fifo";

/// How the driver is allowed to treat a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Find, diff and render.
    #[default]
    Sync,
    /// Do nothing.
    Ignore,
    /// Like `Sync`, but skip the queue if the provider denies read access.
    WarnIfInsufficientAccess,
    /// The queue must exist and match; anything else is an error.
    ExistsAndValidates,
    /// The queue should exist; differences are only logged.
    ExistsAndWarnIfChanges,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sync => "sync",
            Self::Ignore => "ignore",
            Self::WarnIfInsufficientAccess => "warn_if_insufficient_access",
            Self::ExistsAndValidates => "exists_and_validates",
            Self::ExistsAndWarnIfChanges => "exists_and_warn_if_changes",
        };
        write!(f, "{s}")
    }
}

/// Desired or actual state of one SQS queue.
#[derive(Debug, Clone, Default)]
pub struct QueueTask {
    /// Queue name. Required for creation, immutable afterwards.
    pub name: Option<String>,
    /// Execution hint for the driver. Never discovered from the provider.
    pub lifecycle: Lifecycle,
    /// Provider-assigned ARN, the stable identity across runs.
    pub arn: Option<String>,
    /// Provider-assigned queue URL.
    pub url: Option<String>,
    /// Message retention period in seconds.
    pub message_retention_period: i32,
    /// Access policy document.
    pub policy: Option<SharedResource>,
    /// Queue tags.
    pub tags: Option<HashMap<String, String>>,
}

/// Identity discovered for a queue, to be written back into the desired task
/// and persisted by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUpdate {
    /// Queue name.
    pub name: String,
    /// Provider-assigned ARN.
    pub arn: String,
    /// Provider-assigned URL, when known.
    pub url: Option<String>,
}

impl QueueTask {
    /// Creates a desired queue with the default retention period.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            message_retention_period: DEFAULT_MESSAGE_RETENTION_SECS,
            ..Self::default()
        }
    }

    /// Sets the retention period.
    #[must_use]
    pub const fn with_message_retention_period(mut self, seconds: i32) -> Self {
        self.message_retention_period = seconds;
        self
    }

    /// Sets the policy from a resource.
    #[must_use]
    pub fn with_policy(mut self, policy: SharedResource) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Sets the policy from an inline body.
    #[must_use]
    pub fn with_policy_str(self, policy: impl Into<String>) -> Self {
        self.with_policy(StringResource::shared(policy))
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Sets the lifecycle.
    #[must_use]
    pub const fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// The name, or `""` when unset. For logging.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// The name if it is set and non-empty.
    #[must_use]
    pub fn declared_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// True if the name marks a FIFO queue.
    #[must_use]
    pub fn is_fifo(&self) -> bool {
        self.declared_name()
            .is_some_and(|name| name.ends_with(FIFO_SUFFIX))
    }

    /// Key used to match this queue across reconciliation runs.
    #[must_use]
    pub fn compare_with_id(&self) -> Option<&str> {
        self.arn.as_deref()
    }

    /// Writes a discovered identity into this task.
    ///
    /// Returns true if the stored ARN changed.
    pub fn record_identity(&mut self, identity: &IdentityUpdate) -> bool {
        match self.arn.as_deref() {
            Some(current) if current == identity.arn => false,
            Some(current) => {
                warn!(
                    "SQS queue {} was reassigned from {current} to {}",
                    identity.name, identity.arn
                );
                self.arn = Some(identity.arn.clone());
                true
            }
            None => {
                debug!("SQS queue {} has ARN {}", identity.name, identity.arn);
                self.arn = Some(identity.arn.clone());
                true
            }
        }
    }

    /// Terraform expression resolving to this queue's ARN.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue has no name.
    pub fn terraform_link(&self) -> Result<Literal> {
        let name = self
            .declared_name()
            .ok_or_else(|| ValidationError::required("Name"))?;
        Ok(Literal::property(TERRAFORM_RESOURCE_TYPE, name, "arn"))
    }
}
