//! Render targets.
//!
//! The reconciler picks exactly one target per run. Each target owns the
//! dependency it writes to.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::aws::{AwsApiTarget, QueueApi};
use crate::terraform::TerraformTarget;

/// A change the dry-run target would have applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChange {
    /// Queue name.
    pub name: String,
    /// True if the queue does not exist yet.
    pub create: bool,
    /// Fields in the delta.
    pub fields: Vec<String>,
    /// New retention period, if it changes.
    pub message_retention_period: Option<i32>,
    /// Fingerprint of the new policy, if it changes.
    pub policy_fingerprint: Option<String>,
}

/// Target that reads from the provider but only records what it would do.
pub struct DryRunTarget {
    cloud: Arc<dyn QueueApi>,
    pending: Vec<PendingChange>,
}

impl DryRunTarget {
    /// Creates a dry-run target reading through `cloud`.
    #[must_use]
    pub fn new(cloud: Arc<dyn QueueApi>) -> Self {
        Self {
            cloud,
            pending: Vec::new(),
        }
    }

    /// The provider client.
    #[must_use]
    pub fn cloud(&self) -> &dyn QueueApi {
        self.cloud.as_ref()
    }

    /// Records a pending change.
    pub fn record(&mut self, change: PendingChange) {
        self.pending.push(change);
    }

    /// Changes recorded so far.
    #[must_use]
    pub fn pending(&self) -> &[PendingChange] {
        &self.pending
    }

    /// Recorded changes for queues that do not exist yet.
    ///
    /// The direct-apply target only creates, so these are the changes an
    /// apply would actually perform.
    #[must_use]
    pub fn creates(&self) -> Vec<PendingChange> {
        self.pending.iter().filter(|c| c.create).cloned().collect()
    }
}

impl fmt::Debug for DryRunTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DryRunTarget")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// Where a reconciliation run writes its result.
#[derive(Debug)]
pub enum Target {
    /// Create queues through the SQS API.
    Aws(AwsApiTarget),
    /// Compute changes without applying them.
    DryRun(DryRunTarget),
    /// Export Terraform configuration.
    Terraform(TerraformTarget),
}

impl Target {
    /// Returns true if the target needs the current provider state.
    ///
    /// The Terraform export renders the full desired state and never reads
    /// the account.
    #[must_use]
    pub const fn check_existing(&self) -> bool {
        !matches!(self, Self::Terraform(_))
    }

    /// Provider client used to read current state, if the target has one.
    #[must_use]
    pub fn cloud(&self) -> Option<&dyn QueueApi> {
        match self {
            Self::Aws(aws) => Some(aws.cloud()),
            Self::DryRun(dry_run) => Some(dry_run.cloud()),
            Self::Terraform(_) => None,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Aws(_) => "aws",
            Self::DryRun(_) => "dry-run",
            Self::Terraform(_) => "terraform",
        }
    }
}
