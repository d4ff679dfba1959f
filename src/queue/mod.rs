//! SQS queue task.
//!
//! A [`QueueTask`] describes one queue. The same type is used for the desired
//! state written by the caller and for the actual state discovered by
//! [`QueueTask::find`]. A reconciliation pass runs
//! find, [`QueueChanges::between`], [`check_changes`] and one render path.

mod changes;
mod find;
mod render;
mod tags;
mod task;

pub use changes::{check_changes, QueueChanges};
pub use find::FindOutcome;
pub use render::{render_aws, render_terraform, TERRAFORM_RESOURCE_TYPE};
pub use tags::intersect_tags;
pub use task::{
    IdentityUpdate, Lifecycle, QueueTask, DEFAULT_MESSAGE_RETENTION_SECS, FIFO_SUFFIX,
};
