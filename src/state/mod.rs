//! Identity persistence.
//!
//! Stores the ARN and URL assigned to each queue so that later runs start
//! from a known comparison key.

mod local;
mod s3;
mod store;
mod types;

pub use local::LocalStateStore;
pub use s3::S3StateStore;
pub use store::StateStore;
pub use types::{IdentityState, QueueIdentity, RunHistoryEntry, STATE_VERSION};
