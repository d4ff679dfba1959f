//! Provider interface for SQS queues.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

use crate::error::ProviderError;

/// Result cap used when listing queues by name prefix.
///
/// Two is enough to tell "exactly one" from "ambiguous".
pub const MAX_LIST_RESULTS: i32 = 2;

/// Queue attributes read by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueAttribute {
    /// Retention period in seconds, reported as a decimal string.
    MessageRetentionPeriod,
    /// Access policy document.
    Policy,
    /// Provider-assigned queue ARN.
    QueueArn,
    /// `"true"` for FIFO queues. Only settable at creation.
    FifoQueue,
}

impl QueueAttribute {
    /// Wire name of the attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MessageRetentionPeriod => "MessageRetentionPeriod",
            Self::Policy => "Policy",
            Self::QueueArn => "QueueArn",
            Self::FifoQueue => "FifoQueue",
        }
    }
}

impl fmt::Display for QueueAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control-plane operations the reconciler needs from the provider.
///
/// A missing queue is reported as an empty listing or as
/// [`ProviderError::QueueNotFound`], never as a generic failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueApi: Send + Sync {
    /// Lists the URLs of queues whose name starts with `name_prefix`.
    async fn list_queues(
        &self,
        name_prefix: &str,
        max_results: i32,
    ) -> Result<Vec<String>, ProviderError>;

    /// Fetches the named attributes of one queue, keyed by wire name.
    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        attributes: &[QueueAttribute],
    ) -> Result<HashMap<String, String>, ProviderError>;

    /// Lists the tags of one queue. `None` when the provider reports no tag set.
    async fn list_queue_tags(
        &self,
        queue_url: &str,
    ) -> Result<Option<HashMap<String, String>>, ProviderError>;

    /// Creates a queue and returns its URL.
    async fn create_queue(
        &self,
        name: &str,
        attributes: HashMap<String, String>,
        tags: Option<HashMap<String, String>>,
    ) -> Result<String, ProviderError>;
}
