//! Direct-apply render target.

use std::fmt;
use std::sync::Arc;

use super::api::QueueApi;

/// Target that applies changes through the SQS control-plane API.
#[derive(Clone)]
pub struct AwsApiTarget {
    cloud: Arc<dyn QueueApi>,
}

impl AwsApiTarget {
    /// Creates a target backed by the given provider client.
    #[must_use]
    pub fn new(cloud: Arc<dyn QueueApi>) -> Self {
        Self { cloud }
    }

    /// The provider client.
    #[must_use]
    pub fn cloud(&self) -> &dyn QueueApi {
        self.cloud.as_ref()
    }
}

impl fmt::Debug for AwsApiTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsApiTarget").finish_non_exhaustive()
    }
}
