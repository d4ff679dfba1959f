//! Access policy comparison.
//!
//! Providers hand policy documents back in whatever order they like. This
//! module canonicalizes the parts of a policy that are known to be reordered
//! so that semantically identical documents compare equal.

mod normalize;
mod transform;

pub use normalize::{fingerprint, normalize_policy, NormalizedPolicy, SERVICE_PRINCIPALS_PATH};
pub use transform::{sort_slice, Transformer};

use thiserror::Error;

/// A policy document that could not be parsed or normalized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (at {path:?})")]
pub struct PolicyError {
    /// JSON path where the problem was found, `""` for the document root.
    pub path: String,
    /// Description of the problem.
    pub message: String,
}

impl PolicyError {
    /// Creates a policy error at the given path.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
