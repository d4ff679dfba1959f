//! Error types for the Halldyll queue reconciler.
//!
//! This module provides the error hierarchy for every stage of a queue
//! reconciliation pass: configuration, identity state, provider reads,
//! change validation and rendering.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Halldyll queue reconciler.
#[derive(Debug, Error)]
pub enum HalldyllError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Identity state management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// A resource body could not be read.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Reading the current queue state from the provider failed.
    #[error("{context}: {source}")]
    ProviderRead {
        /// What was being read.
        context: String,
        /// Underlying provider failure.
        #[source]
        source: ProviderError,
    },

    /// More than one provider queue matched the desired name.
    #[error("found {count} SQS queues matching queue name {name:?}")]
    AmbiguousMatch {
        /// Queue name used as the listing prefix.
        name: String,
        /// Number of queues returned by the provider.
        count: usize,
    },

    /// A provider attribute or a policy document could not be interpreted.
    #[error("malformed {attribute} for SQS queue {queue:?}: {message}")]
    MalformedAttribute {
        /// Queue name.
        queue: String,
        /// Attribute that failed to parse.
        attribute: String,
        /// Description of the problem.
        message: String,
    },

    /// The requested change is not allowed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Applying or exporting a change failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Duplicate queue definition.
    #[error("Duplicate queue name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },
}

/// Identity state management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Local backend IO failure.
    #[error("Local state backend error: {message}")]
    LocalError {
        /// Description of the failure.
        message: String,
    },

    /// S3 backend error.
    #[error("S3 state backend error: {message}")]
    S3Error {
        /// Description of the S3 error.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// Errors raised while reading a resource body.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The backing file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    File {
        /// Path of the file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The stream failed while reading.
    #[error("failed to read resource: {0}")]
    Read(#[source] std::io::Error),

    /// The content is not valid UTF-8.
    #[error("resource is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors reported by the queue provider interface.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The queue does not exist.
    #[error("queue not found: {queue_url}")]
    QueueNotFound {
        /// URL that was queried.
        queue_url: String,
    },

    /// The caller lacks permission for the operation.
    #[error("access denied for {operation}: {message}")]
    AccessDenied {
        /// Provider operation name.
        operation: String,
        /// Provider message.
        message: String,
    },

    /// The request failed for any other reason.
    #[error("{operation} failed: {message}")]
    RequestFailed {
        /// Provider operation name.
        operation: String,
        /// Provider message.
        message: String,
    },

    /// The provider answered with an unusable response.
    #[error("invalid response from {operation}: {message}")]
    InvalidResponse {
        /// Provider operation name.
        operation: String,
        /// Description of the problem.
        message: String,
    },
}

/// Rejected changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field required for creation is missing.
    #[error("{field}: Required value")]
    Required {
        /// Field path.
        field: String,
    },

    /// A field that can never change was part of the delta.
    #[error("field {field} cannot be changed")]
    Immutable {
        /// Field path.
        field: String,
    },

    /// The lifecycle demands an existing queue but none was found.
    #[error("queue {name:?} does not exist and lifecycle forbids creating it")]
    MissingResource {
        /// Queue name.
        name: String,
    },

    /// The lifecycle forbids changes but some were found.
    #[error("queue {name:?} has changes ({fields}) but lifecycle forbids applying them")]
    ChangesNotAllowed {
        /// Queue name.
        name: String,
        /// Comma separated list of changed fields.
        fields: String,
    },
}

/// Errors raised by the render paths.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The provider create call failed.
    #[error("error creating SQS queue {name:?}: {source}")]
    Create {
        /// Queue name.
        name: String,
        /// Underlying provider failure.
        #[source]
        source: ProviderError,
    },

    /// Reading attributes back after creation failed.
    #[error("error getting SQS queue attributes for {name:?}: {source}")]
    FollowUpRead {
        /// Queue name.
        name: String,
        /// Underlying provider failure.
        #[source]
        source: ProviderError,
    },

    /// The provider response lacked an expected attribute.
    #[error("SQS queue {name:?} has no {attribute} attribute")]
    MissingAttribute {
        /// Queue name.
        name: String,
        /// Attribute name.
        attribute: String,
    },

    /// The declarative sink rejected the output.
    #[error("declarative export failed: {message}")]
    Sink {
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for Halldyll operations.
pub type Result<T> = std::result::Result<T, HalldyllError>;

impl HalldyllError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wraps a provider failure that happened while reading queue state.
    #[must_use]
    pub fn provider_read(context: impl Into<String>, source: ProviderError) -> Self {
        Self::ProviderRead {
            context: context.into(),
            source,
        }
    }

    /// Creates a malformed attribute error.
    #[must_use]
    pub fn malformed(
        queue: impl Into<String>,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedAttribute {
            queue: queue.into(),
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Returns true if the provider denied access during a read.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::ProviderRead {
                source: ProviderError::AccessDenied { .. },
                ..
            }
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl StateError {
    /// Creates an S3 error with the given message.
    #[must_use]
    pub fn s3(message: impl Into<String>) -> Self {
        Self::S3Error {
            message: message.into(),
        }
    }

    /// Creates a local backend error with the given message.
    #[must_use]
    pub fn local(message: impl Into<String>) -> Self {
        Self::LocalError {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl ProviderError {
    /// Creates a generic request failure.
    #[must_use]
    pub fn request(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl ValidationError {
    /// Creates a required field error.
    #[must_use]
    pub fn required(field: impl Into<String>) -> Self {
        Self::Required {
            field: field.into(),
        }
    }

    /// Creates an immutable field error.
    #[must_use]
    pub fn immutable(field: impl Into<String>) -> Self {
        Self::Immutable {
            field: field.into(),
        }
    }
}

impl RenderError {
    /// Creates a sink error.
    #[must_use]
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_detection() {
        let err = HalldyllError::provider_read(
            "error listing SQS queues",
            ProviderError::AccessDenied {
                operation: String::from("ListQueues"),
                message: String::from("nope"),
            },
        );
        assert!(err.is_access_denied());

        let err = HalldyllError::provider_read(
            "error listing SQS queues",
            ProviderError::request("ListQueues", "boom"),
        );
        assert!(!err.is_access_denied());

        // Only reads qualify: a denied create still fails the run.
        let err = HalldyllError::Render(RenderError::Create {
            name: String::from("q"),
            source: ProviderError::AccessDenied {
                operation: String::from("CreateQueue"),
                message: String::from("nope"),
            },
        });
        assert!(!err.is_access_denied());
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::required("Name").to_string(),
            "Name: Required value"
        );
        assert_eq!(
            ValidationError::immutable("URL").to_string(),
            "field URL cannot be changed"
        );
    }
}
