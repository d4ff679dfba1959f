//! Configuration validation.
//!
//! Checks every value before a reconciliation run starts, so that a bad
//! entry never reaches the provider.

use crate::error::{ConfigError, HalldyllError, Result};
use crate::policy::NormalizedPolicy;
use crate::queue::FIFO_SUFFIX;
use crate::terraform::sanitize_name;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::spec::{ProjectConfig, QueueConfig, QueuesConfig, StateBackend, StateConfig};

/// Shortest retention period SQS accepts, in seconds.
pub const MIN_RETENTION_SECS: i32 = 60;

/// Longest retention period SQS accepts (14 days), in seconds.
pub const MAX_RETENTION_SECS: i32 = 1_209_600;

/// Longest queue name SQS accepts, including the `.fifo` suffix.
const MAX_QUEUE_NAME_LEN: usize = 80;

/// Validator for queue configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all problems found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationIssue>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationIssue {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a queue configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateName`] if two queues share a name, or
    /// the first validation error found otherwise.
    pub fn validate(&self, config: &QueuesConfig) -> Result<ValidationResult> {
        Self::check_unique_names(&config.queues)?;

        let mut result = ValidationResult::default();

        Self::validate_project(&config.project, &mut result);
        Self::validate_state(&config.state, &mut result);
        Self::validate_queues(&config.queues, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(HalldyllError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    fn check_unique_names(queues: &[QueueConfig]) -> Result<()> {
        let mut seen = HashSet::new();
        for queue in queues {
            if !seen.insert(queue.name.as_str()) {
                return Err(HalldyllError::Config(ConfigError::DuplicateName {
                    name: queue.name.clone(),
                }));
            }
        }
        Ok(())
    }

    fn validate_project(project: &ProjectConfig, result: &mut ValidationResult) {
        if project.name.trim().is_empty() {
            result.errors.push(ValidationIssue {
                field: String::from("project.name"),
                message: String::from("Project name cannot be empty"),
            });
        }
    }

    fn validate_state(state: &StateConfig, result: &mut ValidationResult) {
        match state.backend {
            StateBackend::S3 => {
                if state.bucket.as_ref().is_none_or(String::is_empty) {
                    result.errors.push(ValidationIssue {
                        field: String::from("state.bucket"),
                        message: String::from("S3 bucket name is required when using S3 backend"),
                    });
                }
            }
            StateBackend::Local => {
                if state.bucket.is_some() {
                    result
                        .warnings
                        .push(String::from("state.bucket is ignored by the local backend"));
                }
            }
        }
    }

    fn validate_queues(queues: &[QueueConfig], result: &mut ValidationResult) {
        if queues.is_empty() {
            result
                .warnings
                .push(String::from("No queues defined in configuration"));
            return;
        }

        let mut resource_names: HashMap<String, &str> = HashMap::new();

        for (i, queue) in queues.iter().enumerate() {
            let prefix = format!("queues[{i}]");

            // Exported block names must stay distinct after sanitizing.
            let resource_name = sanitize_name(&queue.name);
            match resource_names.get(&resource_name) {
                Some(other) if *other != queue.name => {
                    result.errors.push(ValidationIssue {
                        field: format!("{prefix}.name"),
                        message: format!(
                            "Queue names '{other}' and '{}' both map to Terraform resource name '{resource_name}'",
                            queue.name
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    resource_names.insert(resource_name, &queue.name);
                }
            }

            if !is_valid_queue_name(&queue.name) {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.name"),
                    message: format!(
                        "Queue name '{}' is invalid. Must be 1-{MAX_QUEUE_NAME_LEN} characters of letters, digits, '-' or '_', optionally ending in '{FIFO_SUFFIX}'.",
                        queue.name
                    ),
                });
            }

            if !(MIN_RETENTION_SECS..=MAX_RETENTION_SECS).contains(&queue.message_retention_period) {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.message_retention_period"),
                    message: format!(
                        "Retention period {} is out of range ({MIN_RETENTION_SECS}-{MAX_RETENTION_SECS} seconds)",
                        queue.message_retention_period
                    ),
                });
            }

            Self::validate_policy(queue, &prefix, result);
        }
    }

    fn validate_policy(queue: &QueueConfig, prefix: &str, result: &mut ValidationResult) {
        match (&queue.policy, &queue.policy_file) {
            (Some(_), Some(_)) => {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.policy"),
                    message: String::from("policy and policy_file are mutually exclusive"),
                });
            }
            (Some(policy), None) => {
                if let Err(e) = NormalizedPolicy::parse(policy) {
                    result.errors.push(ValidationIssue {
                        field: format!("{prefix}.policy"),
                        message: format!("Invalid policy document: {e}"),
                    });
                }
            }
            (None, Some(file)) => {
                if file.is_empty() {
                    result.errors.push(ValidationIssue {
                        field: format!("{prefix}.policy_file"),
                        message: String::from("policy_file cannot be empty"),
                    });
                }
            }
            (None, None) => {}
        }
    }
}

/// Checks the SQS naming rules.
fn is_valid_queue_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_QUEUE_NAME_LEN {
        return false;
    }

    let base = name.strip_suffix(FIFO_SUFFIX).unwrap_or(name);
    !base.is_empty()
        && base
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
