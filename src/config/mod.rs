//! Configuration module.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `halldyll.queues.yaml`
//! - Environment overrides and `.env` loading
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{find_config_file, ConfigParser, DEFAULT_CONFIG_FILES};
pub use spec::{
    ProjectConfig, QueueConfig, QueuesConfig, StateBackend, StateConfig, TerraformConfig,
};
pub use validator::{
    ConfigValidator, ValidationIssue, ValidationResult, MAX_RETENTION_SECS, MIN_RETENTION_SECS,
};
