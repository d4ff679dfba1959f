//! Configuration specification types.
//!
//! This module defines the structs that map to the `halldyll.queues.yaml` file.
//! Each queue entry describes the desired state of one SQS queue.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::queue::{Lifecycle, QueueTask, DEFAULT_MESSAGE_RETENTION_SECS};
use crate::resource::{FileResource, StringResource};

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuesConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,
    /// State backend configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Terraform export settings.
    #[serde(default)]
    pub terraform: TerraformConfig,
    /// Queues to reconcile.
    #[serde(default)]
    pub queues: Vec<QueueConfig>,
}

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Unique name for the project.
    pub name: String,
    /// AWS region. The default provider chain decides when unset.
    #[serde(default)]
    pub region: Option<String>,
}

/// State backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateConfig {
    /// Backend type (local or s3).
    #[serde(default)]
    pub backend: StateBackend,
    /// S3 bucket name (required for s3 backend).
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 key prefix (optional).
    #[serde(default)]
    pub prefix: Option<String>,
    /// S3 region (optional, uses AWS default if not specified).
    #[serde(default)]
    pub region: Option<String>,
    /// Local state file path (for local backend).
    #[serde(default)]
    pub path: Option<String>,
}

/// State backend types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// Local file-based state storage.
    #[default]
    Local,
    /// AWS S3-based state storage.
    S3,
}

/// Terraform export settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerraformConfig {
    /// Directory receiving `main.tf.json` and its data files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Desired state of one queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueConfig {
    /// Queue name.
    pub name: String,
    /// How the queue is reconciled.
    #[serde(default)]
    pub lifecycle: Lifecycle,
    /// Message retention period in seconds.
    #[serde(default = "default_retention")]
    pub message_retention_period: i32,
    /// Inline policy document.
    #[serde(default)]
    pub policy: Option<String>,
    /// Policy document file, relative to the configuration file.
    #[serde(default)]
    pub policy_file: Option<String>,
    /// Queue tags.
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
}

impl QueueConfig {
    /// Builds the desired task for this queue.
    ///
    /// A policy file is resolved against `base_dir` but not read until a
    /// reconciliation step needs it.
    #[must_use]
    pub fn to_task(&self, base_dir: &Path) -> QueueTask {
        let mut task = QueueTask::new(&self.name)
            .with_lifecycle(self.lifecycle)
            .with_message_retention_period(self.message_retention_period);

        if let Some(policy) = &self.policy {
            task = task.with_policy(StringResource::shared(policy.clone()));
        } else if let Some(file) = &self.policy_file {
            task = task.with_policy(Arc::new(FileResource::new(resolve(base_dir, file))));
        }

        if let Some(tags) = &self.tags {
            task = task.with_tags(tags.clone());
        }

        task
    }
}

impl QueuesConfig {
    /// Builds the desired tasks of every queue, in declaration order.
    #[must_use]
    pub fn tasks(&self, base_dir: &Path) -> Vec<QueueTask> {
        self.queues.iter().map(|q| q.to_task(base_dir)).collect()
    }

    /// Terraform output directory resolved against `base_dir`.
    #[must_use]
    pub fn terraform_output_dir(&self, base_dir: &Path) -> PathBuf {
        resolve(base_dir, &self.terraform.output_dir)
    }
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

// Default value functions

const fn default_retention() -> i32 {
    DEFAULT_MESSAGE_RETENTION_SECS
}

fn default_output_dir() -> String {
    String::from("out/terraform")
}
