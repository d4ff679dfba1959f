//! Render paths: direct AWS API, Terraform export and dry run.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::aws::{AwsApiTarget, QueueAttribute};
use crate::error::{HalldyllError, RenderError, Result, ValidationError};
use crate::policy::fingerprint;
use crate::resource::resource_as_string;
use crate::target::{DryRunTarget, PendingChange, Target};
use crate::terraform::{sanitize_name, DeclarativeSink, Literal};

use super::changes::QueueChanges;
use super::task::{IdentityUpdate, QueueTask};

/// Terraform resource type for SQS queues.
pub const TERRAFORM_RESOURCE_TYPE: &str = "aws_sqs_queue";

/// Artifact key of the exported policy file.
const POLICY_ARTIFACT_KEY: &str = "policy";

/// Body of an `aws_sqs_queue` block.
#[derive(Debug, Serialize)]
struct TerraformQueue<'a> {
    name: &'a str,
    message_retention_seconds: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy: Option<Literal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a HashMap<String, String>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    fifo_queue: bool,
}

fn required_name(expected: &QueueTask) -> Result<&str> {
    expected
        .declared_name()
        .ok_or_else(|| HalldyllError::Validation(ValidationError::required("Name")))
}

/// Creates the queue through the provider API if it does not exist yet.
///
/// Existing queues are left untouched: this path never updates retention,
/// policy or tags. On creation the ARN is read back and returned so the
/// caller can record it.
///
/// # Errors
///
/// Returns an error if the policy cannot be read, the create call fails, or
/// the ARN cannot be read back.
pub async fn render_aws(
    target: &AwsApiTarget,
    actual: Option<&QueueTask>,
    expected: &QueueTask,
    _changes: &QueueChanges,
) -> Result<Option<IdentityUpdate>> {
    if actual.is_some() {
        debug!(
            "SQS queue {} exists; no update performed",
            expected.display_name()
        );
        return Ok(None);
    }

    let name = required_name(expected)?;
    let cloud = target.cloud();

    let mut attributes = HashMap::new();
    attributes.insert(
        QueueAttribute::MessageRetentionPeriod.as_str().to_string(),
        expected.message_retention_period.to_string(),
    );
    if let Some(policy) = &expected.policy {
        attributes.insert(
            QueueAttribute::Policy.as_str().to_string(),
            resource_as_string(policy.as_ref())?,
        );
    }
    if expected.is_fifo() {
        attributes.insert(
            QueueAttribute::FifoQueue.as_str().to_string(),
            String::from("true"),
        );
    }

    info!("Creating SQS queue {name}");
    let url = cloud
        .create_queue(name, attributes, expected.tags.clone())
        .await
        .map_err(|source| RenderError::Create {
            name: name.to_string(),
            source,
        })?;

    let attributes = cloud
        .get_queue_attributes(&url, &[QueueAttribute::QueueArn])
        .await
        .map_err(|source| RenderError::FollowUpRead {
            name: name.to_string(),
            source,
        })?;

    let arn = attributes
        .get(QueueAttribute::QueueArn.as_str())
        .filter(|arn| !arn.is_empty())
        .cloned()
        .ok_or_else(|| RenderError::MissingAttribute {
            name: name.to_string(),
            attribute: QueueAttribute::QueueArn.to_string(),
        })?;

    info!("Created SQS queue {name}: {arn}");

    Ok(Some(IdentityUpdate {
        name: name.to_string(),
        arn,
        url: Some(url),
    }))
}

/// Emits the `aws_sqs_queue` block for the desired queue.
///
/// Always renders the full desired state, whatever exists in the account.
/// The policy is attached as a file artifact and referenced from the block.
///
/// # Errors
///
/// Returns an error if the queue has no name or collides with a rendered
/// block, if the policy cannot be read, or if the sink rejects the output.
pub fn render_terraform(
    sink: &mut dyn DeclarativeSink,
    _actual: Option<&QueueTask>,
    expected: &QueueTask,
    _changes: &QueueChanges,
) -> Result<()> {
    let name = required_name(expected)?;

    // Checked up front so a rejected block leaves no orphaned artifact.
    if sink.has_resource(TERRAFORM_RESOURCE_TYPE, name) {
        return Err(RenderError::sink(format!(
            "{TERRAFORM_RESOURCE_TYPE}.{} is already rendered; queue {name:?} collides with it",
            sanitize_name(name)
        ))
        .into());
    }

    let policy = expected
        .policy
        .as_ref()
        .map(|policy| {
            sink.add_file_resource(
                TERRAFORM_RESOURCE_TYPE,
                name,
                POLICY_ARTIFACT_KEY,
                policy.as_ref(),
                false,
            )
        })
        .transpose()?;

    let block = TerraformQueue {
        name,
        message_retention_seconds: expected.message_retention_period,
        policy,
        tags: expected.tags.as_ref(),
        fifo_queue: expected.is_fifo(),
    };
    let body = serde_json::to_value(&block)
        .map_err(|e| RenderError::sink(format!("failed to encode {name}: {e}")))?;

    sink.render_resource(TERRAFORM_RESOURCE_TYPE, name, body)
}

/// Records what a real target would do, without touching anything.
fn render_dry_run(
    target: &mut DryRunTarget,
    actual: Option<&QueueTask>,
    expected: &QueueTask,
    changes: &QueueChanges,
) {
    if actual.is_some() && changes.is_empty() {
        return;
    }

    let change = PendingChange {
        name: expected.display_name().to_string(),
        create: actual.is_none(),
        fields: changes.fields().into_iter().map(String::from).collect(),
        message_retention_period: changes.message_retention_period,
        policy_fingerprint: changes.policy.as_deref().map(fingerprint),
    };
    debug!("Pending change for SQS queue {}: {:?}", change.name, change.fields);
    target.record(change);
}

impl QueueTask {
    /// Renders this desired queue to the given target.
    ///
    /// Returns the identity of a newly created queue, if any.
    ///
    /// # Errors
    ///
    /// Propagates any error from the selected render path.
    pub async fn render(
        &self,
        target: &mut Target,
        actual: Option<&Self>,
        changes: &QueueChanges,
    ) -> Result<Option<IdentityUpdate>> {
        match target {
            Target::Aws(aws) => render_aws(aws, actual, self, changes).await,
            Target::Terraform(sink) => {
                render_terraform(sink, actual, self, changes)?;
                Ok(None)
            }
            Target::DryRun(dry_run) => {
                render_dry_run(dry_run, actual, self, changes);
                Ok(None)
            }
        }
    }
}
