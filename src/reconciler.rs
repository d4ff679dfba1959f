//! Reconciler driving one pass over every configured queue.
//!
//! For each queue the pass runs find, diff, validation and one render path,
//! in that order, and stops at the first failure. Identities discovered on
//! the way are written back into the desired task and persisted, even when a
//! later step fails.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::config::QueuesConfig;
use crate::error::{HalldyllError, Result, ValidationError};
use crate::queue::{check_changes, IdentityUpdate, Lifecycle, QueueChanges, QueueTask};
use crate::state::{IdentityState, RunHistoryEntry, StateStore};
use crate::target::Target;

/// Reconciler for one project.
pub struct Reconciler<'a, S: StateStore> {
    /// Configuration.
    config: &'a QueuesConfig,
    /// Directory relative paths in the configuration are resolved against.
    base_dir: &'a Path,
    /// Identity store.
    state_store: &'a S,
}

/// What happened to one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    /// The queue was created.
    Created,
    /// The queue was written to the Terraform output.
    Exported,
    /// The dry run recorded pending changes.
    Planned,
    /// Actual state matches the desired state.
    Unchanged,
    /// The queue was not processed.
    Skipped,
    /// The queue exists with differences the direct path does not apply.
    UpdateNotSupported,
    /// Differences were found and only reported.
    ChangesIgnored,
}

impl fmt::Display for QueueAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Self::Created => "created",
            Self::Exported => "exported",
            Self::Planned => "planned",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
            Self::UpdateNotSupported => "update not supported",
            Self::ChangesIgnored => "changes ignored",
        };
        write!(f, "{action}")
    }
}

/// Outcome for one queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueueOutcome {
    /// Queue name.
    pub name: String,
    /// Action taken.
    pub action: QueueAction,
    /// Fields that differ between actual and desired state.
    pub changed_fields: Vec<String>,
}

impl QueueOutcome {
    fn new(task: &QueueTask, action: QueueAction, changes: Option<&QueueChanges>) -> Self {
        Self {
            name: task.display_name().to_string(),
            action,
            changed_fields: changes
                .map(|c| c.fields().into_iter().map(String::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// Result of a reconciliation run.
#[derive(Debug, Serialize)]
pub struct ReconciliationResult {
    /// Target the run rendered to.
    pub target: String,
    /// Outcome per queue, in configuration order.
    pub queues: Vec<QueueOutcome>,
    /// Final identity state after the run.
    #[serde(skip)]
    pub final_state: Option<IdentityState>,
}

impl ReconciliationResult {
    /// Number of queues with the given action.
    #[must_use]
    pub fn count(&self, action: QueueAction) -> usize {
        self.queues.iter().filter(|q| q.action == action).count()
    }

    /// Names of queues that were created, exported or have pending changes.
    #[must_use]
    pub fn touched(&self) -> Vec<String> {
        self.queues
            .iter()
            .filter(|q| {
                matches!(
                    q.action,
                    QueueAction::Created | QueueAction::Exported | QueueAction::Planned
                )
            })
            .map(|q| q.name.clone())
            .collect()
    }
}

fn record_identity(task: &mut QueueTask, state: &mut IdentityState, identity: &IdentityUpdate) {
    task.record_identity(identity);
    state.record(identity);
}

impl<'a, S: StateStore> Reconciler<'a, S> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(config: &'a QueuesConfig, base_dir: &'a Path, state_store: &'a S) -> Self {
        Self {
            config,
            base_dir,
            state_store,
        }
    }

    /// Reconciles every configured queue against `target`.
    ///
    /// The identity state is saved whether or not the run succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any queue, or a state store error.
    pub async fn reconcile(&self, target: &mut Target) -> Result<ReconciliationResult> {
        info!(
            "Starting reconciliation for {} ({} queue(s), target {})",
            self.config.project.name,
            self.config.queues.len(),
            target.name()
        );

        let mut state = self
            .state_store
            .load()
            .await?
            .unwrap_or_else(|| IdentityState::new(&self.config.project.name));

        let mut tasks = self.config.tasks(self.base_dir);
        state.seed(&mut tasks);

        let mut result = ReconciliationResult {
            target: target.name().to_string(),
            queues: Vec::with_capacity(tasks.len()),
            final_state: None,
        };

        let mut failure = None;
        for task in &mut tasks {
            match self.reconcile_queue(task, target, &mut state).await {
                Ok(outcome) => {
                    debug!("SQS queue {}: {}", outcome.name, outcome.action);
                    result.queues.push(outcome);
                }
                Err(err) => {
                    error!("Reconciling SQS queue {} failed: {err}", task.display_name());
                    failure = Some(err);
                    break;
                }
            }
        }

        let entry = match &failure {
            None => RunHistoryEntry::new(target.name(), result.touched()),
            Some(err) => RunHistoryEntry::failed(target.name(), result.touched(), &err.to_string()),
        };
        state.add_history(entry);

        if let Err(e) = self.state_store.save(&state).await {
            error!("Failed to save state: {e}");
            if failure.is_none() {
                return Err(e);
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        info!(
            "Reconciliation finished: {} created, {} exported, {} planned, {} unchanged",
            result.count(QueueAction::Created),
            result.count(QueueAction::Exported),
            result.count(QueueAction::Planned),
            result.count(QueueAction::Unchanged)
        );

        result.final_state = Some(state);
        Ok(result)
    }

    /// Runs one queue through find, diff, validation and render.
    async fn reconcile_queue(
        &self,
        task: &mut QueueTask,
        target: &mut Target,
        state: &mut IdentityState,
    ) -> Result<QueueOutcome> {
        let name = task.display_name().to_string();

        if task.lifecycle == Lifecycle::Ignore {
            info!("Skipping SQS queue {name}: lifecycle is {}", task.lifecycle);
            return Ok(QueueOutcome::new(task, QueueAction::Skipped, None));
        }

        let check_existing = target.check_existing();
        let mut actual = None;
        if let Some(cloud) = target.cloud().filter(|_| check_existing) {
            match task.find(cloud).await {
                Ok(found) => {
                    if let Some(identity) = &found.identity {
                        record_identity(task, state, identity);
                    }
                    actual = found.actual;
                }
                Err(err)
                    if task.lifecycle == Lifecycle::WarnIfInsufficientAccess
                        && err.is_access_denied() =>
                {
                    warn!("Skipping SQS queue {name}: insufficient access ({err})");
                    return Ok(QueueOutcome::new(task, QueueAction::Skipped, None));
                }
                Err(err) => return Err(err),
            }
        }

        let changes = QueueChanges::between(actual.as_ref(), task)?;

        match task.lifecycle {
            Lifecycle::ExistsAndValidates | Lifecycle::ExistsAndWarnIfChanges => {
                return Self::check_existing_only(task, actual.as_ref(), &changes, check_existing);
            }
            Lifecycle::Sync | Lifecycle::WarnIfInsufficientAccess | Lifecycle::Ignore => {}
        }

        check_changes(actual.as_ref(), task, &changes)?;

        let created = task.render(target, actual.as_ref(), &changes).await?;
        if let Some(identity) = &created {
            record_identity(task, state, identity);
        }

        let action = match target {
            Target::Terraform(_) => QueueAction::Exported,
            Target::Aws(_) if created.is_some() => QueueAction::Created,
            _ if actual.is_some() && changes.is_empty() => QueueAction::Unchanged,
            Target::Aws(_) => {
                warn!(
                    "SQS queue {name} differs in {} but existing queues are not updated",
                    changes.fields().join(", ")
                );
                QueueAction::UpdateNotSupported
            }
            Target::DryRun(_) => QueueAction::Planned,
        };

        Ok(QueueOutcome::new(task, action, Some(&changes)))
    }

    /// Handles queues whose lifecycle forbids rendering.
    fn check_existing_only(
        task: &QueueTask,
        actual: Option<&QueueTask>,
        changes: &QueueChanges,
        check_existing: bool,
    ) -> Result<QueueOutcome> {
        let name = task.display_name();

        if !check_existing {
            debug!("Skipping SQS queue {name}: lifecycle {} is not exported", task.lifecycle);
            return Ok(QueueOutcome::new(task, QueueAction::Skipped, None));
        }

        let strict = task.lifecycle == Lifecycle::ExistsAndValidates;

        if actual.is_none() {
            if strict {
                return Err(HalldyllError::Validation(ValidationError::MissingResource {
                    name: name.to_string(),
                }));
            }
            warn!("SQS queue {name} does not exist and will not be created");
            return Ok(QueueOutcome::new(task, QueueAction::Skipped, None));
        }

        if changes.is_empty() {
            return Ok(QueueOutcome::new(task, QueueAction::Unchanged, Some(changes)));
        }

        let fields = changes.fields().join(", ");
        if strict {
            return Err(HalldyllError::Validation(ValidationError::ChangesNotAllowed {
                name: name.to_string(),
                fields,
            }));
        }

        warn!("SQS queue {name} has changes that will not be applied: {fields}");
        Ok(QueueOutcome::new(task, QueueAction::ChangesIgnored, Some(changes)))
    }
}

impl fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reconciliation against {}:", self.target)?;
        for queue in &self.queues {
            if queue.changed_fields.is_empty() {
                writeln!(f, "  {}: {}", queue.name, queue.action)?;
            } else {
                writeln!(
                    f,
                    "  {}: {} ({})",
                    queue.name,
                    queue.action,
                    queue.changed_fields.join(", ")
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::{AwsApiTarget, MockQueueApi};
    use crate::config::{ProjectConfig, QueueConfig, StateConfig, TerraformConfig};
    use crate::error::ProviderError;
    use crate::state::LocalStateStore;
    use crate::target::DryRunTarget;
    use crate::terraform::TerraformTarget;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    const URL: &str = "https://sqs.eu-west-1.amazonaws.com/123/c1-events";
    const ARN: &str = "arn:aws:sqs:eu-west-1:123:c1-events";

    fn queue(lifecycle: Lifecycle) -> QueueConfig {
        QueueConfig {
            name: String::from("c1-events"),
            lifecycle,
            message_retention_period: 300,
            policy: None,
            policy_file: None,
            tags: None,
        }
    }

    fn queues_config(queues: Vec<QueueConfig>) -> QueuesConfig {
        QueuesConfig {
            project: ProjectConfig {
                name: String::from("c1"),
                region: None,
            },
            state: StateConfig::default(),
            terraform: TerraformConfig::default(),
            queues,
        }
    }

    fn existing(cloud: &mut MockQueueApi, period: &'static str) {
        cloud
            .expect_list_queues()
            .returning(|_, _| Ok(vec![URL.to_string()]));
        cloud.expect_get_queue_attributes().returning(move |_, _| {
            let mut attrs = HashMap::new();
            attrs.insert(String::from("MessageRetentionPeriod"), period.to_string());
            attrs.insert(String::from("QueueArn"), ARN.to_string());
            Ok(attrs)
        });
        cloud.expect_list_queue_tags().returning(|_| Ok(None));
    }

    fn missing(cloud: &mut MockQueueApi) {
        cloud.expect_list_queues().returning(|_, _| Ok(vec![]));
    }

    #[tokio::test]
    async fn test_aws_creates_and_persists_identity() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());

        let mut cloud = MockQueueApi::new();
        missing(&mut cloud);
        cloud
            .expect_create_queue()
            .times(1)
            .returning(|_, _, _| Ok(URL.to_string()));
        cloud.expect_get_queue_attributes().returning(|_, _| {
            let mut attrs = HashMap::new();
            attrs.insert(String::from("QueueArn"), ARN.to_string());
            Ok(attrs)
        });

        let config = queues_config(vec![queue(Lifecycle::Sync)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);
        let mut target = Target::Aws(AwsApiTarget::new(Arc::new(cloud)));

        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        assert_eq!(result.count(QueueAction::Created), 1);

        let saved = store.load().await.expect("load failed").expect("state saved");
        assert_eq!(saved.arn_for("c1-events"), Some(ARN));
        assert_eq!(saved.history.len(), 1);
        assert!(saved.history[0].success);
    }

    #[tokio::test]
    async fn test_aws_existing_queue_with_changes_is_not_updated() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());

        let mut cloud = MockQueueApi::new();
        existing(&mut cloud, "60");

        let config = queues_config(vec![queue(Lifecycle::Sync)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);
        let mut target = Target::Aws(AwsApiTarget::new(Arc::new(cloud)));

        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        assert_eq!(result.queues[0].action, QueueAction::UpdateNotSupported);
        assert_eq!(result.queues[0].changed_fields, vec!["MessageRetentionPeriod"]);

        // The identity found on the way is still recorded.
        let state = result.final_state.expect("final state");
        assert_eq!(state.arn_for("c1-events"), Some(ARN));
    }

    #[tokio::test]
    async fn test_dry_run_plans_changes() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());

        let mut cloud = MockQueueApi::new();
        existing(&mut cloud, "60");

        let config = queues_config(vec![queue(Lifecycle::Sync)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);
        let mut target = Target::DryRun(DryRunTarget::new(Arc::new(cloud)));

        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        assert_eq!(result.queues[0].action, QueueAction::Planned);

        let Target::DryRun(dry_run) = target else {
            panic!("target changed variant");
        };
        assert_eq!(dry_run.pending().len(), 1);
        assert!(!dry_run.pending()[0].create);
        assert_eq!(dry_run.pending()[0].message_retention_period, Some(300));
    }

    #[tokio::test]
    async fn test_unchanged_queue() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());

        let mut cloud = MockQueueApi::new();
        existing(&mut cloud, "300");

        let config = queues_config(vec![queue(Lifecycle::Sync)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);
        let mut target = Target::DryRun(DryRunTarget::new(Arc::new(cloud)));

        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        assert_eq!(result.queues[0].action, QueueAction::Unchanged);
        assert!(result.queues[0].changed_fields.is_empty());
    }

    #[tokio::test]
    async fn test_terraform_exports_without_provider() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());

        let config = queues_config(vec![queue(Lifecycle::Sync)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);
        let mut target = Target::Terraform(TerraformTarget::new());

        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        assert_eq!(result.queues[0].action, QueueAction::Exported);

        let Target::Terraform(terraform) = target else {
            panic!("target changed variant");
        };
        assert!(terraform.resource("aws_sqs_queue", "c1-events").is_some());
    }

    #[tokio::test]
    async fn test_ignored_queue_is_not_read() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());

        let config = queues_config(vec![queue(Lifecycle::Ignore)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);
        let mut target = Target::Aws(AwsApiTarget::new(Arc::new(MockQueueApi::new())));

        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        assert_eq!(result.queues[0].action, QueueAction::Skipped);
    }

    #[tokio::test]
    async fn test_insufficient_access_is_skipped_when_allowed() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());

        let denied = || {
            let mut cloud = MockQueueApi::new();
            cloud.expect_list_queues().returning(|_, _| {
                Err(ProviderError::AccessDenied {
                    operation: String::from("ListQueues"),
                    message: String::from("not authorized"),
                })
            });
            cloud
        };

        let config = queues_config(vec![queue(Lifecycle::WarnIfInsufficientAccess)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);
        let mut target = Target::Aws(AwsApiTarget::new(Arc::new(denied())));
        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        assert_eq!(result.queues[0].action, QueueAction::Skipped);

        let config = queues_config(vec![queue(Lifecycle::Sync)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);
        let mut target = Target::Aws(AwsApiTarget::new(Arc::new(denied())));
        let err = reconciler.reconcile(&mut target).await.expect_err("should fail");
        assert!(err.is_access_denied());
    }

    #[tokio::test]
    async fn test_exists_and_validates() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());
        let config = queues_config(vec![queue(Lifecycle::ExistsAndValidates)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);

        let mut cloud = MockQueueApi::new();
        missing(&mut cloud);
        let mut target = Target::Aws(AwsApiTarget::new(Arc::new(cloud)));
        let err = reconciler.reconcile(&mut target).await.expect_err("should fail");
        assert!(matches!(
            err,
            HalldyllError::Validation(ValidationError::MissingResource { .. })
        ));

        // State is saved even though the run failed.
        let saved = store.load().await.expect("load failed").expect("state saved");
        assert!(!saved.history[0].success);

        let mut cloud = MockQueueApi::new();
        existing(&mut cloud, "60");
        let mut target = Target::Aws(AwsApiTarget::new(Arc::new(cloud)));
        let err = reconciler.reconcile(&mut target).await.expect_err("should fail");
        assert!(matches!(
            err,
            HalldyllError::Validation(ValidationError::ChangesNotAllowed { ref fields, .. })
                if fields == "MessageRetentionPeriod"
        ));

        // The ARN found before the failure is persisted.
        let saved = store.load().await.expect("load failed").expect("state saved");
        assert_eq!(saved.arn_for("c1-events"), Some(ARN));
    }

    #[tokio::test]
    async fn test_exists_and_warn_if_changes() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());
        let config = queues_config(vec![queue(Lifecycle::ExistsAndWarnIfChanges)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);

        let mut cloud = MockQueueApi::new();
        existing(&mut cloud, "60");
        let mut target = Target::Aws(AwsApiTarget::new(Arc::new(cloud)));
        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        assert_eq!(result.queues[0].action, QueueAction::ChangesIgnored);

        let mut cloud = MockQueueApi::new();
        missing(&mut cloud);
        let mut target = Target::Aws(AwsApiTarget::new(Arc::new(cloud)));
        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        assert_eq!(result.queues[0].action, QueueAction::Skipped);
    }

    #[tokio::test]
    async fn test_cached_arn_is_replaced_when_reassigned() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp.path());

        let mut cached = IdentityState::new("c1");
        cached.record(&IdentityUpdate {
            name: String::from("c1-events"),
            arn: String::from("arn:aws:sqs:eu-west-1:123:old"),
            url: None,
        });
        store.save(&cached).await.expect("save failed");

        let mut cloud = MockQueueApi::new();
        existing(&mut cloud, "300");

        let config = queues_config(vec![queue(Lifecycle::Sync)]);
        let reconciler = Reconciler::new(&config, temp.path(), &store);
        let mut target = Target::DryRun(DryRunTarget::new(Arc::new(cloud)));

        let result = reconciler.reconcile(&mut target).await.expect("reconcile failed");
        // The seeded ARN is overwritten before the diff, so no ARN change is reported.
        assert_eq!(result.queues[0].action, QueueAction::Unchanged);

        let saved = store.load().await.expect("load failed").expect("state saved");
        assert_eq!(saved.arn_for("c1-events"), Some(ARN));
        assert_eq!(saved.queues["c1-events"].url.as_deref(), Some(URL));
    }
}
