//! Discovery of the actual queue state.

use tracing::debug;

use crate::aws::{QueueApi, QueueAttribute, MAX_LIST_RESULTS};
use crate::error::{HalldyllError, Result};
use crate::policy::NormalizedPolicy;
use crate::resource::{resource_as_string, StringResource};

use super::tags::intersect_tags;
use super::task::{IdentityUpdate, QueueTask};

/// Attributes fetched for an existing queue.
const FIND_ATTRIBUTES: &[QueueAttribute] = &[
    QueueAttribute::MessageRetentionPeriod,
    QueueAttribute::Policy,
    QueueAttribute::QueueArn,
];

/// Result of [`QueueTask::find`].
#[derive(Debug, Default)]
pub struct FindOutcome {
    /// The discovered queue, `None` if it does not exist.
    pub actual: Option<QueueTask>,
    /// Identity to write back into the desired task.
    pub identity: Option<IdentityUpdate>,
}

impl FindOutcome {
    const fn absent() -> Self {
        Self {
            actual: None,
            identity: None,
        }
    }
}

impl QueueTask {
    /// Reads the current state of the queue named by this desired task.
    ///
    /// A queue without a name cannot exist yet, so an unnamed task yields no
    /// actual state. When the provider policy is semantically equal to the
    /// desired one, the actual state carries the desired text verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider call fails, if more than one queue
    /// matches the name, or if an attribute or policy cannot be parsed.
    pub async fn find(&self, cloud: &dyn QueueApi) -> Result<FindOutcome> {
        let Some(name) = self.declared_name() else {
            return Ok(FindOutcome::absent());
        };

        let urls = cloud
            .list_queues(name, MAX_LIST_RESULTS)
            .await
            .map_err(|e| HalldyllError::provider_read("error listing SQS queues", e))?;

        let url = match urls.as_slice() {
            [] => {
                debug!("No SQS queue matches {name}");
                return Ok(FindOutcome::absent());
            }
            [url] => url.clone(),
            _ => {
                return Err(HalldyllError::AmbiguousMatch {
                    name: name.to_string(),
                    count: urls.len(),
                });
            }
        };

        let attributes = cloud
            .get_queue_attributes(&url, FIND_ATTRIBUTES)
            .await
            .map_err(|e| HalldyllError::provider_read("error getting SQS queue attributes", e))?;

        let period_attr = QueueAttribute::MessageRetentionPeriod.as_str();
        let period = attributes
            .get(period_attr)
            .ok_or_else(|| HalldyllError::malformed(name, period_attr, "attribute missing"))?
            .parse::<i32>()
            .map_err(|e| HalldyllError::malformed(name, period_attr, e.to_string()))?;

        let tags = cloud
            .list_queue_tags(&url)
            .await
            .map_err(|e| HalldyllError::provider_read("error listing SQS queue tags", e))?;

        let mut actual_policy = attributes
            .get(QueueAttribute::Policy.as_str())
            .filter(|body| !body.is_empty())
            .cloned();
        if let Some(expected) = self.expected_policy_if_equal(name, actual_policy.as_deref())? {
            debug!("actual Policy was json-equal to expected; returning expected value");
            actual_policy = Some(expected);
        }

        let arn = attributes
            .get(QueueAttribute::QueueArn.as_str())
            .filter(|arn| !arn.is_empty())
            .cloned();

        let identity = arn.as_ref().map(|arn| IdentityUpdate {
            name: name.to_string(),
            arn: arn.clone(),
            url: Some(url.clone()),
        });

        let actual = Self {
            name: Some(name.to_string()),
            lifecycle: self.lifecycle,
            arn,
            url: Some(url),
            message_retention_period: period,
            policy: actual_policy.map(StringResource::shared),
            tags: intersect_tags(tags.as_ref(), self.tags.as_ref()),
        };

        Ok(FindOutcome {
            actual: Some(actual),
            identity,
        })
    }

    /// Returns the desired policy text if it is semantically equal to `actual`.
    fn expected_policy_if_equal(&self, name: &str, actual: Option<&str>) -> Result<Option<String>> {
        let Some(expected_resource) = &self.policy else {
            return Ok(None);
        };

        let expected = resource_as_string(expected_resource.as_ref())?;
        let expected_json = NormalizedPolicy::parse(&expected).map_err(|e| {
            HalldyllError::malformed(name, "expected Policy", e.to_string())
        })?;

        // A missing attribute reads as the empty body, which never parses.
        let actual_json = NormalizedPolicy::parse(actual.unwrap_or_default())
            .map_err(|e| HalldyllError::malformed(name, "actual Policy", e.to_string()))?;

        Ok((expected_json == actual_json).then_some(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::MockQueueApi;
    use crate::error::ProviderError;
    use crate::queue::Lifecycle;
    use std::collections::HashMap;

    const URL: &str = "https://sqs.eu-west-1.amazonaws.com/123/queue-a";
    const ARN: &str = "arn:aws:sqs:eu-west-1:123:queue-a";

    fn attributes(period: &str, policy: Option<&str>) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert(String::from("MessageRetentionPeriod"), period.to_string());
        attrs.insert(String::from("QueueArn"), ARN.to_string());
        if let Some(policy) = policy {
            attrs.insert(String::from("Policy"), policy.to_string());
        }
        attrs
    }

    fn existing_queue(period: &str, policy: Option<&str>, tags: Option<HashMap<String, String>>) -> MockQueueApi {
        let mut cloud = MockQueueApi::new();
        cloud
            .expect_list_queues()
            .withf(|prefix, max| prefix.to_string() == "queue-a" && *max == 2)
            .times(1)
            .returning(|_, _| Ok(vec![URL.to_string()]));
        let attrs = attributes(period, policy);
        cloud
            .expect_get_queue_attributes()
            .withf(|url, names| url.to_string() == URL && names.len() == 3)
            .times(1)
            .returning(move |_, _| Ok(attrs.clone()));
        cloud
            .expect_list_queue_tags()
            .times(1)
            .returning(move |_| Ok(tags.clone()));
        cloud
    }

    fn text(task: &QueueTask) -> Option<String> {
        task.policy
            .as_ref()
            .map(|p| resource_as_string(p.as_ref()).expect("policy read"))
    }

    #[tokio::test]
    async fn test_unnamed_task_finds_nothing() {
        let cloud = MockQueueApi::new();

        let outcome = QueueTask::default().find(&cloud).await.expect("find failed");
        assert!(outcome.actual.is_none());
        assert!(outcome.identity.is_none());

        let outcome = QueueTask::new("").find(&cloud).await.expect("find failed");
        assert!(outcome.actual.is_none());
    }

    #[tokio::test]
    async fn test_no_match_finds_nothing() {
        let mut cloud = MockQueueApi::new();
        cloud
            .expect_list_queues()
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let outcome = QueueTask::new("queue-a").find(&cloud).await.expect("find failed");
        assert!(outcome.actual.is_none());
        assert!(outcome.identity.is_none());
    }

    #[tokio::test]
    async fn test_multiple_matches_are_ambiguous() {
        let mut cloud = MockQueueApi::new();
        cloud
            .expect_list_queues()
            .times(1)
            .returning(|_, _| Ok(vec![URL.to_string(), format!("{URL}-dlq")]));

        let err = QueueTask::new("queue-a").find(&cloud).await.expect_err("should fail");
        assert!(matches!(err, HalldyllError::AmbiguousMatch { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_single_match_is_populated() {
        let mut provider_tags = HashMap::new();
        provider_tags.insert(String::from("team"), String::from("ops"));
        provider_tags.insert(String::from("aws:cloudformation"), String::from("x"));
        let cloud = existing_queue("300", None, Some(provider_tags));

        let mut desired_tags = HashMap::new();
        desired_tags.insert(String::from("team"), String::from("infra"));
        let desired = QueueTask::new("queue-a")
            .with_lifecycle(Lifecycle::ExistsAndWarnIfChanges)
            .with_tags(desired_tags);

        let outcome = desired.find(&cloud).await.expect("find failed");
        let actual = outcome.actual.expect("queue should be found");

        assert_eq!(actual.name.as_deref(), Some("queue-a"));
        assert_eq!(actual.url.as_deref(), Some(URL));
        assert_eq!(actual.arn.as_deref(), Some(ARN));
        assert_eq!(actual.message_retention_period, 300);
        assert_eq!(actual.lifecycle, Lifecycle::ExistsAndWarnIfChanges);
        assert!(actual.policy.is_none());

        let tags = actual.tags.expect("tags expected");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("team").map(String::as_str), Some("ops"));

        assert_eq!(
            outcome.identity,
            Some(IdentityUpdate {
                name: String::from("queue-a"),
                arn: ARN.to_string(),
                url: Some(URL.to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_equivalent_policy_returns_desired_text() {
        let desired_policy = r#"{"Statement":[{"Principal":{"Service":["b","a"]}}]}"#;
        let actual_policy = r#"{"Statement":[{"Principal":{"Service":["a","b"]}}]}"#;
        let cloud = existing_queue("300", Some(actual_policy), None);

        let desired = QueueTask::new("queue-a").with_policy_str(desired_policy);
        let actual = desired.find(&cloud).await.expect("find failed").actual.expect("found");

        assert_eq!(text(&actual).as_deref(), Some(desired_policy));
    }

    #[tokio::test]
    async fn test_different_policy_returns_provider_text() {
        let desired_policy = r#"{"Statement":[{"Principal":{"Service":["c"]}}]}"#;
        let actual_policy = r#"{"Statement":[{"Principal":{"Service":["a","b"]}}]}"#;
        let cloud = existing_queue("300", Some(actual_policy), None);

        let desired = QueueTask::new("queue-a").with_policy_str(desired_policy);
        let actual = desired.find(&cloud).await.expect("find failed").actual.expect("found");

        assert_eq!(text(&actual).as_deref(), Some(actual_policy));
    }

    #[tokio::test]
    async fn test_missing_actual_policy_fails() {
        let cloud = existing_queue("300", None, None);

        let desired = QueueTask::new("queue-a").with_policy_str(r#"{"Statement":[]}"#);
        let err = desired.find(&cloud).await.expect_err("should fail");

        assert!(matches!(
            err,
            HalldyllError::MalformedAttribute { ref attribute, .. } if attribute == "actual Policy"
        ));
    }

    #[tokio::test]
    async fn test_empty_actual_policy_fails() {
        let cloud = existing_queue("300", Some(""), None);

        let desired = QueueTask::new("queue-a").with_policy_str(r#"{"Statement":[]}"#);
        let err = desired.find(&cloud).await.expect_err("should fail");

        assert!(matches!(
            err,
            HalldyllError::MalformedAttribute { ref attribute, .. } if attribute == "actual Policy"
        ));
    }

    #[tokio::test]
    async fn test_missing_actual_policy_without_desired_policy() {
        let cloud = existing_queue("300", None, None);

        let actual = QueueTask::new("queue-a")
            .find(&cloud)
            .await
            .expect("find failed")
            .actual
            .expect("found");

        assert!(actual.policy.is_none());
    }

    #[tokio::test]
    async fn test_unparsable_actual_policy_fails() {
        let cloud = existing_queue("300", Some("{not json"), None);

        let desired = QueueTask::new("queue-a").with_policy_str(r#"{"Statement":[]}"#);
        let err = desired.find(&cloud).await.expect_err("should fail");

        assert!(matches!(
            err,
            HalldyllError::MalformedAttribute { ref attribute, .. } if attribute == "actual Policy"
        ));
    }

    #[tokio::test]
    async fn test_unparsable_expected_policy_fails() {
        let cloud = existing_queue("300", Some(r#"{"Statement":[]}"#), None);

        let desired = QueueTask::new("queue-a").with_policy_str("nope");
        let err = desired.find(&cloud).await.expect_err("should fail");

        assert!(matches!(
            err,
            HalldyllError::MalformedAttribute { ref attribute, .. } if attribute == "expected Policy"
        ));
    }

    #[tokio::test]
    async fn test_non_numeric_retention_fails() {
        let mut cloud = MockQueueApi::new();
        cloud
            .expect_list_queues()
            .returning(|_, _| Ok(vec![URL.to_string()]));
        cloud
            .expect_get_queue_attributes()
            .returning(|_, _| Ok(attributes("four days", None)));

        let err = QueueTask::new("queue-a").find(&cloud).await.expect_err("should fail");
        assert!(matches!(
            err,
            HalldyllError::MalformedAttribute { ref attribute, .. } if attribute == "MessageRetentionPeriod"
        ));
    }

    #[tokio::test]
    async fn test_provider_failures_are_read_errors() {
        let mut cloud = MockQueueApi::new();
        cloud
            .expect_list_queues()
            .returning(|_, _| Err(ProviderError::request("ListQueues", "throttled")));

        let err = QueueTask::new("queue-a").find(&cloud).await.expect_err("should fail");
        assert!(matches!(err, HalldyllError::ProviderRead { .. }));
        assert!(err.to_string().contains("error listing SQS queues"));

        let mut cloud = MockQueueApi::new();
        cloud
            .expect_list_queues()
            .returning(|_, _| Ok(vec![URL.to_string()]));
        cloud
            .expect_get_queue_attributes()
            .returning(|_, _| Ok(attributes("60", None)));
        cloud
            .expect_list_queue_tags()
            .returning(|url| Err(ProviderError::QueueNotFound { queue_url: url.to_string() }));

        let err = QueueTask::new("queue-a").find(&cloud).await.expect_err("should fail");
        assert!(matches!(
            err,
            HalldyllError::ProviderRead { source: ProviderError::QueueNotFound { .. }, .. }
        ));
    }
}
