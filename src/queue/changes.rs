//! Field-level delta between actual and desired queue state, and the rules
//! deciding which deltas are allowed.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{Result, ValidationError};
use crate::resource::resource_as_string;

use super::task::QueueTask;

/// Fields of a queue that differ between actual and desired state.
///
/// A field is `Some` only when it is part of the delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueChanges {
    /// Changed name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Changed ARN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    /// Changed URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Changed retention period.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_retention_period: Option<i32>,
    /// Changed policy body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Changed tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

/// Returns the desired value if it is set and differs from the actual one.
fn changed<T: PartialEq + Clone>(actual: Option<&T>, desired: Option<&T>) -> Option<T> {
    match desired {
        Some(value) if actual != Some(value) => Some(value.clone()),
        _ => None,
    }
}

fn tags_changed(
    actual: Option<&HashMap<String, String>>,
    desired: Option<&HashMap<String, String>>,
) -> Option<HashMap<String, String>> {
    let desired = desired?;
    let actual = actual.filter(|tags| !tags.is_empty());
    let wanted = Some(desired).filter(|tags| !tags.is_empty());
    (actual != wanted).then(|| desired.clone())
}

impl QueueChanges {
    /// Computes the delta that would bring `actual` to `expected`.
    ///
    /// With no actual queue every field set on `expected` is part of the delta.
    ///
    /// # Errors
    ///
    /// Returns an error if a policy body cannot be read.
    pub fn between(actual: Option<&QueueTask>, expected: &QueueTask) -> Result<Self> {
        let expected_policy = expected
            .policy
            .as_ref()
            .map(|p| resource_as_string(p.as_ref()))
            .transpose()?;

        let Some(actual) = actual else {
            return Ok(Self {
                name: expected.declared_name().map(String::from),
                arn: expected.arn.clone(),
                url: expected.url.clone(),
                message_retention_period: Some(expected.message_retention_period),
                policy: expected_policy,
                tags: expected.tags.clone(),
            });
        };

        let actual_policy = actual
            .policy
            .as_ref()
            .map(|p| resource_as_string(p.as_ref()))
            .transpose()?;

        Ok(Self {
            name: changed(actual.name.as_ref(), expected.name.as_ref()),
            arn: changed(actual.arn.as_ref(), expected.arn.as_ref()),
            url: changed(actual.url.as_ref(), expected.url.as_ref()),
            message_retention_period: changed(
                Some(&actual.message_retention_period),
                Some(&expected.message_retention_period),
            ),
            policy: changed(actual_policy.as_ref(), expected_policy.as_ref()),
            tags: tags_changed(actual.tags.as_ref(), expected.tags.as_ref()),
        })
    }

    /// Returns true if nothing differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Names of the fields in the delta.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("Name");
        }
        if self.arn.is_some() {
            fields.push("ARN");
        }
        if self.url.is_some() {
            fields.push("URL");
        }
        if self.message_retention_period.is_some() {
            fields.push("MessageRetentionPeriod");
        }
        if self.policy.is_some() {
            fields.push("Policy");
        }
        if self.tags.is_some() {
            fields.push("Tags");
        }
        fields
    }
}

/// Rejects deltas that cannot be applied.
///
/// Creating a queue requires a name, and the URL of an existing queue can
/// never change. Every other field is accepted.
///
/// # Errors
///
/// Returns [`ValidationError::Required`] or [`ValidationError::Immutable`].
pub fn check_changes(
    actual: Option<&QueueTask>,
    expected: &QueueTask,
    changes: &QueueChanges,
) -> std::result::Result<(), ValidationError> {
    match actual {
        None => {
            if expected.declared_name().is_none() {
                return Err(ValidationError::required("Name"));
            }
        }
        Some(_) => {
            if changes.url.as_deref().is_some_and(|url| !url.is_empty()) {
                return Err(ValidationError::immutable("URL"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing() -> QueueTask {
        QueueTask {
            arn: Some(String::from("arn:aws:sqs:eu-west-1:1:q")),
            url: Some(String::from("https://x")),
            ..QueueTask::new("q").with_message_retention_period(300)
        }
    }

    #[test]
    fn test_create_without_name_is_rejected() {
        let err = check_changes(None, &QueueTask::default(), &QueueChanges::default())
            .expect_err("should fail");
        assert_eq!(err, ValidationError::required("Name"));

        let err = check_changes(None, &QueueTask::new(""), &QueueChanges::default())
            .expect_err("should fail");
        assert_eq!(err.to_string(), "Name: Required value");
    }

    #[test]
    fn test_create_with_name_is_accepted() {
        let desired = QueueTask::new("queue-a");
        let changes = QueueChanges::between(None, &desired).expect("diff failed");
        assert!(check_changes(None, &desired, &changes).is_ok());
    }

    #[test]
    fn test_url_change_is_rejected() {
        let changes = QueueChanges {
            url: Some(String::from("https://y")),
            ..QueueChanges::default()
        };
        let err = check_changes(Some(&existing()), &existing(), &changes).expect_err("should fail");
        assert_eq!(err, ValidationError::immutable("URL"));
    }

    #[test]
    fn test_other_changes_are_accepted() {
        let changes = QueueChanges {
            url: Some(String::new()),
            message_retention_period: Some(600),
            policy: Some(String::from("{}")),
            tags: Some(HashMap::new()),
            ..QueueChanges::default()
        };
        assert!(check_changes(Some(&existing()), &existing(), &changes).is_ok());
    }

    #[test]
    fn test_between_without_actual_lists_desired_fields() {
        let desired = QueueTask::new("q").with_policy_str("{}");
        let changes = QueueChanges::between(None, &desired).expect("diff failed");

        assert_eq!(changes.fields(), vec!["Name", "MessageRetentionPeriod", "Policy"]);
        assert_eq!(changes.policy.as_deref(), Some("{}"));
    }

    #[test]
    fn test_between_identical_is_empty() {
        let mut tags = HashMap::new();
        tags.insert(String::from("team"), String::from("ops"));
        let actual = QueueTask {
            tags: Some(tags.clone()),
            ..existing().with_policy_str("{\"a\":1}")
        };
        // Desired tasks do not carry the URL.
        let desired = QueueTask {
            url: None,
            ..actual.clone()
        };

        let changes = QueueChanges::between(Some(&actual), &desired).expect("diff failed");
        assert!(changes.is_empty(), "{changes:?}");
    }

    #[test]
    fn test_between_detects_changes() {
        let mut tags = HashMap::new();
        tags.insert(String::from("team"), String::from("infra"));
        let desired = QueueTask::new("q")
            .with_message_retention_period(600)
            .with_policy_str("{\"a\":2}")
            .with_tags(tags);
        let actual = existing().with_policy_str("{\"a\":1}");

        let changes = QueueChanges::between(Some(&actual), &desired).expect("diff failed");
        assert_eq!(changes.fields(), vec!["MessageRetentionPeriod", "Policy", "Tags"]);
        assert_eq!(changes.message_retention_period, Some(600));
    }

    #[test]
    fn test_unset_and_empty_tags_are_equal() {
        let actual = existing();
        let desired = QueueTask {
            tags: Some(HashMap::new()),
            ..existing()
        };

        let changes = QueueChanges::between(Some(&actual), &desired).expect("diff failed");
        assert!(changes.tags.is_none());
    }
}
