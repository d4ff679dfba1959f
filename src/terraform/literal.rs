//! Terraform expressions embedded in JSON output.

use serde::Serialize;
use std::fmt;

/// A Terraform expression, serialized as an interpolated JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Literal(String);

impl Literal {
    /// Reference to a property of another resource, e.g. its ARN.
    #[must_use]
    pub fn property(resource_type: &str, resource_name: &str, property: &str) -> Self {
        Self(format!(
            "${{{resource_type}.{}.{property}}}",
            sanitize_name(resource_name)
        ))
    }

    /// Reference to a file relative to the module directory.
    #[must_use]
    pub fn file(relative_path: &str, base64: bool) -> Self {
        let function = if base64 { "filebase64" } else { "file" };
        Self(format!("${{{function}(\"${{path.module}}/{relative_path}\")}}"))
    }

    /// The raw expression.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns a provider name into a valid Terraform resource name.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.replace(['.', '/'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_reference() {
        let literal = Literal::property("aws_sqs_queue", "events.fifo", "arn");
        assert_eq!(literal.as_str(), "${aws_sqs_queue.events-fifo.arn}");
    }

    #[test]
    fn test_file_reference() {
        assert_eq!(
            Literal::file("data/aws_sqs_queue_q_policy", false).to_string(),
            r#"${file("${path.module}/data/aws_sqs_queue_q_policy")}"#
        );
        assert_eq!(
            Literal::file("data/blob", true).to_string(),
            r#"${filebase64("${path.module}/data/blob")}"#
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let literal = Literal::property("aws_sqs_queue", "q", "arn");
        let json = serde_json::to_string(&literal).expect("serialize");
        assert_eq!(json, r#""${aws_sqs_queue.q.arn}""#);
    }
}
