//! Policy normalization.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::transform::{sort_slice, Transformer};
use super::PolicyError;

/// Path of the service principal lists, the only arrays that get sorted.
pub const SERVICE_PRINCIPALS_PATH: &str = ".Statement[].Principal.Service[]";

/// Length of the hex digest kept in a fingerprint.
const FINGERPRINT_HEX_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    Array,
    String,
}

/// Allowed shapes of the keys on the way to the service principals.
/// Each entry is (object path, key, accepted shapes).
const EXPECTED_SHAPES: &[(&str, &str, &[Shape])] = &[
    ("", "Statement", &[Shape::Array, Shape::Object]),
    (".Statement[]", "Principal", &[Shape::Object, Shape::String]),
    (".Statement[].Principal", "Service", &[Shape::Array, Shape::String]),
];

const fn shape_of(value: &Value) -> Option<Shape> {
    match value {
        Value::Object(_) => Some(Shape::Object),
        Value::Array(_) => Some(Shape::Array),
        Value::String(_) => Some(Shape::String),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

fn check_shapes(path: &str, object: &Map<String, Value>) -> Result<(), PolicyError> {
    for (object_path, key, accepted) in EXPECTED_SHAPES {
        if path != *object_path {
            continue;
        }
        if let Some(value) = object.get(*key) {
            let ok = shape_of(value).is_some_and(|shape| accepted.contains(&shape));
            if !ok {
                return Err(PolicyError::new(
                    format!("{path}.{key}"),
                    format!("unexpected value {value}, expected one of {accepted:?}"),
                ));
            }
        }
    }
    Ok(())
}

/// Sorts the service principals of every statement in place.
///
/// Every other field, including other arrays, is left untouched.
///
/// # Errors
///
/// Returns an error if the statement, principal or service entries do not
/// have a shape the policy grammar allows, or if a service list contains
/// something other than strings.
pub fn normalize_policy(policy: &mut Value) -> Result<(), PolicyError> {
    let mut xform = Transformer::new();
    xform.add_object_visitor(check_shapes);
    xform.add_slice_transform(|path, value| {
        if path != SERVICE_PRINCIPALS_PATH {
            return Ok(value);
        }
        sort_slice(path, value)
    });
    xform.transform(policy)
}

/// A parsed and normalized policy document.
///
/// Equality is structural: object key order never matters, array order only
/// matters outside the service principal lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPolicy(Value);

impl NormalizedPolicy {
    /// Parses a policy body and normalizes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a JSON object or cannot be normalized.
    pub fn parse(body: &str) -> Result<Self, PolicyError> {
        let mut value: Value = serde_json::from_str(body)
            .map_err(|e| PolicyError::new("", format!("invalid JSON: {e}")))?;
        if !value.is_object() {
            return Err(PolicyError::new("", "policy document must be a JSON object"));
        }
        normalize_policy(&mut value)?;
        Ok(Self(value))
    }

    /// The normalized document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the wrapper and returns the normalized document.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Short, stable digest of a policy, insensitive to principal reordering.
///
/// Bodies that fail to parse are hashed verbatim.
#[must_use]
pub fn fingerprint(body: &str) -> String {
    let canonical = NormalizedPolicy::parse(body)
        .ok()
        .and_then(|policy| serde_json::to_string(policy.as_value()).ok())
        .unwrap_or_else(|| body.to_string());

    let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
    format!("sha256:{}", &digest[..FINGERPRINT_HEX_LEN])
}
