//! Path-based transforms over untyped JSON documents.
//!
//! Paths are written the way they are matched: object keys are joined with
//! `.`, array elements add `[]`. The service principals of a policy therefore
//! live at `.Statement[].Principal.Service[]`.

use std::fmt;

use serde_json::{Map, Value};

use super::PolicyError;

type SliceTransform = Box<dyn Fn(&str, Vec<Value>) -> Result<Vec<Value>, PolicyError> + Send + Sync>;
type ObjectVisitor = Box<dyn Fn(&str, &Map<String, Value>) -> Result<(), PolicyError> + Send + Sync>;

/// Depth-first transformer over a JSON value.
#[derive(Default)]
pub struct Transformer {
    slice_transforms: Vec<SliceTransform>,
    object_visitors: Vec<ObjectVisitor>,
}

impl Transformer {
    /// Creates an empty transformer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transform applied to every array, after its elements have
    /// been visited. The path passed in is the element path (ends in `[]`).
    pub fn add_slice_transform<F>(&mut self, transform: F)
    where
        F: Fn(&str, Vec<Value>) -> Result<Vec<Value>, PolicyError> + Send + Sync + 'static,
    {
        self.slice_transforms.push(Box::new(transform));
    }

    /// Registers a visitor called for every object, after its children.
    pub fn add_object_visitor<F>(&mut self, visitor: F)
    where
        F: Fn(&str, &Map<String, Value>) -> Result<(), PolicyError> + Send + Sync + 'static,
    {
        self.object_visitors.push(Box::new(visitor));
    }

    /// Applies every registered transform to `value` in place.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a transform or visitor.
    pub fn transform(&self, value: &mut Value) -> Result<(), PolicyError> {
        self.visit("", value)
    }

    fn visit(&self, path: &str, value: &mut Value) -> Result<(), PolicyError> {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    self.visit(&format!("{path}.{key}"), child)?;
                }
                for visitor in &self.object_visitors {
                    visitor(path, map)?;
                }
            }
            Value::Array(items) => {
                let item_path = format!("{path}[]");
                for item in items.iter_mut() {
                    self.visit(&item_path, item)?;
                }
                for transform in &self.slice_transforms {
                    let taken = std::mem::take(items);
                    *items = transform(&item_path, taken)?;
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
        Ok(())
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("slice_transforms", &self.slice_transforms.len())
            .field("object_visitors", &self.object_visitors.len())
            .finish()
    }
}

/// Sorts an array of strings.
///
/// # Errors
///
/// Returns an error if any element is not a string.
pub fn sort_slice(path: &str, values: Vec<Value>) -> Result<Vec<Value>, PolicyError> {
    let mut strings = values
        .into_iter()
        .map(|value| match value {
            Value::String(s) => Ok(s),
            other => Err(PolicyError::new(
                path,
                format!("cannot sort non-string value {other}"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    strings.sort_unstable();
    Ok(strings.into_iter().map(Value::String).collect())
}
