//! Terraform render target.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{HalldyllError, RenderError, Result};
use crate::resource::{resource_as_bytes, Resource};

use super::literal::{sanitize_name, Literal};

/// Name of the generated Terraform file.
pub const MAIN_FILE: &str = "main.tf.json";

/// Directory, relative to the output root, holding file artifacts.
pub const DATA_DIR: &str = "data";

/// Sink for declarative resource descriptions.
pub trait DeclarativeSink {
    /// Returns true if a block with this type and (sanitized) name exists.
    fn has_resource(&self, resource_type: &str, resource_name: &str) -> bool;

    /// Stores `content` as a side artifact and returns an expression that
    /// reads it back.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be read or the artifact
    /// already exists.
    fn add_file_resource(
        &mut self,
        resource_type: &str,
        resource_name: &str,
        key: &str,
        content: &dyn Resource,
        base64: bool,
    ) -> Result<Literal>;

    /// Emits one resource block.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is not an object or was already rendered.
    fn render_resource(
        &mut self,
        resource_type: &str,
        resource_name: &str,
        body: Value,
    ) -> Result<()>;
}

/// In-memory Terraform configuration, written out by [`TerraformTarget::finish`].
#[derive(Debug, Default)]
pub struct TerraformTarget {
    /// Side artifacts, keyed by path relative to the output root.
    files: BTreeMap<String, Vec<u8>>,
    /// Resource blocks, keyed by type then sanitized name.
    resources: BTreeMap<String, BTreeMap<String, Value>>,
}

impl TerraformTarget {
    /// Creates an empty target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Side artifacts collected so far.
    #[must_use]
    pub const fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    /// A rendered resource block, looked up by its unsanitized name.
    #[must_use]
    pub fn resource(&self, resource_type: &str, resource_name: &str) -> Option<&Value> {
        self.resources
            .get(resource_type)
            .and_then(|by_name| by_name.get(&sanitize_name(resource_name)))
    }

    /// Number of rendered resource blocks.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }

    /// Builds the JSON document for [`MAIN_FILE`].
    #[must_use]
    pub fn to_document(&self) -> Value {
        let mut resource = Map::new();
        for (resource_type, by_name) in &self.resources {
            let blocks: Map<String, Value> = by_name
                .iter()
                .map(|(name, body)| (name.clone(), body.clone()))
                .collect();
            resource.insert(resource_type.clone(), Value::Object(blocks));
        }

        json!({
            "terraform": {
                "required_providers": {
                    "aws": { "source": "hashicorp/aws" }
                }
            },
            "resource": resource,
        })
    }

    /// Writes [`MAIN_FILE`] and every artifact below `out_dir`.
    ///
    /// Returns the written paths.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub async fn finish(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        info!("Writing Terraform output to {}", out_dir.display());

        fs::create_dir_all(out_dir.join(DATA_DIR)).await?;

        let mut written = Vec::with_capacity(self.files.len() + 1);

        for (relative, content) in &self.files {
            let path = out_dir.join(relative);
            debug!("Writing {}", path.display());
            fs::write(&path, content).await?;
            written.push(path);
        }

        let document = serde_json::to_string_pretty(&self.to_document()).map_err(|e| {
            HalldyllError::Render(RenderError::sink(format!("failed to serialize {MAIN_FILE}: {e}")))
        })?;
        let main_path = out_dir.join(MAIN_FILE);
        fs::write(&main_path, document).await?;
        written.push(main_path);

        Ok(written)
    }
}

impl DeclarativeSink for TerraformTarget {
    fn has_resource(&self, resource_type: &str, resource_name: &str) -> bool {
        self.resource(resource_type, resource_name).is_some()
    }

    fn add_file_resource(
        &mut self,
        resource_type: &str,
        resource_name: &str,
        key: &str,
        content: &dyn Resource,
        base64: bool,
    ) -> Result<Literal> {
        let relative = format!(
            "{DATA_DIR}/{resource_type}_{}_{key}",
            sanitize_name(resource_name)
        );
        if self.files.contains_key(&relative) {
            return Err(HalldyllError::Render(RenderError::sink(format!(
                "file artifact {relative} already added"
            ))));
        }

        let bytes = resource_as_bytes(content)?;
        debug!("Adding file artifact {relative} ({} bytes)", bytes.len());
        self.files.insert(relative.clone(), bytes);

        Ok(Literal::file(&relative, base64))
    }

    fn render_resource(
        &mut self,
        resource_type: &str,
        resource_name: &str,
        body: Value,
    ) -> Result<()> {
        if !body.is_object() {
            return Err(HalldyllError::Render(RenderError::sink(format!(
                "{resource_type}.{resource_name} must render to an object"
            ))));
        }

        let name = sanitize_name(resource_name);
        let by_name = self.resources.entry(resource_type.to_string()).or_default();
        if by_name.contains_key(&name) {
            return Err(HalldyllError::Render(RenderError::sink(format!(
                "duplicate resource {resource_type}.{name}"
            ))));
        }

        debug!("Rendering {resource_type}.{name}");
        by_name.insert(name, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::StringResource;
    use tempfile::TempDir;

    #[test]
    fn test_add_file_resource() {
        let mut target = TerraformTarget::new();
        let literal = target
            .add_file_resource("aws_sqs_queue", "a.fifo", "policy", &StringResource::new("{}"), false)
            .expect("add failed");

        assert_eq!(
            literal.as_str(),
            r#"${file("${path.module}/data/aws_sqs_queue_a-fifo_policy")}"#
        );
        assert_eq!(
            target.files().get("data/aws_sqs_queue_a-fifo_policy"),
            Some(&b"{}".to_vec())
        );

        let duplicate =
            target.add_file_resource("aws_sqs_queue", "a.fifo", "policy", &StringResource::new("{}"), false);
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_render_resource_rejects_duplicates_and_non_objects() {
        let mut target = TerraformTarget::new();
        target
            .render_resource("aws_sqs_queue", "q", json!({"name": "q"}))
            .expect("render failed");

        assert!(target.render_resource("aws_sqs_queue", "q", json!({"name": "q"})).is_err());
        assert!(target.render_resource("aws_sqs_queue", "r", json!("q")).is_err());
        assert_eq!(target.resource_count(), 1);
        assert!(target.has_resource("aws_sqs_queue", "q"));
        assert!(!target.has_resource("aws_sqs_queue", "r"));
        assert_eq!(target.resource("aws_sqs_queue", "q"), Some(&json!({"name": "q"})));
    }

    #[tokio::test]
    async fn test_finish_writes_files() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut target = TerraformTarget::new();
        let policy = target
            .add_file_resource("aws_sqs_queue", "q", "policy", &StringResource::new("{\"a\":1}"), false)
            .expect("add failed");
        target
            .render_resource("aws_sqs_queue", "q", json!({"name": "q", "policy": policy}))
            .expect("render failed");

        let written = target.finish(temp.path()).await.expect("finish failed");
        assert_eq!(written.len(), 2);

        let artifact = std::fs::read_to_string(temp.path().join("data/aws_sqs_queue_q_policy"))
            .expect("artifact missing");
        assert_eq!(artifact, "{\"a\":1}");

        let main: Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join(MAIN_FILE)).expect("main missing"),
        )
        .expect("main is not JSON");
        assert_eq!(main["resource"]["aws_sqs_queue"]["q"]["name"], json!("q"));
        assert_eq!(
            main["terraform"]["required_providers"]["aws"]["source"],
            json!("hashicorp/aws")
        );
    }
}
