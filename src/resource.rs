//! Lazily readable resource bodies.
//!
//! Policy documents are passed around as [`Resource`]s rather than raw
//! strings so that large bodies kept in external files are only read when a
//! reconciliation step actually needs their content.

use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ResourceError;

/// A byte-producing resource that can be opened any number of times.
pub trait Resource: fmt::Debug + Send + Sync {
    /// Opens a fresh reader over the resource content.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying content cannot be opened.
    fn open(&self) -> Result<Box<dyn Read + '_>, ResourceError>;
}

/// Shared handle to a resource.
pub type SharedResource = Arc<dyn Resource>;

/// Reads a resource fully as bytes.
///
/// # Errors
///
/// Returns an error if the resource cannot be opened or read.
pub fn resource_as_bytes(resource: &dyn Resource) -> Result<Vec<u8>, ResourceError> {
    let mut reader = resource.open()?;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).map_err(ResourceError::Read)?;
    Ok(buf)
}

/// Reads a resource fully as a UTF-8 string.
///
/// # Errors
///
/// Returns an error if the resource cannot be read or is not valid UTF-8.
pub fn resource_as_string(resource: &dyn Resource) -> Result<String, ResourceError> {
    Ok(String::from_utf8(resource_as_bytes(resource)?)?)
}

/// In-memory resource holding a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringResource {
    body: String,
}

impl StringResource {
    /// Creates a resource from a string.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Creates a shared resource from a string.
    #[must_use]
    pub fn shared(body: impl Into<String>) -> SharedResource {
        Arc::new(Self::new(body))
    }

    /// Returns the content without going through a reader.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.body
    }
}

impl Resource for StringResource {
    fn open(&self) -> Result<Box<dyn Read + '_>, ResourceError> {
        Ok(Box::new(Cursor::new(self.body.as_bytes())))
    }
}

/// Resource backed by a file that is read only when opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    /// Creates a resource pointing at a file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FileResource {
    fn open(&self) -> Result<Box<dyn Read + '_>, ResourceError> {
        let file = std::fs::File::open(&self.path).map_err(|source| ResourceError::File {
            path: self.path.clone(),
            source,
        })?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_string_resource_reads_repeatedly() {
        let resource = StringResource::new(r#"{"Version":"2012-10-17"}"#);

        let first = resource_as_string(&resource).expect("read failed");
        let second = resource_as_string(&resource).expect("read failed");

        assert_eq!(first, second);
        assert_eq!(first, resource.as_str());
    }

    #[test]
    fn test_file_resource_is_lazy() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        let resource = FileResource::new(file.path());

        // Written after construction: the content is picked up on read.
        write!(file, "late content").expect("write failed");
        file.flush().expect("flush failed");

        assert_eq!(resource_as_string(&resource).expect("read failed"), "late content");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let resource = FileResource::new("/definitely/not/here.json");
        let err = resource_as_string(&resource).expect_err("read should fail");

        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_invalid_utf8() {
        #[derive(Debug)]
        struct Binary;

        impl Resource for Binary {
            fn open(&self) -> Result<Box<dyn Read + '_>, ResourceError> {
                Ok(Box::new(Cursor::new(vec![0xff, 0xfe])))
            }
        }

        assert!(matches!(
            resource_as_string(&Binary),
            Err(ResourceError::InvalidUtf8(_))
        ));
        assert_eq!(resource_as_bytes(&Binary).expect("bytes"), vec![0xff, 0xfe]);
    }
}
