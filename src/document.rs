//! Documents and the document loader.
//!
//! A [`Document`] pairs a metadata map with a mutable body. It is identified by
//! its source filename, which is fixed when the document is created; middleware
//! rewrites `metadata` and `content` freely but cannot rename a document.
//!
//! ## Derived fields
//!
//! Loading sets two metadata fields from the path:
//!
//! - `filename`: the basename, e.g. `hello.md`
//! - `slug`: the basename with its last extension removed, e.g. `hello`
//!
//! If the header already defines either key, the derived value wins. This
//! keeps the exported record consistent with the cache key.

use crate::frontmatter::{self, FrontmatterError};
use crate::types::{Metadata, Record};
use crate::value::Value;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

impl DocumentError {
    /// True when the source file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    filename: String,
    slug: String,
    pub metadata: Metadata,
    pub content: String,
}

impl Document {
    /// Create a document from already-split parts.
    ///
    /// `filename` and `slug` are written into `metadata`, overwriting any
    /// author-supplied values of the same name.
    pub fn new(filename: impl Into<String>, mut metadata: Metadata, content: impl Into<String>) -> Self {
        let filename = filename.into();
        let slug = slug_for(&filename);
        metadata.insert("filename".to_string(), Value::from(filename.as_str()));
        metadata.insert("slug".to_string(), Value::from(slug.as_str()));
        Self {
            filename,
            slug,
            metadata,
            content: content.into(),
        }
    }

    /// Read `source/filename` and split it into header and body.
    pub fn load(source: &Path, filename: &str) -> Result<Self, DocumentError> {
        let path = source.join(filename);
        let raw = fs::read_to_string(&path)?;
        let (metadata, content) = frontmatter::parse(&raw)?;
        tracing::debug!(file = filename, fields = metadata.len(), "Loaded document");
        Ok(Self::new(filename, metadata, content))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Set a metadata field, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.metadata.insert(key.into(), value.into())
    }

    /// `title` metadata as text, if the header has one.
    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }

    /// Export form: a copy of the metadata with `content` added.
    ///
    /// A metadata field named `content` is shadowed by the body.
    pub fn to_record(&self) -> Record {
        let mut record = self.metadata.clone();
        record.insert("content".to_string(), Value::from(self.content.as_str()));
        record
    }
}

/// Strip the last extension from a filename.
///
/// Dotfiles keep their name: `.hidden` has no extension to strip.
pub fn slug_for(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn slug_strips_last_extension() {
        assert_eq!(slug_for("hello.md"), "hello");
        assert_eq!(slug_for("archive.tar.gz"), "archive.tar");
        assert_eq!(slug_for("README"), "README");
        assert_eq!(slug_for(".hidden"), ".hidden");
    }

    #[test]
    fn load_splits_header_and_sets_derived_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("hello.md"),
            "---\ntitle: Hello, world!\n---\nHi there.\n",
        )
        .unwrap();

        let doc = Document::load(tmp.path(), "hello.md").unwrap();
        assert_eq!(doc.filename(), "hello.md");
        assert_eq!(doc.slug(), "hello");
        assert_eq!(doc.title(), Some("Hello, world!"));
        assert_eq!(doc.get("filename"), Some(&Value::from("hello.md")));
        assert_eq!(doc.get("slug"), Some(&Value::from("hello")));
        assert_eq!(doc.content, "Hi there.\n");
    }

    #[test]
    fn derived_fields_overwrite_author_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("post.md"),
            "---\nslug: custom\nfilename: other.md\n---\nBody",
        )
        .unwrap();

        let doc = Document::load(tmp.path(), "post.md").unwrap();
        assert_eq!(doc.get("slug"), Some(&Value::from("post")));
        assert_eq!(doc.get("filename"), Some(&Value::from("post.md")));
    }

    #[test]
    fn missing_file_is_not_found_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = Document::load(tmp.path(), "nope.md").unwrap_err();
        assert!(matches!(err, DocumentError::Io(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn bad_header_is_frontmatter_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad.md"), "---\ntitle: Hi\n").unwrap();

        let err = Document::load(tmp.path(), "bad.md").unwrap_err();
        assert!(matches!(err, DocumentError::Frontmatter(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn record_contains_metadata_and_content() {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), Value::from("T"));
        metadata.insert("content".into(), Value::from("shadowed"));
        let doc = Document::new("a.md", metadata, "Body");

        let record = doc.to_record();
        assert_eq!(record["title"], Value::from("T"));
        assert_eq!(record["content"], Value::from("Body"));
        assert_eq!(record["slug"], Value::from("a"));
    }
}
