//! The middleware contract.
//!
//! A middleware step is one unit of transformation in a [`Pipeline`]. Steps run
//! in registration order, each receiving the whole in-flight [`FileSet`] by
//! exclusive reference plus the pipeline's [`Context`]:
//!
//! ```ignore
//! pipeline.use_middleware(|files: &mut FileSet, ctx: &mut Context| -> Result<(), MiddlewareError> {
//!     ctx.metadata_mut().insert("count".into(), files.len().into());
//!     Ok(())
//! });
//! ```
//!
//! A step may rewrite document content and metadata, remove documents (later
//! steps see the reduced set), add documents, and write pipeline-scoped
//! metadata that later steps and the caller can read. Returning an error
//! aborts the operation that triggered the run.
//!
//! Any closure with the right signature is a step. Steps that carry
//! configuration implement [`Middleware`] directly; see [`crate::plugins`].
//!
//! [`Pipeline`]: crate::pipeline::Pipeline

use crate::document::Document;
use crate::types::Metadata;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MiddlewareError {
    #[error("{filename}: cannot parse `{field}` value {value:?} as a date")]
    InvalidDate {
        filename: String,
        field: String,
        value: String,
    },
    #[error("{filename}: unknown template `{template}`")]
    UnknownTemplate { filename: String, template: String },
    #[error("{0}")]
    Custom(String),
}

/// A transformation step applied to the in-flight file set.
pub trait Middleware {
    /// Name used in logs and error messages.
    fn name(&self) -> &str {
        "middleware"
    }

    fn apply(&self, files: &mut FileSet, ctx: &mut Context) -> Result<(), MiddlewareError>;
}

impl<F> Middleware for F
where
    F: Fn(&mut FileSet, &mut Context) -> Result<(), MiddlewareError>,
{
    fn apply(&self, files: &mut FileSet, ctx: &mut Context) -> Result<(), MiddlewareError> {
        self(files, ctx)
    }
}

/// The pipeline state a step can see.
///
/// Paths are read-only here; pipeline metadata is a free-form side channel
/// (aggregate counts, site titles, anything steps want to share).
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub(crate) source: PathBuf,
    pub(crate) dest: Option<PathBuf>,
    pub(crate) metadata: Metadata,
}

impl Context {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dest(&self) -> Option<&Path> {
        self.dest.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Documents keyed by filename.
///
/// Documents are always stored under their own filename, so a key can never
/// disagree with the document it maps to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSet {
    docs: BTreeMap<String, Document>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document under its filename, returning any document it replaced.
    pub fn insert(&mut self, doc: Document) -> Option<Document> {
        self.docs.insert(doc.filename().to_string(), doc)
    }

    pub fn get(&self, filename: &str) -> Option<&Document> {
        self.docs.get(filename)
    }

    pub fn get_mut(&mut self, filename: &str) -> Option<&mut Document> {
        self.docs.get_mut(filename)
    }

    pub fn remove(&mut self, filename: &str) -> Option<Document> {
        self.docs.remove(filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.docs.contains_key(filename)
    }

    /// Keep only the documents for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Document) -> bool) {
        self.docs.retain(|_, doc| keep(doc));
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn clear(&mut self) {
        self.docs.clear();
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.docs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Document> {
        self.docs.values_mut()
    }
}

impl Extend<Document> for FileSet {
    fn extend<I: IntoIterator<Item = Document>>(&mut self, iter: I) {
        for doc in iter {
            self.insert(doc);
        }
    }
}

impl FromIterator<Document> for FileSet {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        let mut files = FileSet::new();
        files.extend(iter);
        files
    }
}

impl IntoIterator for FileSet {
    type Item = Document;
    type IntoIter = btree_map::IntoValues<String, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_values()
    }
}
