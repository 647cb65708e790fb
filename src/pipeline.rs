//! The pipeline core.
//!
//! A [`Pipeline`] owns a source directory, an optional destination, an ordered
//! list of middleware steps, pipeline-scoped metadata, and a cache of processed
//! documents keyed by filename.
//!
//! ```text
//! source/          load            middleware (in order)        cache
//! ├── a.md   ──→  Document  ──→  drafts → dates → markdown  ──→  FileSet
//! └── b.md   ──→  Document  ──↗                                   │
//!                                                   build ←───────┤
//!                                                   serialize ←───┤
//!                                                   get / iter ←──┘
//! ```
//!
//! ## Operations
//!
//! - [`run`](Pipeline::run): load every file, apply the whole chain once to the
//!   full set, and replace the cache with the result.
//! - [`get`](Pipeline::get): serve one file from the cache, or load it and
//!   apply the chain to a set holding only that file. Cached entries are never
//!   reprocessed unless the caller asks for a reset.
//! - [`iter`](Pipeline::iter): `get` every source file in sorted filename
//!   order, silently skipping files the middleware filtered out.
//! - [`build`](Pipeline::build): write every cached document's content to the
//!   destination directory, running first if the cache is empty.
//! - [`serialize`](Pipeline::serialize): export cached documents as records.
//!
//! ## Caching
//!
//! `run` replaces the cache wholesale, so files that disappeared from the
//! source or were filtered out no longer linger. `get` merges into the cache.
//! Nothing expires on its own: use `get(.., true)`, [`invalidate`],
//! or [`clear_cache`] to force reprocessing.
//!
//! Per-file processing means steps see a single-document set. Steps that
//! aggregate across documents (counts, indexes) only see the whole set
//! through `run`.
//!
//! ## Threading
//!
//! Steps are shared through `Rc` and mutate the file set and metadata without
//! synchronization. A `Pipeline` is neither `Send` nor `Sync`.
//!
//! [`invalidate`]: Pipeline::invalidate
//! [`clear_cache`]: Pipeline::clear_cache

use crate::config::{self, ConfigError, StackConfig};
use crate::document::{Document, DocumentError};
use crate::middleware::{Context, FileSet, Middleware, MiddlewareError};
use crate::plugins;
use crate::types::{Metadata, Record};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::vec;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("{filename}: {source}")]
    Document {
        filename: String,
        source: DocumentError,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error("no destination directory configured")]
    MissingDestination,
    #[error("unknown middleware `{0}` (expected one of: {names})", names = plugins::NAMES.join(", "))]
    UnknownMiddleware(String),
    #[error("middleware `{name}` failed: {source}")]
    Middleware {
        name: String,
        source: MiddlewareError,
    },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// How [`Pipeline::serialize`] orders its records.
#[derive(Clone, Copy, Default)]
pub enum Order<'a> {
    /// Whatever order the cache yields.
    #[default]
    Unsorted,
    /// Records compared as whole maps.
    Natural,
    /// Ascending by a derived key. Ties keep their relative order.
    By(&'a dyn Fn(&Record) -> Value),
}

pub struct Pipeline {
    context: Context,
    middleware: Vec<Rc<dyn Middleware>>,
    files: FileSet,
}

impl Pipeline {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            context: Context {
                source: source.into(),
                dest: None,
                metadata: Metadata::new(),
            },
            middleware: Vec::new(),
            files: FileSet::new(),
        }
    }

    pub fn with_dest(mut self, dest: impl Into<PathBuf>) -> Self {
        self.context.dest = Some(dest.into());
        self
    }

    /// Seed a pipeline metadata value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.metadata.insert(key.into(), value.into());
        self
    }

    /// Build a pipeline from a loaded config: paths, seed metadata, and the
    /// listed middleware in order.
    pub fn from_config(config: &StackConfig) -> Result<Self, PipelineError> {
        let mut pipeline = Self::new(&config.source);
        if let Some(dest) = &config.dest {
            pipeline.context.dest = Some(PathBuf::from(dest));
        }
        for (key, value) in &config.metadata {
            pipeline
                .context
                .metadata
                .insert(key.clone(), Value::from(value.clone()));
        }
        for name in &config.middleware {
            pipeline.use_named(name, config)?;
        }
        Ok(pipeline)
    }

    /// Load `frontstack.toml` (or stock defaults when it's missing) and build
    /// a pipeline from it.
    pub fn from_config_file(path: &Path) -> Result<Self, PipelineError> {
        let config = config::load_config(path)?;
        Self::from_config(&config)
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Append a step and hand back a handle to that same step.
    ///
    /// The handle lets callers keep talking to a stateful step after
    /// registering it.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, step: M) -> Rc<M> {
        let step = Rc::new(step);
        self.middleware.push(step.clone());
        step
    }

    /// Append a step that is already shared.
    pub fn use_shared(&mut self, step: Rc<dyn Middleware>) {
        self.middleware.push(step);
    }

    /// Append a built-in step by name, configured from `config`.
    ///
    /// Unknown names are rejected and leave the middleware list untouched.
    pub fn use_named(
        &mut self,
        name: &str,
        config: &StackConfig,
    ) -> Result<Rc<dyn Middleware>, PipelineError> {
        let step = plugins::build(name, config)
            .ok_or_else(|| PipelineError::UnknownMiddleware(name.to_string()))?;
        self.middleware.push(step.clone());
        Ok(step)
    }

    pub fn middleware_names(&self) -> Vec<&str> {
        self.middleware.iter().map(|step| step.name()).collect()
    }

    /// Remove every step. The cache is left as is.
    pub fn clear_middleware(&mut self) {
        self.middleware.clear();
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn source(&self) -> &Path {
        self.context.source()
    }

    pub fn dest(&self) -> Option<&Path> {
        self.context.dest()
    }

    pub fn metadata(&self) -> &Metadata {
        self.context.metadata()
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        self.context.metadata_mut()
    }

    /// Point the pipeline at another directory. Clears the cache.
    pub fn set_source(&mut self, source: impl Into<PathBuf>) {
        self.context.source = source.into();
        self.files.clear();
    }

    pub fn set_dest(&mut self, dest: impl Into<PathBuf>) {
        self.context.dest = Some(dest.into());
    }

    /// The cache: the last known processed documents.
    pub fn files(&self) -> &FileSet {
        &self.files
    }

    /// Drop one cached document so the next `get` reprocesses it.
    pub fn invalidate(&mut self, filename: &str) -> Option<Document> {
        self.files.remove(filename)
    }

    pub fn clear_cache(&mut self) {
        self.files.clear();
    }

    // ------------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------------

    /// Load every source file, apply all steps, and replace the cache.
    ///
    /// Returns the new cache, which omits any documents a step removed.
    pub fn run(&mut self) -> Result<&FileSet, PipelineError> {
        let mut files = FileSet::new();
        for filename in self.list_source()? {
            files.insert(self.load(&filename)?);
        }
        let loaded = files.len();
        self.process(&mut files)?;
        tracing::debug!(
            source = %self.context.source.display(),
            loaded,
            kept = files.len(),
            "Pipeline run complete"
        );
        self.files = files;
        Ok(&self.files)
    }

    /// One processed document, from the cache when possible.
    ///
    /// With `reset`, any cached entry is discarded and the file is processed
    /// again with the current middleware. Fails with
    /// [`PipelineError::NotFound`] when the file doesn't exist or a step
    /// filtered it out.
    pub fn get(&mut self, filename: &str, reset: bool) -> Result<&Document, PipelineError> {
        if !reset && self.files.contains(filename) {
            tracing::debug!(file = filename, "Cache hit");
        } else {
            if reset {
                self.files.remove(filename);
            }
            let mut files = FileSet::new();
            files.insert(self.load(filename)?);
            self.process(&mut files)?;
            self.files.extend(files);
        }
        self.files
            .get(filename)
            .ok_or_else(|| PipelineError::NotFound(filename.to_string()))
    }

    /// Every source file through [`get`](Self::get), in filename order.
    ///
    /// The directory is listed and sorted up front; documents are processed
    /// lazily as the iterator advances. Files a step filters out are skipped.
    pub fn iter(&mut self, reset: bool, reverse: bool) -> Result<Iter<'_>, PipelineError> {
        let mut names = self.list_source()?;
        names.sort();
        if reverse {
            names.reverse();
        }
        Ok(Iter {
            pipeline: self,
            names: names.into_iter(),
            reset,
        })
    }

    /// Write every cached document's content to `dest/<filename>`.
    ///
    /// `dest` overrides the configured destination and becomes the new
    /// configured one. The directory is created if needed and existing files
    /// are overwritten. Returns the written paths in filename order.
    pub fn build(&mut self, dest: Option<&Path>) -> Result<Vec<PathBuf>, PipelineError> {
        let dest = match dest.filter(|d| !d.as_os_str().is_empty()) {
            Some(dest) => dest.to_path_buf(),
            None => self
                .context
                .dest
                .clone()
                .ok_or(PipelineError::MissingDestination)?,
        };
        self.context.dest = Some(dest.clone());
        fs::create_dir_all(&dest)?;

        self.ensure_processed()?;

        let mut written = Vec::with_capacity(self.files.len());
        for doc in self.files.iter() {
            let path = dest.join(doc.filename());
            fs::write(&path, doc.content.as_bytes())?;
            written.push(path);
        }
        tracing::info!(dest = %dest.display(), files = written.len(), "Build complete");
        Ok(written)
    }

    /// Export cached documents as records (metadata plus `content`).
    pub fn serialize(&mut self, order: Order<'_>) -> Result<Vec<Record>, PipelineError> {
        self.ensure_processed()?;
        let mut records: Vec<Record> = self.files.iter().map(Document::to_record).collect();
        match order {
            Order::Unsorted => {}
            Order::Natural => records.sort(),
            Order::By(key) => records.sort_by_key(|record| key(record)),
        }
        Ok(records)
    }

    /// Export cached documents as records keyed by filename.
    pub fn serialize_map(&mut self) -> Result<BTreeMap<String, Record>, PipelineError> {
        self.ensure_processed()?;
        Ok(self
            .files
            .iter()
            .map(|doc| (doc.filename().to_string(), doc.to_record()))
            .collect())
    }

    fn ensure_processed(&mut self) -> Result<(), PipelineError> {
        if self.files.is_empty() {
            self.run()?;
        }
        Ok(())
    }

    fn process(&mut self, files: &mut FileSet) -> Result<(), PipelineError> {
        for step in &self.middleware {
            tracing::debug!(middleware = step.name(), files = files.len(), "Applying middleware");
            step.apply(files, &mut self.context)
                .map_err(|source| PipelineError::Middleware {
                    name: step.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    fn load(&self, filename: &str) -> Result<Document, PipelineError> {
        Document::load(&self.context.source, filename).map_err(|source| {
            if source.is_not_found() {
                PipelineError::NotFound(filename.to_string())
            } else {
                PipelineError::Document {
                    filename: filename.to_string(),
                    source,
                }
            }
        })
    }

    /// Names of the regular files directly inside the source directory.
    ///
    /// Symlinks to files count; subdirectories and non-UTF-8 names don't.
    fn list_source(&self) -> Result<Vec<String>, PipelineError> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.context.source)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) => names.push(name.to_string()),
                None => tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 filename"),
            }
        }
        Ok(names)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("context", &self.context)
            .field("middleware", &self.middleware_names())
            .field("files", &self.files)
            .finish()
    }
}

/// Lazy ordered iteration returned by [`Pipeline::iter`].
pub struct Iter<'a> {
    pipeline: &'a mut Pipeline,
    names: vec::IntoIter<String>,
    reset: bool,
}

impl Iterator for Iter<'_> {
    type Item = Result<Document, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        for filename in self.names.by_ref() {
            match self.pipeline.get(&filename, self.reset) {
                Ok(doc) => return Some(Ok(doc.clone())),
                Err(PipelineError::NotFound(_)) => {
                    tracing::debug!(file = %filename, "Skipping filtered document");
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
