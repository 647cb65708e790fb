//! # frontstack
//!
//! A small static-content pipeline. A flat directory of text files with
//! frontmatter headers goes in; each file becomes a [`Document`], an ordered
//! chain of middleware steps transforms the whole set, and the result is
//! written to a destination directory or exported as structured records.
//!
//! ```text
//! src/hello.md ──→ load ──→ drafts ──→ dates ──→ markdown ──→ build/hello.md
//!                  (frontmatter split)  (middleware, in order)    (or serialize)
//! ```
//!
//! ```rust,no_run
//! use frontstack::pipeline::Pipeline;
//! use frontstack::plugins::{Dates, Drafts, Markdown};
//!
//! let mut pipeline = Pipeline::new("src").with_dest("build");
//! pipeline.use_middleware(Drafts::default());
//! pipeline.use_middleware(Dates::default());
//! pipeline.use_middleware(Markdown::default());
//! pipeline.build(None)?;
//! # Ok::<(), frontstack::pipeline::PipelineError>(())
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | The core: middleware registration, `run`, cached `get`, ordered `iter`, `build`, `serialize` |
//! | [`middleware`] | The step contract (`Middleware`), the in-flight `FileSet`, and the `Context` steps see |
//! | [`document`] | `Document` and the loader that reads one file from the source directory |
//! | [`frontmatter`] | Splits a YAML (`---`) or TOML (`+++`) header from the body |
//! | [`value`] | `Value`, the metadata value union with a total order |
//! | [`plugins`] | Built-in steps: drafts, dates, markdown, sanitize, linkify, templates |
//! | [`config`] | `frontstack.toml` loading, merging with stock defaults, and validation |
//! | [`types`] | Shared map aliases (`Metadata`, `Record`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Steps Own Nothing But Their Configuration
//!
//! A step receives the file set by exclusive reference and the pipeline
//! [`Context`](middleware::Context) alongside it. It can drop documents, add
//! them, rewrite them, and leave notes in pipeline metadata for later steps.
//! Because each step finishes before the next starts, ordering is the only
//! coordination: filter drafts before rendering, sanitize after markdown,
//! apply templates last.
//!
//! ## Closures Are Steps
//!
//! Any `Fn(&mut FileSet, &mut Context) -> Result<(), MiddlewareError>` is a
//! [`Middleware`](middleware::Middleware). Built-in steps are plain structs
//! configured at construction, so each is usable and testable on its own.
//!
//! ## Maud Layouts
//!
//! HTML layouts are Rust functions built with [Maud](https://maud.lambda.xyz/)
//! rather than runtime template files. A malformed layout is a compile
//! error, every interpolated value is escaped, and there is no template
//! directory to ship.
//!
//! ## One Directory, One Process
//!
//! There is no dependency graph, no watch mode, and no cache on disk. The
//! in-process cache exists so that `get` and `iter` can serve a document
//! without reprocessing it; `run` rebuilds it from scratch.
//!
//! [`Document`]: document::Document

pub mod config;
pub mod document;
pub mod frontmatter;
pub mod middleware;
pub mod output;
pub mod pipeline;
pub mod plugins;
pub mod types;
pub mod value;

#[cfg(test)]
pub(crate) mod test_helpers;
