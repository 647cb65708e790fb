//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Documents are listed by their semantic identity (position and title),
//! with the source filename and other details shown as indented context
//! lines. Untitled documents fall back to their filename in parentheses.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! 001 Hello, world!
//!     Source: hello.markdown
//!     Date: 2013-06-07T00:00:00
//!     Excerpt: Lorem ipsum dolor sit amet...
//! 002 (notes.md)
//!     Source: notes.md
//! ```
//!
//! ## Build
//!
//! ```text
//! hello.markdown → build/hello.markdown
//! network-diagrams.markdown → build/network-diagrams.markdown
//!
//! Built 2 documents
//! ```
//!
//! ## Check
//!
//! ```text
//! Documents
//! 001 Hello, world!
//!     Source: hello.markdown
//!
//! Metadata
//!     site_title: My Site
//!
//! Processed 1 document with 3 middleware
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::document::Document;
use crate::types::Metadata;
use std::path::{Path, PathBuf};

const EXCERPT_LEN: usize = 60;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Header line: titled documents show their title, untitled show the filename
/// in parens.
///
/// ```text
/// 001 Hello, world!
/// 002 (notes.md)
/// ```
fn document_header(index: usize, doc: &Document) -> String {
    match doc.title() {
        Some(t) if !t.trim().is_empty() => format!("{} {}", format_index(index), t),
        _ => format!("{} ({})", format_index(index), doc.filename()),
    }
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// First line of visible text in a document body.
fn excerpt(content: &str) -> Option<String> {
    let text = strip_html_tags(content);
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(truncate(line, EXCERPT_LEN))
}

/// Header plus indented context lines for one document.
fn document_lines(index: usize, doc: &Document) -> Vec<String> {
    let mut lines = vec![document_header(index, doc)];
    lines.push(format!("    Source: {}", doc.filename()));
    if let Some(date) = doc.get("date") {
        lines.push(format!("    Date: {date}"));
    }
    if let Some(text) = excerpt(&doc.content) {
        lines.push(format!("    Excerpt: {text}"));
    }
    lines
}

// ============================================================================
// list
// ============================================================================

/// Format documents in the order given.
pub fn format_list_output(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .enumerate()
        .flat_map(|(i, doc)| document_lines(i + 1, doc))
        .collect()
}

pub fn print_list_output(docs: &[Document]) {
    for line in format_list_output(docs) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

/// Format written paths relative to the destination directory's parent, so
/// the listing reads `name → dest/name`.
pub fn format_build_output(written: &[PathBuf], dest: &Path) -> Vec<String> {
    let base = dest.parent().unwrap_or(Path::new(""));
    let mut lines: Vec<String> = written
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let shown = path.strip_prefix(base).unwrap_or(path);
            format!("{} → {}", name, shown.display())
        })
        .collect();

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!("Built {}", plural(written.len(), "document")));
    lines
}

pub fn print_build_output(written: &[PathBuf], dest: &Path) {
    for line in format_build_output(written, dest) {
        println!("{}", line);
    }
}

// ============================================================================
// check
// ============================================================================

/// Format the result of a dry run: documents, pipeline metadata, and a
/// summary.
pub fn format_check_output<'a>(
    docs: impl IntoIterator<Item = &'a Document>,
    metadata: &Metadata,
    middleware: &[&str],
) -> Vec<String> {
    let mut lines = vec!["Documents".to_string()];
    let mut count = 0;
    for (i, doc) in docs.into_iter().enumerate() {
        lines.push(document_header(i + 1, doc));
        lines.push(format!("    Source: {}", doc.filename()));
        count += 1;
    }

    if !metadata.is_empty() {
        lines.push(String::new());
        lines.push("Metadata".to_string());
        for (key, value) in metadata {
            lines.push(format!("    {key}: {value}"));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Processed {} with {} middleware",
        plural(count, "document"),
        middleware.len()
    ));
    if !middleware.is_empty() {
        lines.push(format!("    {}", middleware.join(" → ")));
    }
    lines
}

pub fn print_check_output<'a>(
    docs: impl IntoIterator<Item = &'a Document>,
    metadata: &Metadata,
    middleware: &[&str],
) {
    for line in format_check_output(docs, metadata, middleware) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
