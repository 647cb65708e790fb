//! Shared test utilities.
//!
//! Provides an isolated copy of the fixture posts plus lookup helpers that
//! panic with the available names on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let mut pipeline = Pipeline::new(tmp.path());
//! let files = pipeline.run().unwrap();
//!
//! let hello = find_document(files, "hello.markdown");
//! assert_eq!(hello.title(), Some("Hello, world!"));
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::document::Document;
use crate::middleware::FileSet;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/posts/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/posts");
    for entry in std::fs::read_dir(&fixtures).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), tmp.path().join(entry.file_name())).unwrap();
    }
    tmp
}

// =========================================================================
// Lookups
// =========================================================================

/// Find a document by filename. Panics if not found.
pub fn find_document<'a>(files: &'a FileSet, filename: &str) -> &'a Document {
    files.get(filename).unwrap_or_else(|| {
        let names: Vec<&str> = files.filenames().collect();
        panic!("document '{filename}' not found. Available: {names:?}")
    })
}

/// All filenames in cache order.
pub fn filenames(files: &FileSet) -> Vec<&str> {
    files.filenames().collect()
}
