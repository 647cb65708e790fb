//! Draft filtering.
//!
//! Removes every document whose draft flag is truthy. Single-file lookups of
//! a draft then report it as not found.

use crate::middleware::{Context, FileSet, Middleware, MiddlewareError};

pub struct Drafts {
    field: String,
}

impl Drafts {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Default for Drafts {
    fn default() -> Self {
        Self::new("draft")
    }
}

impl Middleware for Drafts {
    fn name(&self) -> &str {
        "drafts"
    }

    fn apply(&self, files: &mut FileSet, _ctx: &mut Context) -> Result<(), MiddlewareError> {
        let before = files.len();
        files.retain(|doc| !doc.get(&self.field).is_some_and(|v| v.is_truthy()));
        tracing::debug!(removed = before - files.len(), "Filtered drafts");
        Ok(())
    }
}
