//! Shared types used across the loader, the pipeline and the middleware.

use crate::value::Value;
use std::collections::BTreeMap;

/// A document's header fields, or the pipeline's side-channel state.
///
/// Keys are author-controlled. A few are conventions honored by specific
/// middleware (`draft`, `date`, `template`), none are reserved by the core
/// except `filename` and `slug`, which the loader always sets.
pub type Metadata = BTreeMap<String, Value>;

/// Export form of a document: every metadata key plus `content`.
///
/// This is the shape handed to serializers (`serde_json` in the CLI).
pub type Record = BTreeMap<String, Value>;
