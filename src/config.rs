//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `frontstack.toml`. Stock defaults
//! are overridden by whatever the user file sets; everything else keeps its
//! default.
//!
//! ## Config File Location
//!
//! `frontstack.toml` in the working directory, or any path given with
//! `--config`:
//!
//! ```text
//! blog/
//! ├── frontstack.toml          # Pipeline config (optional)
//! ├── src/                     # Source documents (flat)
//! │   ├── hello.md
//! │   └── network-diagrams.md
//! └── build/                   # Output (created on build)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source = "src"            # Directory of source documents
//! dest = "build"            # Output directory for `build`
//! middleware = ["drafts", "dates", "markdown"]   # Steps, in execution order
//!
//! [metadata]                # Seed pipeline metadata (any keys)
//! site_title = "My Site"
//!
//! [drafts]
//! field = "draft"
//!
//! [dates]
//! field = "date"
//! formats = []              # chrono formats; empty = built-in list
//!
//! [markdown]
//! tables = true
//! footnotes = true
//! strikethrough = true
//! tasklists = false
//! smart_punctuation = false
//!
//! [sanitize]
//! tags = ["a", "abbr", "acronym", "b", "blockquote", "code", "em", "i", "li", "ol", "strong", "ul"]
//! protocols = ["http", "https", "mailto"]
//! strip_comments = true
//!
//! [sanitize.attributes]
//! a = ["href", "title"]
//! abbr = ["title"]
//! acronym = ["title"]
//!
//! [linkify]
//! nofollow = true
//! skip_tags = ["pre", "code"]
//!
//! [templates]
//! # default = "page"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! middleware = ["drafts", "markdown", "templates"]
//!
//! [templates]
//! default = "page"
//! ```
//!
//! Unknown keys are rejected to catch typos early. The `[metadata]` table is
//! the exception: its keys are free-form.

use crate::plugins::{self, markup, template};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config filename looked up in the working directory.
pub const CONFIG_FILENAME: &str = "frontstack.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `frontstack.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Directory of source documents.
    pub source: String,
    /// Output directory for `build`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    /// Built-in step names, in execution order.
    pub middleware: Vec<String>,
    /// Initial pipeline metadata, visible to every step and layout.
    pub metadata: toml::Table,
    pub drafts: DraftsConfig,
    pub dates: DatesConfig,
    pub markdown: MarkdownConfig,
    pub sanitize: SanitizeConfig,
    pub linkify: LinkifyConfig,
    pub templates: TemplatesConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            source: "src".to_string(),
            dest: Some("build".to_string()),
            middleware: vec![
                "drafts".to_string(),
                "dates".to_string(),
                "markdown".to_string(),
            ],
            metadata: toml::Table::new(),
            drafts: DraftsConfig::default(),
            dates: DatesConfig::default(),
            markdown: MarkdownConfig::default(),
            sanitize: SanitizeConfig::default(),
            linkify: LinkifyConfig::default(),
            templates: TemplatesConfig::default(),
        }
    }
}

impl StackConfig {
    /// Validate names and fields that serde alone can't check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for name in &self.middleware {
            if !plugins::NAMES.contains(&name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "unknown middleware `{name}` (expected one of: {})",
                    plugins::NAMES.join(", ")
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "middleware `{name}` is listed more than once"
                )));
            }
        }
        if self.drafts.field.is_empty() {
            return Err(ConfigError::Validation(
                "drafts.field must not be empty".into(),
            ));
        }
        if self.dates.field.is_empty() {
            return Err(ConfigError::Validation(
                "dates.field must not be empty".into(),
            ));
        }
        if let Some(default) = &self.templates.default {
            if !template::BUILTIN_LAYOUTS.contains(&default.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "templates.default `{default}` is not a built-in layout (expected one of: {})",
                    template::BUILTIN_LAYOUTS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Draft filtering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DraftsConfig {
    /// Metadata flag that marks a document as a draft.
    pub field: String,
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            field: "draft".to_string(),
        }
    }
}

/// Date parsing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatesConfig {
    /// Metadata field holding the date.
    pub field: String,
    /// chrono format strings tried after RFC 3339. Empty uses the built-in list.
    pub formats: Vec<String>,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            field: "date".to_string(),
            formats: Vec::new(),
        }
    }
}

/// Markdown extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub smart_punctuation: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            tasklists: false,
            smart_punctuation: false,
        }
    }
}

/// HTML allow-list settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SanitizeConfig {
    pub tags: Vec<String>,
    /// Allowed attributes per tag; `*` applies to every tag.
    pub attributes: BTreeMap<String, Vec<String>>,
    /// URL schemes allowed in `href`/`src`. Relative URLs are always allowed.
    pub protocols: Vec<String>,
    pub strip_comments: bool,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            tags: markup::DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            attributes: markup::DEFAULT_ATTRIBUTES
                .iter()
                .map(|(tag, attrs)| {
                    (
                        tag.to_string(),
                        attrs.iter().map(|a| a.to_string()).collect(),
                    )
                })
                .collect(),
            protocols: markup::DEFAULT_PROTOCOLS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            strip_comments: true,
        }
    }
}

/// Bare URL linking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkifyConfig {
    pub nofollow: bool,
    /// Elements whose text is never linkified.
    pub skip_tags: Vec<String>,
}

impl Default for LinkifyConfig {
    fn default() -> Self {
        Self {
            nofollow: true,
            skip_tags: markup::DEFAULT_SKIP_TAGS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

/// Layout settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Layout for documents without a `template` field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(StackConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `middleware` list replaces the default list rather than extending it.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<StackConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StackConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<StackConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(path = %path.display(), middleware = ?config.middleware, "Loaded config");
    Ok(config)
}

/// Returns a fully-commented stock `frontstack.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# frontstack configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error (except inside [metadata]).

# Directory of source documents. Only regular files directly inside it are
# read; subdirectories are ignored.
source = "src"

# Output directory written by `frontstack build`.
dest = "build"

# Middleware steps, in execution order. Available:
#   drafts, dates, markdown, sanitize, linkify, templates
# Order matters: filter drafts before rendering, sanitize after markdown,
# apply templates last.
middleware = ["drafts", "dates", "markdown"]

# ---------------------------------------------------------------------------
# Pipeline metadata
# ---------------------------------------------------------------------------
# Free-form values available to every step and layout.
[metadata]
# site_title = "My Site"

# ---------------------------------------------------------------------------
# Drafts
# ---------------------------------------------------------------------------
[drafts]
# Documents whose header sets this field to a truthy value are dropped.
field = "draft"

# ---------------------------------------------------------------------------
# Dates
# ---------------------------------------------------------------------------
[dates]
# Header field parsed into a datetime.
field = "date"

# chrono format strings tried after RFC 3339, first match wins.
# Leave empty for the built-in list (ISO dates, "June 07, 2013", ...).
formats = []

# ---------------------------------------------------------------------------
# Markdown
# ---------------------------------------------------------------------------
[markdown]
tables = true
footnotes = true
strikethrough = true
tasklists = false
# Curly quotes, en/em dashes, ellipses.
smart_punctuation = false

# ---------------------------------------------------------------------------
# Sanitize
# ---------------------------------------------------------------------------
[sanitize]
# Tags kept in the output. Other tags are removed and their text kept;
# script and style lose their content too.
tags = ["a", "abbr", "acronym", "b", "blockquote", "code", "em", "i", "li", "ol", "strong", "ul"]

# URL schemes allowed in href/src. Relative URLs are always allowed.
protocols = ["http", "https", "mailto"]

# Remove HTML comments.
strip_comments = true

# Allowed attributes per tag. Use "*" for attributes allowed on any tag.
[sanitize.attributes]
a = ["href", "title"]
abbr = ["title"]
acronym = ["title"]

# ---------------------------------------------------------------------------
# Linkify
# ---------------------------------------------------------------------------
[linkify]
# Add rel="nofollow" to generated links.
nofollow = true

# Never linkify text inside these elements.
skip_tags = ["pre", "code"]

# ---------------------------------------------------------------------------
# Templates
# ---------------------------------------------------------------------------
[templates]
# Layout for documents without a `template` header field.
# Built-in layouts: "page" (full HTML document), "article" (fragment).
# Other layouts can only be registered from Rust with Templates::with_layout.
# default = "page"
"##
}
