//! Layout rendering with Maud.
//!
//! [`Templates`] wraps each document's (already rendered) content in a named
//! layout. A layout is a plain Rust function returning [`Markup`], so layouts
//! are type-checked at compile time and auto-escape every interpolated value.
//!
//! ## Choosing a layout
//!
//! 1. The document's `template` metadata field, if present
//! 2. The configured default layout
//! 3. Neither: the document is left as is
//!
//! Naming a layout that isn't registered is an error, not a silent skip.
//!
//! Layouts receive the pipeline [`Context`] as well, so pipeline metadata
//! (a `site_title`, counts computed by earlier steps) is available to all of
//! them.
//!
//! Only [`BUILTIN_LAYOUTS`] are reachable from `frontstack.toml` and the
//! CLI. Anything else is registered from Rust with [`Templates::with_layout`];
//! there is no loading of layout files at runtime.

use crate::document::Document;
use crate::middleware::{Context, FileSet, Middleware, MiddlewareError};
use crate::value::Value;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::BTreeMap;

/// Metadata field that selects a layout per document.
pub const TEMPLATE_FIELD: &str = "template";

/// Names of the layouts registered by [`Templates::builtin`].
pub const BUILTIN_LAYOUTS: &[&str] = &["page", "article"];

pub type Layout = Box<dyn Fn(&Document, &Context) -> Markup>;

pub struct Templates {
    layouts: BTreeMap<String, Layout>,
    default: Option<String>,
}

impl Templates {
    /// An empty registry with no default.
    pub fn new() -> Self {
        Self {
            layouts: BTreeMap::new(),
            default: None,
        }
    }

    /// A registry holding the `page` and `article` layouts.
    pub fn builtin() -> Self {
        Self::new()
            .with_layout("page", page)
            .with_layout("article", article)
    }

    pub fn with_layout(
        mut self,
        name: impl Into<String>,
        layout: impl Fn(&Document, &Context) -> Markup + 'static,
    ) -> Self {
        self.layouts.insert(name.into(), Box::new(layout));
        self
    }

    /// Layout used for documents without a `template` field.
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    pub fn has_layout(&self, name: &str) -> bool {
        self.layouts.contains_key(name)
    }

    /// Render one document with the layout it selects, if any.
    pub fn render(&self, doc: &Document, ctx: &Context) -> Result<Option<String>, MiddlewareError> {
        let name = match doc.get(TEMPLATE_FIELD) {
            Some(value) => value.to_string(),
            None => match &self.default {
                Some(name) => name.clone(),
                None => return Ok(None),
            },
        };
        let layout = self
            .layouts
            .get(&name)
            .ok_or_else(|| MiddlewareError::UnknownTemplate {
                filename: doc.filename().to_string(),
                template: name.clone(),
            })?;
        Ok(Some(layout(doc, ctx).into_string()))
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Middleware for Templates {
    fn name(&self) -> &str {
        "templates"
    }

    fn apply(&self, files: &mut FileSet, ctx: &mut Context) -> Result<(), MiddlewareError> {
        for doc in files.iter_mut() {
            if let Some(html) = self.render(doc, ctx)? {
                doc.content = html;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Built-in layouts
// ============================================================================

fn display_title(doc: &Document) -> &str {
    doc.title().unwrap_or(doc.slug())
}

/// A complete HTML5 document around the content.
pub fn page(doc: &Document, ctx: &Context) -> Markup {
    let title = display_title(doc);
    let site_title = ctx.metadata().get("site_title").map(Value::to_string);
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title {
                    (title)
                    @if let Some(site) = &site_title { " | " (site) }
                }
            }
            body {
                (article(doc, ctx))
            }
        }
    }
}

/// The content in an `<article>` with a heading and optional date.
pub fn article(doc: &Document, _ctx: &Context) -> Markup {
    html! {
        article {
            header {
                h1 { (display_title(doc)) }
                @if let Some(date) = doc.get("date") {
                    time datetime=(date) { (date) }
                }
            }
            (PreEscaped(doc.content.as_str()))
        }
    }
}
