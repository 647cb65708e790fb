//! Built-in middleware steps.
//!
//! | Name | Step | Module |
//! |------|------|--------|
//! | `drafts` | [`Drafts`] | [`drafts`] |
//! | `dates` | [`Dates`] | [`dates`] |
//! | `markdown` | [`Markdown`] | [`markup`] |
//! | `sanitize` | [`Sanitize`] | [`markup`] |
//! | `linkify` | [`Linkify`] | [`markup`] |
//! | `templates` | [`Templates`] | [`template`] |
//!
//! Each step is usable on its own through [`Pipeline::use_middleware`]. The
//! names above are what `frontstack.toml` lists under `middleware`; [`build`]
//! turns a name plus the config into a ready step.
//!
//! [`Pipeline::use_middleware`]: crate::pipeline::Pipeline::use_middleware

pub mod dates;
pub mod drafts;
pub mod markup;
pub mod template;

pub use dates::Dates;
pub use drafts::Drafts;
pub use markup::{Linkify, Markdown, Sanitize};
pub use template::Templates;

use crate::config::{MarkdownConfig, StackConfig};
use crate::middleware::Middleware;
use pulldown_cmark::Options;
use std::rc::Rc;

/// Every name [`build`] understands, in the order they usually run.
pub const NAMES: &[&str] = &[
    "drafts",
    "dates",
    "markdown",
    "sanitize",
    "linkify",
    "templates",
];

/// Construct a built-in step by name, configured from `config`.
///
/// Returns `None` for names that aren't built in.
pub fn build(name: &str, config: &StackConfig) -> Option<Rc<dyn Middleware>> {
    let step: Rc<dyn Middleware> = match name {
        "drafts" => Rc::new(Drafts::new(&config.drafts.field)),
        "dates" => {
            let dates = Dates::new(&config.dates.field);
            if config.dates.formats.is_empty() {
                Rc::new(dates)
            } else {
                Rc::new(dates.with_formats(config.dates.formats.clone()))
            }
        }
        "markdown" => Rc::new(Markdown::new(markdown_options(&config.markdown))),
        "sanitize" => Rc::new(
            Sanitize::default()
                .with_tags(config.sanitize.tags.iter().cloned())
                .with_attributes(config.sanitize.attributes.clone())
                .with_protocols(config.sanitize.protocols.iter().cloned())
                .strip_comments(config.sanitize.strip_comments),
        ),
        "linkify" => Rc::new(
            Linkify::default()
                .nofollow(config.linkify.nofollow)
                .with_skip_tags(config.linkify.skip_tags.iter().cloned()),
        ),
        "templates" => {
            let templates = Templates::builtin();
            match &config.templates.default {
                Some(default) => Rc::new(templates.with_default(default)),
                None => Rc::new(templates),
            }
        }
        _ => return None,
    };
    Some(step)
}

fn markdown_options(config: &MarkdownConfig) -> Options {
    let mut options = Options::empty();
    options.set(Options::ENABLE_TABLES, config.tables);
    options.set(Options::ENABLE_FOOTNOTES, config.footnotes);
    options.set(Options::ENABLE_STRIKETHROUGH, config.strikethrough);
    options.set(Options::ENABLE_TASKLISTS, config.tasklists);
    options.set(Options::ENABLE_SMART_PUNCTUATION, config.smart_punctuation);
    options
}
