//! Content markup: markdown rendering, HTML cleaning, and link detection.
//!
//! Three independent steps that rewrite `content` in place:
//!
//! | Step | Does |
//! |------|------|
//! | [`Markdown`] | markdown → HTML with `pulldown-cmark` |
//! | [`Sanitize`] | drops tags, attributes and URLs outside an allow-list, with `ammonia` |
//! | [`Linkify`] | wraps bare URLs in `<a>` elements, with `linkify` |
//!
//! The usual order is `markdown`, `sanitize`, `linkify`: sanitizing after
//! rendering cleans whatever raw HTML the author embedded in markdown, and
//! linkifying last means the sanitizer never has to vet generated links.
//!
//! Both HTML steps parse their input with `html5ever`, so character
//! references are decoded before any URL is checked, and the output is
//! re-serialized from the parsed tree.

use crate::middleware::{Context, FileSet, Middleware, MiddlewareError};
use html5ever::tendril::TendrilSink;
use html5ever::{
    Attribute, LocalName, ParseOpts, QualName, local_name, ns, parse_fragment, serialize,
    serialize::SerializeOpts, serialize::TraversalScope,
};
use linkify::{LinkFinder, LinkKind};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use pulldown_cmark::{Options, Parser, html as md_html};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

/// Elements removed together with their content unless explicitly allowed.
const CLEAN_CONTENT_TAGS: &[&str] = &["script", "style"];

// ============================================================================
// Markdown
// ============================================================================

/// Render markdown text to HTML.
pub fn render_markdown(text: &str, options: Options) -> String {
    let parser = Parser::new_ext(text, options);
    let mut html = String::with_capacity(text.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}

/// Converts every document's content from markdown to HTML.
pub struct Markdown {
    options: Options,
}

impl Markdown {
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new(Options::empty())
    }
}

impl Middleware for Markdown {
    fn name(&self) -> &str {
        "markdown"
    }

    fn apply(&self, files: &mut FileSet, _ctx: &mut Context) -> Result<(), MiddlewareError> {
        for doc in files.iter_mut() {
            doc.content = render_markdown(&doc.content, self.options);
        }
        Ok(())
    }
}

// ============================================================================
// Sanitize
// ============================================================================

/// Allow-list HTML cleaner.
///
/// Defaults mirror a conservative comment-form policy: a handful of inline
/// and list tags, `href`/`title` on links, `title` on abbreviations, and
/// `http`, `https`, `mailto` URLs. Tags outside the list are removed and
/// their text kept, except `script` and `style`, whose content goes too.
/// Relative URLs pass; absolute ones need an allowed scheme after entity
/// decoding, so `java&#115;cript:` is caught like `javascript:`.
pub struct Sanitize {
    tags: BTreeSet<String>,
    attributes: BTreeMap<String, BTreeSet<String>>,
    protocols: BTreeSet<String>,
    strip_comments: bool,
}

pub const DEFAULT_TAGS: &[&str] = &[
    "a",
    "abbr",
    "acronym",
    "b",
    "blockquote",
    "code",
    "em",
    "i",
    "li",
    "ol",
    "strong",
    "ul",
];

pub const DEFAULT_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "title"]),
    ("abbr", &["title"]),
    ("acronym", &["title"]),
];

pub const DEFAULT_PROTOCOLS: &[&str] = &["http", "https", "mailto"];

impl Default for Sanitize {
    fn default() -> Self {
        Self {
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            attributes: DEFAULT_ATTRIBUTES
                .iter()
                .map(|(tag, attrs)| {
                    (
                        tag.to_string(),
                        attrs.iter().map(|a| a.to_string()).collect(),
                    )
                })
                .collect(),
            protocols: DEFAULT_PROTOCOLS.iter().map(|p| p.to_string()).collect(),
            strip_comments: true,
        }
    }
}

impl Sanitize {
    /// Replace the allowed tag list.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(|t| t.into().to_ascii_lowercase()).collect();
        self
    }

    /// Replace the allowed attributes. The tag `*` applies to every tag.
    pub fn with_attributes(mut self, attributes: BTreeMap<String, Vec<String>>) -> Self {
        self.attributes = attributes
            .into_iter()
            .map(|(tag, attrs)| {
                (
                    tag.to_ascii_lowercase(),
                    attrs.into_iter().map(|a| a.to_ascii_lowercase()).collect(),
                )
            })
            .collect();
        self
    }

    pub fn with_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols
            .into_iter()
            .map(|p| p.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn strip_comments(mut self, strip_comments: bool) -> Self {
        self.strip_comments = strip_comments;
        self
    }

    /// Clean one HTML fragment.
    pub fn clean(&self, html: &str) -> String {
        let tags: HashSet<&str> = self.tags.iter().map(String::as_str).collect();
        let tag_attributes: HashMap<&str, HashSet<&str>> = self
            .attributes
            .iter()
            .filter(|(tag, _)| tag.as_str() != "*")
            .map(|(tag, attrs)| (tag.as_str(), attrs.iter().map(String::as_str).collect()))
            .collect();
        let generic_attributes: HashSet<&str> = self
            .attributes
            .get("*")
            .map(|attrs| attrs.iter().map(String::as_str).collect())
            .unwrap_or_default();
        // ammonia rejects a tag that is both allowed and content-cleaned
        let clean_content: HashSet<&str> = CLEAN_CONTENT_TAGS
            .iter()
            .copied()
            .filter(|tag| !tags.contains(tag))
            .collect();

        ammonia::Builder::empty()
            .tags(tags)
            .tag_attributes(tag_attributes)
            .generic_attributes(generic_attributes)
            .url_schemes(self.protocols.iter().map(String::as_str).collect())
            .url_relative(ammonia::UrlRelative::PassThrough)
            .link_rel(None)
            .clean_content_tags(clean_content)
            .strip_comments(self.strip_comments)
            .clean(html)
            .to_string()
    }
}

impl Middleware for Sanitize {
    fn name(&self) -> &str {
        "sanitize"
    }

    fn apply(&self, files: &mut FileSet, _ctx: &mut Context) -> Result<(), MiddlewareError> {
        for doc in files.iter_mut() {
            doc.content = self.clean(&doc.content);
        }
        Ok(())
    }
}

// ============================================================================
// Linkify
// ============================================================================

/// Elements whose text [`Linkify`] leaves alone by default.
pub const DEFAULT_SKIP_TAGS: &[&str] = &["pre", "code"];

/// Wraps bare URLs in text with anchors.
///
/// Only text nodes are scanned: attribute values, text inside an existing
/// `<a>`, and text inside a skip tag (`pre` and `code` by default) are left
/// alone. A URL needs a scheme (`https://…`) or a `www.` prefix; `www.` URLs
/// get an `http://` href. Trailing sentence punctuation and unbalanced
/// closing parens stay outside the link.
pub struct Linkify {
    nofollow: bool,
    skip_tags: BTreeSet<String>,
}

impl Default for Linkify {
    fn default() -> Self {
        Self {
            nofollow: true,
            skip_tags: DEFAULT_SKIP_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Linkify {
    /// Add `rel="nofollow"` to generated links.
    pub fn nofollow(mut self, nofollow: bool) -> Self {
        self.nofollow = nofollow;
        self
    }

    /// Replace the elements whose text is never linkified.
    pub fn with_skip_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_tags = tags.into_iter().map(|t| t.into().to_ascii_lowercase()).collect();
        self
    }

    pub fn linkify(&self, html: &str) -> String {
        let dom = parse_fragment(
            RcDom::default(),
            ParseOpts::default(),
            QualName::new(None, ns!(html), local_name!("body")),
            vec![],
            false,
        )
        .one(html);

        // A fragment parses into a single <html> holder under the document
        let Some(root) = dom.document.children.borrow().first().cloned() else {
            return html.to_string();
        };

        let mut finder = LinkFinder::new();
        finder.kinds(&[LinkKind::Url]);
        finder.url_must_have_scheme(false);
        self.link_children(&root, &finder);

        let mut output = Vec::with_capacity(html.len());
        let opts = SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        };
        serialize(&mut output, &SerializableHandle::from(root), opts)
            .expect("serializing into memory");
        String::from_utf8_lossy(&output).into_owned()
    }

    fn link_children(&self, parent: &Handle, finder: &LinkFinder) {
        let children = parent.children.borrow().clone();
        let mut rebuilt = Vec::with_capacity(children.len());

        for child in children {
            match &child.data {
                NodeData::Text { contents } => {
                    let text = String::from(&**contents.borrow());
                    match self.split_links(&text, finder) {
                        Some(pieces) => {
                            for piece in pieces {
                                piece.parent.set(Some(Rc::downgrade(parent)));
                                rebuilt.push(piece);
                            }
                        }
                        None => rebuilt.push(child),
                    }
                }
                NodeData::Element { name, .. } => {
                    let tag = &*name.local;
                    if tag != "a" && !self.skip_tags.contains(tag) {
                        self.link_children(&child, finder);
                    }
                    rebuilt.push(child);
                }
                _ => rebuilt.push(child),
            }
        }

        *parent.children.borrow_mut() = rebuilt;
    }

    /// Text and anchor nodes replacing `text`, or `None` when it has no URL.
    fn split_links(&self, text: &str, finder: &LinkFinder) -> Option<Vec<Handle>> {
        let mut pieces = Vec::new();
        let mut last = 0;

        for link in finder.links(text) {
            let url = link.as_str();
            let www = url.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("www."));
            if !www && !url.contains("://") {
                continue;
            }
            if link.start() > last {
                pieces.push(create_text(&text[last..link.start()]));
            }
            let href = if www {
                format!("http://{url}")
            } else {
                url.to_string()
            };
            let mut attrs = vec![("href", href.as_str())];
            if self.nofollow {
                attrs.push(("rel", "nofollow"));
            }
            let anchor = create_element("a", attrs);
            let label = create_text(url);
            label.parent.set(Some(Rc::downgrade(&anchor)));
            anchor.children.borrow_mut().push(label);
            pieces.push(anchor);
            last = link.end();
        }

        if pieces.is_empty() {
            return None;
        }
        if last < text.len() {
            pieces.push(create_text(&text[last..]));
        }
        Some(pieces)
    }
}

impl Middleware for Linkify {
    fn name(&self) -> &str {
        "linkify"
    }

    fn apply(&self, files: &mut FileSet, _ctx: &mut Context) -> Result<(), MiddlewareError> {
        for doc in files.iter_mut() {
            doc.content = self.linkify(&doc.content);
        }
        Ok(())
    }
}

// ============================================================================
// DOM helpers
// ============================================================================

fn create_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: QualName::new(None, ns!(html), LocalName::from(tag)),
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::types::Metadata;

    // =========================================================================
    // Markdown
    // =========================================================================

    #[test]
    fn markdown_renders_html() {
        let html = render_markdown("# Title\n\nSome *emphasis*.", Options::empty());
        assert_eq!(html, "<h1>Title</h1>\n<p>Some <em>emphasis</em>.</p>\n");
    }

    #[test]
    fn markdown_tables_need_option() {
        let table = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert!(!render_markdown(table, Options::empty()).contains("<table>"));
        assert!(render_markdown(table, Options::ENABLE_TABLES).contains("<table>"));
    }

    #[test]
    fn markdown_middleware_rewrites_every_document() {
        let mut files: FileSet = vec![
            Document::new("a.md", Metadata::new(), "*a*"),
            Document::new("b.md", Metadata::new(), "**b**"),
        ]
        .into_iter()
        .collect();

        Markdown::default()
            .apply(&mut files, &mut Context::default())
            .unwrap();

        assert_eq!(files.get("a.md").unwrap().content, "<p><em>a</em></p>\n");
        assert_eq!(
            files.get("b.md").unwrap().content,
            "<p><strong>b</strong></p>\n"
        );
    }

    // =========================================================================
    // Sanitize
    // =========================================================================

    #[test]
    fn sanitize_keeps_allowed_tags() {
        let clean = Sanitize::default().clean("<strong>bold</strong> and <em>em</em>");
        assert_eq!(clean, "<strong>bold</strong> and <em>em</em>");
    }

    #[test]
    fn sanitize_removes_disallowed_tags_keeps_text() {
        let clean = Sanitize::default()
            .with_tags(Vec::<String>::new())
            .clean("<p>Hello <b>world</b></p>");
        assert_eq!(clean, "Hello world");
    }

    #[test]
    fn sanitize_drops_script_content() {
        let clean = Sanitize::default().clean("before<script>alert(1)</script>after");
        assert_eq!(clean, "beforeafter");
    }

    #[test]
    fn sanitize_filters_attributes() {
        let clean = Sanitize::default()
            .clean(r#"<a href="http://example.com" onclick="evil()" title='t'>x</a>"#);
        assert_eq!(clean, r#"<a href="http://example.com" title="t">x</a>"#);
    }

    #[test]
    fn sanitize_drops_disallowed_protocols() {
        let clean = Sanitize::default().clean(r#"<a href="javascript:alert(1)">x</a>"#);
        assert_eq!(clean, "<a>x</a>");
    }

    #[test]
    fn sanitize_decodes_entities_before_checking_protocols() {
        let sanitize = Sanitize::default();
        for href in [
            "java&#115;cript:alert(1)",
            "java&#x73;cript:alert(1)",
            "javascript&colon;alert(1)",
            "&#106;avascript:alert(1)",
        ] {
            let clean = sanitize.clean(&format!(r#"<a href="{href}">x</a>"#));
            assert_eq!(clean, "<a>x</a>", "{href} kept its href");
        }
    }

    #[test]
    fn sanitize_allows_relative_urls() {
        let clean = Sanitize::default().clean(r#"<a href="/posts/a.html#top">x</a>"#);
        assert_eq!(clean, r#"<a href="/posts/a.html#top">x</a>"#);
    }

    #[test]
    fn sanitize_wildcard_attributes() {
        let mut attributes = BTreeMap::new();
        attributes.insert("*".to_string(), vec!["class".to_string()]);
        let clean = Sanitize::default()
            .with_tags(["p", "em"])
            .with_attributes(attributes)
            .clean(r#"<p class="lead" id="x"><em class="a">hi</em></p>"#);
        assert_eq!(clean, r#"<p class="lead"><em class="a">hi</em></p>"#);
    }

    #[test]
    fn sanitize_strips_comments_by_default() {
        assert_eq!(Sanitize::default().clean("a<!-- secret -->b"), "ab");
        assert_eq!(
            Sanitize::default()
                .strip_comments(false)
                .clean("a<!-- note -->b"),
            "a<!-- note -->b"
        );
    }

    #[test]
    fn sanitize_escapes_stray_markup() {
        let clean = Sanitize::default().clean("1 < 2 & 3 &gt; 2 &amp; done");
        assert_eq!(clean, "1 &lt; 2 &amp; 3 &gt; 2 &amp; done");
    }

    #[test]
    fn sanitize_allowing_script_keeps_it() {
        let clean = Sanitize::default()
            .with_tags(["script"])
            .clean("<script>run()</script>");
        assert_eq!(clean, "<script>run()</script>");
    }

    // =========================================================================
    // Linkify
    // =========================================================================

    #[test]
    fn linkify_wraps_bare_urls() {
        let html = Linkify::default().linkify("see http://example.com/page for more");
        assert_eq!(
            html,
            r#"see <a href="http://example.com/page" rel="nofollow">http://example.com/page</a> for more"#
        );
    }

    #[test]
    fn linkify_www_gets_http_href() {
        let html = Linkify::default().nofollow(false).linkify("go to www.example.com");
        assert_eq!(
            html,
            r#"go to <a href="http://www.example.com">www.example.com</a>"#
        );
    }

    #[test]
    fn linkify_needs_scheme_or_www() {
        let input = "edit frontstack.toml or mail me@example.com";
        assert_eq!(Linkify::default().linkify(input), input);
    }

    #[test]
    fn linkify_excludes_trailing_punctuation() {
        let html = Linkify::default()
            .nofollow(false)
            .linkify("(see https://example.com/a).");
        assert_eq!(
            html,
            r#"(see <a href="https://example.com/a">https://example.com/a</a>)."#
        );
    }

    #[test]
    fn linkify_skips_existing_links_and_attributes() {
        let input = r#"<a href="http://example.com">http://example.com</a> <img src="http://example.com/i.png">"#;
        assert_eq!(Linkify::default().linkify(input), input);
    }

    #[test]
    fn linkify_skips_pre_and_code_by_default() {
        let input = "<pre><code>curl http://localhost:8080</code></pre> <code>http://example.com</code>";
        assert_eq!(Linkify::default().linkify(input), input);
    }

    #[test]
    fn linkify_skip_tags_are_replaceable() {
        let input = "<pre>http://example.com</pre> <code>http://other.org</code>";
        let html = Linkify::default()
            .nofollow(false)
            .with_skip_tags(["pre"])
            .linkify(input);
        assert_eq!(
            html,
            r#"<pre>http://example.com</pre> <code><a href="http://other.org">http://other.org</a></code>"#
        );
    }

    #[test]
    fn linkify_inside_paragraphs() {
        let html = Linkify::default()
            .nofollow(false)
            .linkify("<p>Visit https://example.com today</p>");
        assert_eq!(
            html,
            r#"<p>Visit <a href="https://example.com">https://example.com</a> today</p>"#
        );
    }

    #[test]
    fn linkify_escapes_ampersands_in_generated_href() {
        let html = Linkify::default()
            .nofollow(false)
            .linkify("q http://example.com/?a=1&amp;b=2");
        assert_eq!(
            html,
            r#"q <a href="http://example.com/?a=1&amp;b=2">http://example.com/?a=1&amp;b=2</a>"#
        );
    }
}
