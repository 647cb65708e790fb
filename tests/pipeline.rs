//! End-to-end pipeline behavior against the fixture posts.
//!
//! Fixtures (`fixtures/posts/`):
//!
//! | File | Header | Notes |
//! |------|--------|-------|
//! | `colophon.md` | TOML | `template = "article"`, no date |
//! | `hello.markdown` | YAML | ISO date, bare URL in body |
//! | `network-diagrams.markdown` | YAML | long-form date, fenced code |
//! | `unfinished.markdown` | YAML | `draft: true` |

use chrono::NaiveDate;
use frontstack::config::StackConfig;
use frontstack::document::Document;
use frontstack::frontmatter;
use frontstack::middleware::{Context, FileSet, Middleware, MiddlewareError};
use frontstack::pipeline::{Order, Pipeline, PipelineError};
use frontstack::plugins::{Dates, Drafts, Linkify, Markdown, Sanitize, Templates};
use frontstack::types::Record;
use frontstack::value::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ALL: &[&str] = &[
    "colophon.md",
    "hello.markdown",
    "network-diagrams.markdown",
    "unfinished.markdown",
];

fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/posts");
    for entry in fs::read_dir(&fixtures).unwrap() {
        let entry = entry.unwrap();
        fs::copy(entry.path(), tmp.path().join(entry.file_name())).unwrap();
    }
    tmp
}

fn filenames(docs: &[Document]) -> Vec<&str> {
    docs.iter().map(|d| d.filename()).collect()
}

fn shout(files: &mut FileSet, _ctx: &mut Context) -> Result<(), MiddlewareError> {
    for doc in files.iter_mut() {
        doc.content = doc.content.to_uppercase();
    }
    Ok(())
}

// =============================================================================
// Identity roundtrip
// =============================================================================

#[test]
fn run_without_middleware_keeps_bodies_byte_identical() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path());
    let files = pipeline.run().unwrap();

    assert_eq!(files.len(), ALL.len());
    for name in ALL {
        let raw = fs::read_to_string(tmp.path().join(name)).unwrap();
        let (_, body) = frontmatter::parse(&raw).unwrap();
        assert_eq!(files.get(name).unwrap().content, body, "{name}");
    }
}

#[test]
fn loaded_documents_carry_identity_fields() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path());
    let hello = pipeline.get("hello.markdown", false).unwrap();

    assert_eq!(hello.title(), Some("Hello, world!"));
    assert_eq!(hello.get("filename"), Some(&Value::from("hello.markdown")));
    assert_eq!(hello.get("slug"), Some(&Value::from("hello")));
    assert_eq!(
        hello.get("tags"),
        Some(&Value::List(vec![Value::from("meta"), Value::from("intro")]))
    );
}

// =============================================================================
// Cache stability and reset
// =============================================================================

#[test]
fn get_twice_ignores_middleware_changes() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path());
    pipeline.use_middleware(Markdown::default());

    let first = pipeline.get("hello.markdown", false).unwrap().clone();
    pipeline.use_middleware(shout);
    let second = pipeline.get("hello.markdown", false).unwrap().clone();

    assert_eq!(first, second);
}

#[test]
fn get_with_reset_reflects_current_middleware() {
    let tmp = setup_fixtures();
    let mut plain = Pipeline::new(tmp.path());
    let expected = plain.get("hello.markdown", false).unwrap().clone();

    let mut pipeline = Pipeline::new(tmp.path());
    pipeline.use_middleware(Markdown::default());
    let rendered = pipeline.get("hello.markdown", false).unwrap().clone();
    assert_ne!(rendered, expected);

    pipeline.clear_middleware();
    let reset = pipeline.get("hello.markdown", true).unwrap().clone();
    assert_eq!(reset, expected);
}

// =============================================================================
// Filtering
// =============================================================================

#[test]
fn drafts_are_omitted_from_run() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path());
    pipeline.use_middleware(Drafts::default());

    let files = pipeline.run().unwrap();
    assert!(!files.contains("unfinished.markdown"));
    assert_eq!(files.len(), ALL.len() - 1);
}

#[test]
fn get_of_draft_is_not_found() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path());
    pipeline.use_middleware(Drafts::default());

    let err = pipeline.get("unfinished.markdown", false).unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(ref f) if f == "unfinished.markdown"));
    assert_eq!(err.to_string(), "unfinished.markdown not found");
}

#[test]
fn iter_skips_drafts_in_sorted_order() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path());
    pipeline.use_middleware(Drafts::default());

    let docs: Vec<Document> = pipeline
        .iter(false, false)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        filenames(&docs),
        vec!["colophon.md", "hello.markdown", "network-diagrams.markdown"]
    );
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn iter_orders_by_filename() {
    let tmp = TempDir::new().unwrap();
    for name in ["c.md", "a.md", "b.md"] {
        fs::write(tmp.path().join(name), name).unwrap();
    }
    let mut pipeline = Pipeline::new(tmp.path());

    let forward: Vec<Document> = pipeline
        .iter(false, false)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(filenames(&forward), vec!["a.md", "b.md", "c.md"]);

    let backward: Vec<Document> = pipeline
        .iter(false, true)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(filenames(&backward), vec!["c.md", "b.md", "a.md"]);
}

#[test]
fn iter_relists_on_each_call() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.md"), "a").unwrap();
    let mut pipeline = Pipeline::new(tmp.path());
    assert_eq!(pipeline.iter(false, false).unwrap().count(), 1);

    fs::write(tmp.path().join("b.md"), "b").unwrap();
    assert_eq!(pipeline.iter(false, false).unwrap().count(), 2);
}

// =============================================================================
// Build materialization
// =============================================================================

#[test]
fn build_writes_one_file_per_surviving_document() {
    let tmp = setup_fixtures();
    let out = TempDir::new().unwrap();
    let dest = out.path().join("nested/site");
    let mut pipeline = Pipeline::new(tmp.path());
    pipeline.use_middleware(Drafts::default());
    pipeline.use_middleware(Markdown::default());

    let written = pipeline.build(Some(dest.as_path())).unwrap();
    assert_eq!(written.len(), 3);

    let mut on_disk: Vec<String> = fs::read_dir(&dest)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    on_disk.sort();
    assert_eq!(
        on_disk,
        vec!["colophon.md", "hello.markdown", "network-diagrams.markdown"]
    );

    for doc in pipeline.files().iter() {
        let bytes = fs::read(dest.join(doc.filename())).unwrap();
        assert_eq!(bytes, doc.content.as_bytes());
    }
}

#[test]
fn build_overwrites_existing_files() {
    let tmp = setup_fixtures();
    let out = TempDir::new().unwrap();
    fs::write(out.path().join("colophon.md"), "stale").unwrap();

    let mut pipeline = Pipeline::new(tmp.path()).with_dest(out.path());
    pipeline.build(None).unwrap();

    let written = fs::read_to_string(out.path().join("colophon.md")).unwrap();
    assert_eq!(written, "Built with *frontstack*.\n");
}

// =============================================================================
// Serialize
// =============================================================================

#[test]
fn serialize_map_matches_run_records() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path());
    pipeline.use_middleware(Dates::default());
    let run: Vec<(String, Record)> = pipeline
        .run()
        .unwrap()
        .iter()
        .map(|d| (d.filename().to_string(), d.to_record()))
        .collect();

    let map = pipeline.serialize_map().unwrap();
    assert_eq!(map.len(), run.len());
    for (name, record) in run {
        assert_eq!(map[&name], record);
    }
}

#[test]
fn serialize_by_key_is_sorted_permutation() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path());
    pipeline.use_middleware(Dates::default());

    let unsorted = pipeline.serialize(Order::Unsorted).unwrap();
    let by_date = |r: &Record| r.get("date").cloned().unwrap_or(Value::Null);
    let sorted = pipeline.serialize(Order::By(&by_date)).unwrap();

    assert_eq!(sorted.len(), unsorted.len());
    for record in &unsorted {
        assert!(sorted.contains(record));
    }
    let keys: Vec<Value> = sorted.iter().map(by_date).collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    // Undated colophon sorts first, then by date
    assert_eq!(sorted[0]["filename"], Value::from("colophon.md"));
    assert_eq!(sorted[3]["filename"], Value::from("unfinished.markdown"));
}

#[test]
fn serialize_records_are_json_ready() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path());
    pipeline.use_middleware(Dates::default());

    let map = pipeline.serialize_map().unwrap();
    let json = serde_json::to_value(&map["network-diagrams.markdown"]).unwrap();
    assert_eq!(json["date"], "2014-03-04T00:00:00");
    assert_eq!(json["slug"], "network-diagrams");
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn use_middleware_appends_exactly_one_and_returns_handle() {
    let mut pipeline = Pipeline::new("unused");
    let drafts = pipeline.use_middleware(Drafts::new("hidden"));

    assert_eq!(pipeline.middleware_names(), vec!["drafts"]);
    assert_eq!(drafts.name(), "drafts");
}

#[test]
fn use_named_rejects_unknown_without_mutating() {
    let mut pipeline = Pipeline::new("unused");
    let config = StackConfig::default();
    pipeline.use_named("drafts", &config).unwrap();

    assert!(matches!(
        pipeline.use_named("not-a-step", &config),
        Err(PipelineError::UnknownMiddleware(_))
    ));
    assert_eq!(pipeline.middleware_names(), vec!["drafts"]);
}

// =============================================================================
// Built-in chain
// =============================================================================

#[test]
fn default_config_chain_parses_dates_and_renders() {
    let tmp = setup_fixtures();
    let mut config = StackConfig::default();
    config.source = tmp.path().to_string_lossy().into_owned();
    let mut pipeline = Pipeline::from_config(&config).unwrap();

    let hello = pipeline.get("hello.markdown", false).unwrap();
    let expected = NaiveDate::from_ymd_opt(2013, 6, 7)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(hello.get("date"), Some(&Value::DateTime(expected)));
    assert!(hello.content.contains("<strong>bold</strong>"));
}

#[test]
fn full_chain_produces_safe_linked_pages() {
    let tmp = setup_fixtures();
    let mut pipeline = Pipeline::new(tmp.path()).with_metadata("site_title", "Notes");
    pipeline.use_middleware(Drafts::default());
    pipeline.use_middleware(Dates::default());
    pipeline.use_middleware(Markdown::default());
    pipeline.use_middleware(Sanitize::default().with_tags(["a", "p", "strong", "li", "ul"]));
    pipeline.use_middleware(Linkify::default());
    pipeline.use_middleware(Templates::builtin().with_default("page"));

    let hello = pipeline.get("hello.markdown", false).unwrap().content.clone();
    assert!(hello.starts_with("<!DOCTYPE html>"));
    assert!(hello.contains("<title>Hello, world! | Notes</title>"));
    assert!(hello.contains(r#"<a href="http://example.org/about" rel="nofollow">"#));

    // colophon picks its own layout: a fragment, not a full page
    let colophon = pipeline.get("colophon.md", false).unwrap().content.clone();
    assert!(colophon.starts_with("<article>"));
}
