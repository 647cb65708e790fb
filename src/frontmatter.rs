//! Frontmatter splitting.
//!
//! A source file is a header block followed by a body:
//!
//! ```text
//! ---
//! title: Hello, world!
//! date: 2013-06-07
//! ---
//! The body, left exactly as written.
//! ```
//!
//! Two header syntaxes are recognized by their opening delimiter:
//!
//! | Delimiter | Format | Decoder |
//! |-----------|--------|---------|
//! | `---` | YAML | `serde_yaml` |
//! | `+++` | TOML | `toml` |
//!
//! A file without an opening delimiter has empty metadata and its whole text
//! is the body. The body is never reformatted: only the newline immediately
//! following the closing delimiter is consumed.

use crate::types::Metadata;
use crate::value::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("YAML header error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("TOML header error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("header must be a mapping of keys to values")]
    NotAMapping,
    #[error("header opened with `{0}` is never closed")]
    Unterminated(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum HeaderFormat {
    Yaml,
    Toml,
}

impl HeaderFormat {
    fn detect(first_line: &str) -> Option<Self> {
        match first_line.trim_end() {
            "---" => Some(HeaderFormat::Yaml),
            "+++" => Some(HeaderFormat::Toml),
            _ => None,
        }
    }

    fn delimiter(self) -> &'static str {
        match self {
            HeaderFormat::Yaml => "---",
            HeaderFormat::Toml => "+++",
        }
    }

    fn closes(self, line: &str) -> bool {
        let line = line.trim_end();
        match self {
            // YAML allows the document-end marker as a closer too
            HeaderFormat::Yaml => line == "---" || line == "...",
            HeaderFormat::Toml => line == "+++",
        }
    }
}

/// Split raw text into header metadata and body content.
pub fn parse(raw: &str) -> Result<(Metadata, String), FrontmatterError> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let first_line_end = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
    let Some(format) = HeaderFormat::detect(&text[..first_line_end]) else {
        return Ok((Metadata::new(), text.to_string()));
    };

    // Walk lines after the opening delimiter, tracking byte offsets
    let mut offset = first_line_end;
    while offset < text.len() {
        let line_end = text[offset..]
            .find('\n')
            .map(|i| offset + i + 1)
            .unwrap_or(text.len());
        let line = &text[offset..line_end];
        if format.closes(line) {
            let header = &text[first_line_end..offset];
            let body = &text[line_end..];
            let metadata = decode_header(format, header)?;
            return Ok((metadata, body.to_string()));
        }
        offset = line_end;
    }

    Err(FrontmatterError::Unterminated(format.delimiter()))
}

fn decode_header(format: HeaderFormat, header: &str) -> Result<Metadata, FrontmatterError> {
    if header.trim().is_empty() {
        return Ok(Metadata::new());
    }
    let value = match format {
        HeaderFormat::Yaml => Value::from(serde_yaml::from_str::<serde_yaml::Value>(header)?),
        HeaderFormat::Toml => Value::from(toml::Value::Table(toml::from_str(header)?)),
    };
    match value {
        Value::Map(map) => Ok(map),
        Value::Null => Ok(Metadata::new()),
        _ => Err(FrontmatterError::NotAMapping),
    }
}
