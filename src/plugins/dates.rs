//! Date parsing for a metadata field.
//!
//! Authors write dates however they like (`2013-06-07`, `June 7, 2013`,
//! `2013-06-07T10:30:00+02:00`). [`Dates`] turns the text in one field into
//! a [`Value::DateTime`] so later steps and exports can sort and format it.
//!
//! Formats are tried in order; the first that parses wins. Date-only formats
//! produce midnight. Offsets are dropped after parsing, keeping the wall-clock
//! time the author wrote.

use crate::middleware::{Context, FileSet, Middleware, MiddlewareError};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Formats tried when none are configured.
///
/// RFC 3339 is always tried first, before any of these.
pub const DEFAULT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%m/%d/%Y",
];

/// Parse text as a datetime using RFC 3339 and then `formats` in order.
pub fn parse_date<S: AsRef<str>>(text: &str, formats: &[S]) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    formats.iter().find_map(|format| {
        let format = format.as_ref();
        NaiveDateTime::parse_from_str(text, format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    })
}

/// Converts one metadata field to a datetime on every document.
pub struct Dates {
    field: String,
    formats: Vec<String>,
}

impl Dates {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            formats: DEFAULT_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Replace the format list tried after RFC 3339.
    pub fn with_formats(mut self, formats: Vec<String>) -> Self {
        self.formats = formats;
        self
    }
}

impl Default for Dates {
    fn default() -> Self {
        Self::new("date")
    }
}

impl Middleware for Dates {
    fn name(&self) -> &str {
        "dates"
    }

    fn apply(&self, files: &mut FileSet, _ctx: &mut Context) -> Result<(), MiddlewareError> {
        for doc in files.iter_mut() {
            let parsed = match doc.get(&self.field) {
                None | Some(Value::DateTime(_)) => continue,
                Some(value) => {
                    let text = value.to_string();
                    parse_date(&text, self.formats.as_slice()).ok_or_else(|| {
                        MiddlewareError::InvalidDate {
                            filename: doc.filename().to_string(),
                            field: self.field.clone(),
                            value: text,
                        }
                    })?
                }
            };
            doc.set(self.field.clone(), parsed);
        }
        Ok(())
    }
}
