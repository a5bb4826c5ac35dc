//! Document model and text normalization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fetched document, immutable for the duration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Value,
}

impl Document {
    /// Build a document with normalized text (see [`normalize_text`]).
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        text: impl AsRef<str>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: normalize_text(text.as_ref()),
            metadata: Value::Null,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Normalize raw document text: strip a UTF-8 BOM, convert CRLF/CR line
/// endings to LF, and trim trailing whitespace from each line.
pub fn normalize_text(raw: &str) -> String {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    for (i, line) in unified.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.trim_end());
    }
    out
}
