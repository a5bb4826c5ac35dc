//! Shared small types: knowledge-base coordinates, pipeline stages, and
//! document references.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A coordinate in the target knowledge base, such as `#2-3-1`.
///
/// Coordinates are stored normalized with a leading `#`; construction from
/// any raw string form (`"2-3"`, `" #2-3 "`) yields the same value, so
/// comparisons and map keys never need to re-normalize.
///
/// # Examples
///
/// ```
/// use coordscribe::types::Coordinate;
///
/// let a = Coordinate::new("5-2");
/// let b = Coordinate::new("#5-2");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "#5-2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coordinate(String);

impl Coordinate {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.starts_with('#') {
            Self(trimmed.to_owned())
        } else {
            Self(format!("#{trimmed}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Coordinate {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Coordinate {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

static COORDINATE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\d+(?:-\d+)*").expect("coordinate pattern is valid"));

/// Scan free text for coordinate references (`#2`, `#2-3-1`, ...).
///
/// Returns each distinct coordinate once, in order of first appearance.
pub fn coordinate_refs(text: &str) -> Vec<Coordinate> {
    let mut seen: Vec<Coordinate> = Vec::new();
    for found in COORDINATE_REF.find_iter(text) {
        let coordinate = Coordinate::new(found.as_str());
        if !seen.contains(&coordinate) {
            seen.push(coordinate);
        }
    }
    seen
}

/// The five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    ChunkAndSync,
    Extract,
    Synthesize,
    GeneratePayload,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::ChunkAndSync => "chunk_and_sync",
            Stage::Extract => "extract",
            Stage::Synthesize => "synthesize",
            Stage::GeneratePayload => "generate_payload",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a pipeline run names the document it should analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentRef {
    /// A stored document addressed by its id.
    Id { id: String },
    /// A file on disk, relative to the source's root.
    Path { path: String },
    /// Content supplied directly by the caller.
    Inline { title: String, text: String },
}

impl DocumentRef {
    pub fn describe(&self) -> String {
        match self {
            DocumentRef::Id { id } => format!("document {id}"),
            DocumentRef::Path { path } => format!("file {path}"),
            DocumentRef::Inline { title, .. } => format!("inline content \"{title}\""),
        }
    }
}
