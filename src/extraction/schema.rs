//! Extraction result schema and the single normalization pass.
//!
//! Model responses arrive in loosely camelCased shapes with optional fields
//! and the occasional bare-string elaboration. Everything is normalized
//! exactly once, right after parsing: missing containers become empty,
//! confidences are clamped to `[0, 1]`, coordinates gain their `#` prefix,
//! and string elaborations are lifted into the structured shape. Downstream
//! code never null-checks.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Coordinate;

fn default_confidence() -> f64 {
    0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Identified,
    #[default]
    Potential,
    #[serde(other)]
    Speculative,
}

impl fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingStatus::Identified => "identified",
            MappingStatus::Potential => "potential",
            MappingStatus::Speculative => "speculative",
        };
        f.write_str(s)
    }
}

/// A semantic mapping from document content onto a knowledge-base concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub kind: String,
    pub value: String,
    pub confidence: f64,
    pub status: MappingStatus,
    pub reasoning: String,
    pub target_coordinate: Option<Coordinate>,
    /// How many chunks produced this mapping; maintained by consolidation.
    pub occurrences: u32,
}

/// A tension, contradiction, or open question surfaced by a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub variation_type: String,
    pub text: String,
    pub proposed_resolution: String,
    pub status: String,
}

/// Free elaboration anchored to a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elaboration {
    pub elaboration_type: String,
    pub text: String,
    pub target_coordinate: Coordinate,
    pub confidence: f64,
}

/// Fully normalized extraction output for one chunk (or, in single-unit
/// mode, the whole document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub chunk_index: usize,
    pub mappings: Vec<Mapping>,
    pub variations: Vec<Variation>,
    pub elaborations: Vec<Elaboration>,
    pub tags: Vec<String>,
    /// Analytical-lens observations, kept as free-form JSON for audit.
    pub lens_insights: Value,
    /// The unparsed response, retained only on parse failure.
    pub raw_text: Option<String>,
    pub is_error: bool,
}

impl ExtractionResult {
    /// Placeholder for a chunk whose response could not be parsed. Keeps
    /// index alignment intact; the raw response is retained for diagnosis.
    pub fn error_placeholder(chunk_index: usize, raw: impl Into<String>) -> Self {
        Self {
            chunk_index,
            mappings: Vec::new(),
            variations: Vec::new(),
            elaborations: Vec::new(),
            tags: Vec::new(),
            lens_insights: Value::Null,
            raw_text: Some(raw.into()),
            is_error: true,
        }
    }

    /// Normalize one parsed response value into a result. Unusable entries
    /// inside lists are dropped rather than failing the chunk; a value that
    /// is not an object at all becomes an error placeholder.
    pub fn from_value(value: Value, chunk_index: usize, default_target: &Coordinate) -> Self {
        let raw: RawExtraction = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(_) => return Self::error_placeholder(chunk_index, value.to_string()),
        };

        let mappings = raw
            .mappings
            .into_iter()
            .filter_map(normalize_mapping)
            .collect();
        let variations = raw
            .variations
            .into_iter()
            .filter_map(normalize_variation)
            .collect();
        let elaborations = raw
            .elaborations
            .into_iter()
            .filter_map(|entry| normalize_elaboration(entry, default_target))
            .collect();

        let mut lens_insights = match raw.lens_insights {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("insights".to_owned(), other);
                map
            }
        };
        // Document-level fields from single-unit responses ride along here.
        if let Some(summary) = raw.summary {
            lens_insights.insert("summary".to_owned(), Value::String(summary));
        }
        if !raw.themes.is_empty() {
            lens_insights.insert(
                "themes".to_owned(),
                Value::Array(raw.themes.into_iter().map(Value::String).collect()),
            );
        }
        let lens_insights = if lens_insights.is_empty() {
            Value::Null
        } else {
            Value::Object(lens_insights)
        };

        Self {
            chunk_index,
            mappings,
            variations,
            elaborations,
            tags: raw.tags,
            lens_insights,
            raw_text: None,
            is_error: false,
        }
    }
}

/// Loose wire shape; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExtraction {
    mappings: Vec<Value>,
    #[serde(alias = "identifiedVariations")]
    variations: Vec<Value>,
    #[serde(alias = "naturalElaborations")]
    elaborations: Vec<Value>,
    tags: Vec<String>,
    #[serde(alias = "lensInsights", alias = "mefLensInsights")]
    lens_insights: Value,
    summary: Option<String>,
    themes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMapping {
    #[serde(alias = "mappingType")]
    kind: String,
    #[serde(alias = "mappingValue")]
    value: String,
    #[serde(alias = "confidenceScore", default = "default_confidence")]
    confidence: f64,
    status: MappingStatus,
    reasoning: String,
    #[serde(alias = "targetCoordinate")]
    target_coordinate: Option<String>,
}

fn normalize_mapping(entry: Value) -> Option<Mapping> {
    let raw: RawMapping = serde_json::from_value(entry).ok()?;
    let kind = raw.kind.trim().to_owned();
    let value = raw.value.trim().to_owned();
    if kind.is_empty() || value.is_empty() {
        return None;
    }
    Some(Mapping {
        kind,
        value,
        confidence: raw.confidence.clamp(0.0, 1.0),
        status: raw.status,
        reasoning: raw.reasoning.trim().to_owned(),
        target_coordinate: raw
            .target_coordinate
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Coordinate::new),
        occurrences: 1,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVariation {
    #[serde(alias = "variationType")]
    variation_type: String,
    #[serde(alias = "variationText")]
    text: String,
    #[serde(alias = "proposedResolution")]
    proposed_resolution: String,
    status: String,
}

fn normalize_variation(entry: Value) -> Option<Variation> {
    let raw: RawVariation = serde_json::from_value(entry).ok()?;
    let text = raw.text.trim().to_owned();
    if text.is_empty() {
        return None;
    }
    Some(Variation {
        variation_type: non_empty_or(raw.variation_type, "unspecified"),
        text,
        proposed_resolution: raw.proposed_resolution.trim().to_owned(),
        status: non_empty_or(raw.status, "open"),
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawElaboration {
    Structured {
        #[serde(alias = "elaborationType", default)]
        elaboration_type: String,
        #[serde(alias = "elaborationText", alias = "content")]
        text: String,
        #[serde(alias = "targetCoordinate", default)]
        target_coordinate: Option<String>,
        #[serde(alias = "confidenceScore", default = "default_confidence")]
        confidence: f64,
    },
    Text(String),
}

fn normalize_elaboration(entry: Value, default_target: &Coordinate) -> Option<Elaboration> {
    let raw: RawElaboration = serde_json::from_value(entry).ok()?;
    let (elaboration_type, text, target, confidence) = match raw {
        RawElaboration::Structured {
            elaboration_type,
            text,
            target_coordinate,
            confidence,
        } => (elaboration_type, text, target_coordinate, confidence),
        RawElaboration::Text(text) => (String::new(), text, None, default_confidence()),
    };
    let text = text.trim().to_owned();
    if text.is_empty() {
        return None;
    }
    Some(Elaboration {
        elaboration_type: non_empty_or(elaboration_type, "general"),
        text,
        target_coordinate: target
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Coordinate::new)
            .unwrap_or_else(|| default_target.clone()),
        confidence: confidence.clamp(0.0, 1.0),
    })
}

fn non_empty_or(value: String, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_owned()
    } else {
        trimmed.to_owned()
    }
}
