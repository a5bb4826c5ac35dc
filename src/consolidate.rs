//! Cross-chunk consolidation of extraction results.
//!
//! Mappings are grouped by `(kind, value, target_coordinate)`. A merged
//! mapping keeps the maximum confidence seen (and that observation's
//! status), counts occurrences, and concatenates distinct reasonings with
//! `" | "`. Variations and tags deduplicate on exact keys, first seen wins.
//! Output order is first-appearance order, so consolidation is fully
//! deterministic. The untouched per-chunk results are retained for audit.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::extraction::schema::{ExtractionResult, Mapping, Variation};
use crate::types::Coordinate;

#[derive(Debug, Clone, Serialize)]
pub struct Consolidated {
    pub mappings: Vec<Mapping>,
    pub variations: Vec<Variation>,
    pub tags: Vec<String>,
    /// The per-chunk inputs, unchanged.
    pub per_chunk: Vec<ExtractionResult>,
}

type MappingKey = (String, String, Option<Coordinate>);

pub fn consolidate(results: Vec<ExtractionResult>) -> Consolidated {
    let mut mapping_order: Vec<MappingKey> = Vec::new();
    let mut merged: FxHashMap<MappingKey, Mapping> = FxHashMap::default();

    let mut variations: Vec<Variation> = Vec::new();
    let mut variation_keys: FxHashSet<(String, String)> = FxHashSet::default();

    let mut tags: Vec<String> = Vec::new();
    let mut tag_keys: FxHashSet<String> = FxHashSet::default();

    for result in &results {
        for mapping in &result.mappings {
            let key = (
                mapping.kind.clone(),
                mapping.value.clone(),
                mapping.target_coordinate.clone(),
            );
            match merged.get_mut(&key) {
                Some(existing) => {
                    existing.occurrences += 1;
                    if mapping.confidence > existing.confidence {
                        existing.confidence = mapping.confidence;
                        existing.status = mapping.status;
                    }
                    merge_reasoning(&mut existing.reasoning, &mapping.reasoning);
                }
                None => {
                    mapping_order.push(key.clone());
                    merged.insert(key, mapping.clone());
                }
            }
        }

        for variation in &result.variations {
            let key = (variation.variation_type.clone(), variation.text.clone());
            if variation_keys.insert(key) {
                variations.push(variation.clone());
            }
        }

        for tag in &result.tags {
            if tag_keys.insert(tag.clone()) {
                tags.push(tag.clone());
            }
        }
    }

    let mappings = mapping_order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect();

    Consolidated {
        mappings,
        variations,
        tags,
        per_chunk: results,
    }
}

fn merge_reasoning(existing: &mut String, incoming: &str) {
    if incoming.is_empty() || existing.split(" | ").any(|part| part == incoming) {
        return;
    }
    if existing.is_empty() {
        existing.push_str(incoming);
    } else {
        existing.push_str(" | ");
        existing.push_str(incoming);
    }
}
