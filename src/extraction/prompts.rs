//! Prompt assembly for every model call the pipeline makes.
//!
//! Each function returns `(system, user)`. The response formats described
//! here are the shapes [`crate::extraction::schema`] normalizes from, so
//! keep the two in sync when changing either.

use crate::chunking::chunker::Chunk;
use crate::chunking::window::smart_truncate;
use crate::consolidate::Consolidated;
use crate::document::Document;
use crate::synthesis::SynthesisOutput;
use crate::types::Coordinate;

/// Per-chunk budget for the window text included alongside each chunk body.
const CHUNK_CONTEXT_BUDGET: usize = 600;

const MAPPING_FIELDS: &str = r#"each mapping object has: "kind", "value", "confidence" (0..1), "status" ("identified" | "potential" | "speculative"), "reasoning", and optionally "target_coordinate""#;

fn extraction_schema_instructions() -> String {
    format!(
        "Respond with JSON only. Each result object has these fields:\n\
         - \"mappings\": array; {MAPPING_FIELDS}\n\
         - \"variations\": array of objects with \"variation_type\", \"text\", \
           \"proposed_resolution\", \"status\"\n\
         - \"elaborations\": array of objects with \"elaboration_type\", \"text\", \
           \"target_coordinate\", \"confidence\"\n\
         - \"tags\": array of short strings\n\
         - \"lens_insights\": object of analytical-lens observations\n\
         Omit fields you have nothing for. Do not add commentary outside the JSON."
    )
}

/// Batched per-chunk extraction: one call, one result object per chunk, in
/// chunk order.
pub(crate) fn batch_prompts(chunks: &[Chunk], target: &Coordinate) -> (String, String) {
    let system = format!(
        "You are a semantic analyst for a coordinate-indexed knowledge base. \
         Analyze each numbered chunk against target coordinate {target}: identify \
         mappings onto knowledge-base concepts, variations (tensions, contradictions, \
         open questions), elaborations, and tags.\n\n\
         {}\n\nReturn a JSON array with exactly {} result objects, one per chunk, \
         in the order given.",
        extraction_schema_instructions(),
        chunks.len()
    );

    let mut user = String::new();
    for chunk in chunks {
        user.push_str(&format!("--- Chunk {} ---\n", chunk.index + 1));
        user.push_str("Context:\n");
        user.push_str(&smart_truncate(
            &chunk.window.context_text,
            CHUNK_CONTEXT_BUDGET,
        ));
        user.push_str("\n\nText:\n");
        user.push_str(&chunk.text);
        user.push_str("\n\n");
    }
    (system, user)
}

/// Single-unit extraction: the whole document in one call, one result object.
pub(crate) fn single_unit_prompts(
    document: &Document,
    chunks: &[Chunk],
    target: &Coordinate,
) -> (String, String) {
    let system = format!(
        "You are a semantic analyst for a coordinate-indexed knowledge base. \
         Analyze the document as a whole against target coordinate {target}.\n\n\
         {}\n\nAdditionally include \"summary\" (string) and \"themes\" (array of \
         strings) for the whole document. Return one JSON object.",
        extraction_schema_instructions()
    );

    let mut user = String::new();
    if !chunks.is_empty() {
        user.push_str("Aggregated chunk context:\n");
        for chunk in chunks {
            user.push_str(&format!("[chunk {}]\n", chunk.index + 1));
            user.push_str(&smart_truncate(
                &chunk.window.context_text,
                CHUNK_CONTEXT_BUDGET,
            ));
            user.push_str("\n\n");
        }
    }
    user.push_str(&format!("--- Document: {} ---\n{}\n", document.title, document.text));
    (system, user)
}

/// First synthesis call: a long-form narrative over the consolidated results.
pub(crate) fn synthesis_prompts(
    document: &Document,
    consolidated: &Consolidated,
    target: &Coordinate,
) -> (String, String) {
    let system = format!(
        "You are synthesizing a document analysis for knowledge-base coordinate \
         {target}. Write a coherent narrative synthesis in markdown: what the \
         document establishes, how its findings relate to the coordinate, and what \
         remains unresolved. End with a section headed \"ACTIONABLE SUMMARY\" \
         listing concrete follow-ups."
    );

    let mut user = format!("Document: {}\n\n", document.title);
    user.push_str(&render_consolidated(consolidated));
    (system, user)
}

/// Second synthesis call: structured core elements and relational properties.
pub(crate) fn core_element_prompts(
    narrative: &str,
    consolidated: &Consolidated,
    target: &Coordinate,
) -> (String, String) {
    let system = format!(
        "Distill the analysis for coordinate {target} into structured form. \
         Respond with JSON only: an object with\n\
         - \"core_elements\": array of objects with \"element_type\" and \"content\" \
           (at least one element)\n\
         - \"relational_properties\": object with \"operators\", \"essence_concepts\", \
           \"anchor_symbols\", \"framework_relations\", each an array of names \
           (strings, or objects with a \"name\" field)."
    );

    let mut user = String::from("Narrative synthesis:\n");
    user.push_str(narrative);
    user.push_str("\n\n");
    user.push_str(&render_consolidated(consolidated));
    (system, user)
}

/// Final call: the perspective narrative included in the artifact.
pub(crate) fn perspective_prompts(
    document: &Document,
    synthesis: &SynthesisOutput,
    target: &Coordinate,
) -> (String, String) {
    let system = format!(
        "Write the knowledge base's own perspective on this analysis: what the \
         findings mean from the vantage point of coordinate {target}, in two to \
         four paragraphs of plain prose. No JSON, no headings."
    );

    let mut user = format!("Document: {}\n\nSynthesis:\n{}\n", document.title, synthesis.narrative);
    if !synthesis.core_elements.is_empty() {
        user.push_str("\nCore elements:\n");
        for element in &synthesis.core_elements {
            user.push_str(&format!("- {}: {}\n", element.element_type, element.content));
        }
    }
    (system, user)
}

fn render_consolidated(consolidated: &Consolidated) -> String {
    let mut out = String::new();
    if !consolidated.mappings.is_empty() {
        out.push_str("Consolidated mappings:\n");
        for mapping in &consolidated.mappings {
            out.push_str(&format!(
                "- {} / {} (confidence {:.2}, seen {}x)",
                mapping.kind, mapping.value, mapping.confidence, mapping.occurrences
            ));
            if let Some(coordinate) = &mapping.target_coordinate {
                out.push_str(&format!(" -> {coordinate}"));
            }
            out.push('\n');
        }
    }
    if !consolidated.variations.is_empty() {
        out.push_str("\nVariations:\n");
        for variation in &consolidated.variations {
            out.push_str(&format!(
                "- [{}] {} (status: {})\n",
                variation.variation_type, variation.text, variation.status
            ));
        }
    }
    if !consolidated.tags.is_empty() {
        out.push_str(&format!("\nTags: {}\n", consolidated.tags.join(", ")));
    }
    out
}
