//! Synthesis over consolidated extraction results.
//!
//! Two model calls. The first produces the narrative synthesis and is
//! hard-validated: an empty narrative is a fatal [`PipelineError::Synthesis`].
//! The second distills core elements and relational properties; at least one
//! core element is required. An "ACTIONABLE SUMMARY" section, when the
//! narrative contains one, is lifted out for the artifact properties.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::consolidate::Consolidated;
use crate::document::Document;
use crate::error::PipelineError;
use crate::extraction::parse::recover_json;
use crate::extraction::prompts;
use crate::providers::extractor::{GenerationParams, PromptKind, SemanticExtractor};
use crate::types::Coordinate;

/// A distilled element of the document's contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreElement {
    pub element_type: String,
    pub content: String,
}

/// Named relational collections describing how the analysis connects into
/// the knowledge base. Append-only; never pruned after synthesis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationalProperties {
    pub operators: Vec<String>,
    pub essence_concepts: Vec<String>,
    pub anchor_symbols: Vec<String>,
    pub framework_relations: Vec<String>,
}

impl RelationalProperties {
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
            && self.essence_concepts.is_empty()
            && self.anchor_symbols.is_empty()
            && self.framework_relations.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisOutput {
    pub narrative: String,
    pub core_elements: Vec<CoreElement>,
    pub relational: RelationalProperties,
    pub actionable_summary: Option<String>,
}

pub struct Synthesizer {
    extractor: Arc<dyn SemanticExtractor>,
    narrative_params: GenerationParams,
}

impl Synthesizer {
    pub fn new(extractor: Arc<dyn SemanticExtractor>) -> Self {
        Self {
            extractor,
            narrative_params: GenerationParams::EXPANSIVE,
        }
    }

    pub async fn synthesize(
        &self,
        document: &Document,
        consolidated: &Consolidated,
        target: &Coordinate,
    ) -> Result<SynthesisOutput, PipelineError> {
        let (system, user) = prompts::synthesis_prompts(document, consolidated, target);
        let narrative = self
            .extractor
            .generate(PromptKind::Synthesis, &system, &user, self.narrative_params)
            .await?
            .trim()
            .to_owned();
        if narrative.is_empty() {
            return Err(PipelineError::synthesis(
                "model returned an empty synthesis narrative",
            ));
        }
        debug!(narrative_len = narrative.len(), "narrative synthesis complete");

        let (system, user) = prompts::core_element_prompts(&narrative, consolidated, target);
        let raw = self
            .extractor
            .generate(
                PromptKind::CoreElements,
                &system,
                &user,
                GenerationParams::ANALYTICAL,
            )
            .await?;
        let (core_elements, relational) = parse_structured(&raw)?;

        let actionable_summary = extract_actionable_summary(&narrative);
        if actionable_summary.is_none() {
            warn!("narrative contains no actionable summary section");
        }

        Ok(SynthesisOutput {
            narrative,
            core_elements,
            relational,
            actionable_summary,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStructured {
    #[serde(alias = "coreElements")]
    core_elements: Vec<Value>,
    #[serde(alias = "relationalProperties")]
    relational_properties: RawRelational,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRelational {
    operators: Vec<Value>,
    #[serde(alias = "essenceConcepts")]
    essence_concepts: Vec<Value>,
    #[serde(alias = "anchorSymbols")]
    anchor_symbols: Vec<Value>,
    #[serde(alias = "frameworkRelations")]
    framework_relations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameEntry {
    Named { name: String },
    Plain(String),
}

fn names(entries: Vec<Value>) -> Vec<String> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<NameEntry>(entry).ok()? {
            NameEntry::Named { name } => Some(name),
            NameEntry::Plain(name) => Some(name),
        })
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawCoreElement {
    #[serde(alias = "elementType", default)]
    element_type: String,
    content: String,
}

fn parse_structured(
    raw: &str,
) -> Result<(Vec<CoreElement>, RelationalProperties), PipelineError> {
    let value = recover_json(raw).ok_or_else(|| {
        PipelineError::synthesis("core-elements response was not parseable JSON")
    })?;
    let parsed: RawStructured = serde_json::from_value(value)
        .map_err(|e| PipelineError::synthesis(format!("core-elements shape invalid: {e}")))?;

    let core_elements: Vec<CoreElement> = parsed
        .core_elements
        .into_iter()
        .filter_map(|entry| {
            let raw: RawCoreElement = serde_json::from_value(entry).ok()?;
            let content = raw.content.trim().to_owned();
            if content.is_empty() {
                return None;
            }
            Some(CoreElement {
                element_type: if raw.element_type.trim().is_empty() {
                    "insight".to_owned()
                } else {
                    raw.element_type.trim().to_owned()
                },
                content,
            })
        })
        .collect();

    if core_elements.is_empty() {
        return Err(PipelineError::synthesis(
            "synthesis produced no core elements",
        ));
    }

    let relational = RelationalProperties {
        operators: names(parsed.relational_properties.operators),
        essence_concepts: names(parsed.relational_properties.essence_concepts),
        anchor_symbols: names(parsed.relational_properties.anchor_symbols),
        framework_relations: names(parsed.relational_properties.framework_relations),
    };
    Ok((core_elements, relational))
}

static ACTIONABLE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^#{0,6}\s*\**\s*actionable\s+summary\s*:?\s*\**\s*$")
        .expect("heading pattern is valid")
});

/// Lift the text under an "ACTIONABLE SUMMARY" heading, up to the next
/// heading or the end of the narrative.
fn extract_actionable_summary(narrative: &str) -> Option<String> {
    let mut collecting = false;
    let mut collected: Vec<&str> = Vec::new();
    for line in narrative.lines() {
        if ACTIONABLE_HEADING.is_match(line.trim()) {
            collecting = true;
            continue;
        }
        if collecting {
            if line.trim_start().starts_with('#') {
                break;
            }
            collected.push(line);
        }
    }
    let text = collected.join("\n").trim().to_owned();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actionable_summary_is_extracted_up_to_next_heading() {
        let narrative = "## Findings\nlots of prose\n\n## ACTIONABLE SUMMARY\n- do X\n- do Y\n\n## Appendix\nmore";
        let summary = extract_actionable_summary(narrative).unwrap();
        assert_eq!(summary, "- do X\n- do Y");
    }

    #[test]
    fn actionable_summary_heading_variants_match() {
        for heading in ["ACTIONABLE SUMMARY", "### Actionable Summary:", "**Actionable summary**"] {
            let narrative = format!("intro\n{heading}\nitem one");
            assert_eq!(
                extract_actionable_summary(&narrative).as_deref(),
                Some("item one"),
                "failed for {heading}"
            );
        }
    }

    #[test]
    fn missing_actionable_summary_is_none() {
        assert!(extract_actionable_summary("just prose").is_none());
    }

    #[test]
    fn structured_parse_accepts_strings_and_named_objects() {
        let raw = json!({
            "core_elements": [
                {"element_type": "definition", "content": "what recursion is"},
                {"content": "typed fallback"}
            ],
            "relational_properties": {
                "operators": ["contains", {"name": "refines"}],
                "essenceConcepts": ["self-reference"],
                "anchor_symbols": [],
                "framework_relations": [{"name": ""}]
            }
        })
        .to_string();
        let (elements, relational) = parse_structured(&raw).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].element_type, "insight");
        assert_eq!(relational.operators, vec!["contains", "refines"]);
        assert_eq!(relational.essence_concepts, vec!["self-reference"]);
        assert!(relational.framework_relations.is_empty());
    }

    #[test]
    fn zero_core_elements_is_fatal() {
        let raw = json!({"core_elements": [], "relational_properties": {}}).to_string();
        let err = parse_structured(&raw).unwrap_err();
        assert!(matches!(err, PipelineError::Synthesis { .. }));
    }

    #[test]
    fn unparseable_structured_response_is_fatal() {
        let err = parse_structured("no json").unwrap_err();
        assert!(matches!(err, PipelineError::Synthesis { .. }));
    }
}
