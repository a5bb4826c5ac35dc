//! Final artifact assembly and validation.
//!
//! One last model call produces the perspective narrative, then the
//! artifact is assembled from the synthesis and consolidated results.
//! Validation is strict: an artifact with an empty title, no properties, or
//! no non-empty content block is never returned.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::consolidate::Consolidated;
use crate::document::Document;
use crate::error::PipelineError;
use crate::extraction::prompts;
use crate::ingestion::push::IngestionReport;
use crate::providers::extractor::{GenerationParams, PromptKind, SemanticExtractor};
use crate::synthesis::SynthesisOutput;
use crate::types::Coordinate;

/// One titled section of the artifact body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: String,
}

/// The pipeline's final output, bound to a target coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisArtifact {
    pub target_coordinate: Coordinate,
    pub title: String,
    pub properties: Map<String, Value>,
    pub content_blocks: Vec<ContentBlock>,
    /// Mapping targets other than the primary coordinate, sorted.
    pub related_coordinates: Vec<Coordinate>,
    pub generated_at: DateTime<Utc>,
}

pub struct PayloadGenerator {
    extractor: Arc<dyn SemanticExtractor>,
    params: GenerationParams,
}

impl PayloadGenerator {
    pub fn new(extractor: Arc<dyn SemanticExtractor>) -> Self {
        Self {
            extractor,
            params: GenerationParams::EXPANSIVE,
        }
    }

    pub async fn generate(
        &self,
        document: &Document,
        synthesis: &SynthesisOutput,
        consolidated: &Consolidated,
        ingestion: &IngestionReport,
        target: &Coordinate,
    ) -> Result<AnalysisArtifact, PipelineError> {
        let (system, user) = prompts::perspective_prompts(document, synthesis, target);
        let perspective = self
            .extractor
            .generate(PromptKind::Perspective, &system, &user, self.params)
            .await?
            .trim()
            .to_owned();
        if perspective.is_empty() {
            return Err(PipelineError::payload(
                "perspective generation returned empty text",
            ));
        }
        debug!(perspective_len = perspective.len(), "perspective complete");

        let related: BTreeSet<Coordinate> = consolidated
            .mappings
            .iter()
            .filter_map(|m| m.target_coordinate.clone())
            .filter(|coordinate| coordinate != target)
            .collect();
        let related_coordinates: Vec<Coordinate> = related.into_iter().collect();

        let mut properties = Map::new();
        properties.insert("target_coordinate".to_owned(), json!(target));
        properties.insert("mapping_count".to_owned(), json!(consolidated.mappings.len()));
        properties.insert(
            "variation_count".to_owned(),
            json!(consolidated.variations.len()),
        );
        properties.insert(
            "core_element_count".to_owned(),
            json!(synthesis.core_elements.len()),
        );
        properties.insert("ingestion".to_owned(), json!(ingestion));
        if !consolidated.tags.is_empty() {
            properties.insert("tags".to_owned(), json!(consolidated.tags));
        }
        if let Some(summary) = &synthesis.actionable_summary {
            properties.insert("actionable_summary".to_owned(), json!(summary));
        }

        let artifact = AnalysisArtifact {
            target_coordinate: target.clone(),
            title: format!("Analysis: {} @ {}", document.title, target),
            properties,
            content_blocks: build_content_blocks(synthesis, consolidated, &perspective),
            related_coordinates,
            generated_at: Utc::now(),
        };
        validate(&artifact)?;
        Ok(artifact)
    }
}

fn build_content_blocks(
    synthesis: &SynthesisOutput,
    consolidated: &Consolidated,
    perspective: &str,
) -> Vec<ContentBlock> {
    let mut blocks = vec![ContentBlock {
        heading: "Synthesis".to_owned(),
        body: synthesis.narrative.clone(),
    }];

    if !synthesis.core_elements.is_empty() {
        let body = synthesis
            .core_elements
            .iter()
            .map(|e| format!("- {}: {}", e.element_type, e.content))
            .collect::<Vec<_>>()
            .join("\n");
        blocks.push(ContentBlock {
            heading: "Core Elements".to_owned(),
            body,
        });
    }

    if !consolidated.mappings.is_empty() {
        let body = consolidated
            .mappings
            .iter()
            .map(|m| {
                let mut line = format!(
                    "- {}: {} ({}, confidence {:.2}, seen {}x)",
                    m.kind, m.value, m.status, m.confidence, m.occurrences
                );
                if let Some(coordinate) = &m.target_coordinate {
                    line.push_str(&format!(" -> {coordinate}"));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");
        blocks.push(ContentBlock {
            heading: "Mappings".to_owned(),
            body,
        });
    }

    if !consolidated.variations.is_empty() {
        let body = consolidated
            .variations
            .iter()
            .map(|v| {
                let mut line = format!("- [{}] {}", v.variation_type, v.text);
                if !v.proposed_resolution.is_empty() {
                    line.push_str(&format!(" (proposed: {})", v.proposed_resolution));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");
        blocks.push(ContentBlock {
            heading: "Variations".to_owned(),
            body,
        });
    }

    if !synthesis.relational.is_empty() {
        let mut body = String::new();
        for (label, values) in [
            ("Operators", &synthesis.relational.operators),
            ("Essence concepts", &synthesis.relational.essence_concepts),
            ("Anchor symbols", &synthesis.relational.anchor_symbols),
            ("Framework relations", &synthesis.relational.framework_relations),
        ] {
            if !values.is_empty() {
                body.push_str(&format!("{label}: {}\n", values.join(", ")));
            }
        }
        blocks.push(ContentBlock {
            heading: "Relational Properties".to_owned(),
            body: body.trim_end().to_owned(),
        });
    }

    blocks.push(ContentBlock {
        heading: "Perspective".to_owned(),
        body: perspective.to_owned(),
    });
    blocks
}

/// Completeness check for an assembled artifact.
pub fn validate(artifact: &AnalysisArtifact) -> Result<(), PipelineError> {
    if artifact.title.trim().is_empty() {
        return Err(PipelineError::payload("artifact title is empty"));
    }
    if artifact.properties.is_empty() {
        return Err(PipelineError::payload("artifact has no properties"));
    }
    if !artifact
        .content_blocks
        .iter()
        .any(|block| !block.body.trim().is_empty())
    {
        return Err(PipelineError::payload(
            "artifact has no non-empty content block",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::schema::{Mapping, MappingStatus};
    use crate::synthesis::{CoreElement, RelationalProperties};

    fn synthesis() -> SynthesisOutput {
        SynthesisOutput {
            narrative: "narrative body".into(),
            core_elements: vec![CoreElement {
                element_type: "definition".into(),
                content: "what it is".into(),
            }],
            relational: RelationalProperties {
                operators: vec!["contains".into()],
                ..Default::default()
            },
            actionable_summary: Some("- do X".into()),
        }
    }

    fn consolidated_with_targets(targets: &[Option<&str>]) -> Consolidated {
        let mappings = targets
            .iter()
            .enumerate()
            .map(|(i, t)| Mapping {
                kind: "concept".into(),
                value: format!("value-{i}"),
                confidence: 0.8,
                status: MappingStatus::Identified,
                reasoning: String::new(),
                target_coordinate: t.map(Coordinate::new),
                occurrences: 1,
            })
            .collect();
        Consolidated {
            mappings,
            variations: vec![],
            tags: vec!["tag-a".into()],
            per_chunk: vec![],
        }
    }

    fn artifact() -> AnalysisArtifact {
        let mut properties = Map::new();
        properties.insert("k".into(), json!(1));
        AnalysisArtifact {
            target_coordinate: Coordinate::new("#5-2"),
            title: "Analysis: T @ #5-2".into(),
            properties,
            content_blocks: vec![ContentBlock {
                heading: "Synthesis".into(),
                body: "text".into(),
            }],
            related_coordinates: vec![],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn validation_rejects_incomplete_artifacts() {
        let mut empty_title = artifact();
        empty_title.title = "  ".into();
        assert!(matches!(
            validate(&empty_title),
            Err(PipelineError::PayloadValidation { .. })
        ));

        let mut no_properties = artifact();
        no_properties.properties = Map::new();
        assert!(validate(&no_properties).is_err());

        let mut blank_blocks = artifact();
        blank_blocks.content_blocks = vec![ContentBlock {
            heading: "Synthesis".into(),
            body: "   ".into(),
        }];
        assert!(validate(&blank_blocks).is_err());

        assert!(validate(&artifact()).is_ok());
    }

    #[test]
    fn content_blocks_cover_all_populated_sections() {
        let consolidated = consolidated_with_targets(&[Some("#5-2"), Some("#1-1")]);
        let blocks = build_content_blocks(&synthesis(), &consolidated, "the view from here");
        let headings: Vec<&str> = blocks.iter().map(|b| b.heading.as_str()).collect();
        assert_eq!(
            headings,
            vec![
                "Synthesis",
                "Core Elements",
                "Mappings",
                "Relational Properties",
                "Perspective"
            ]
        );
        assert!(blocks[2].body.contains("value-0"));
        assert!(blocks[2].body.contains("-> #1-1"));
    }

    #[tokio::test]
    async fn related_coordinates_exclude_the_primary_target() {
        use async_trait::async_trait;

        struct FixedExtractor;
        #[async_trait]
        impl SemanticExtractor for FixedExtractor {
            async fn generate(
                &self,
                _kind: PromptKind,
                _system: &str,
                _user: &str,
                _params: GenerationParams,
            ) -> Result<String, PipelineError> {
                Ok("a considered perspective".to_owned())
            }
        }

        let generator = PayloadGenerator::new(Arc::new(FixedExtractor));
        let document = Document::new("d1", "Field Notes", "body");
        let consolidated =
            consolidated_with_targets(&[Some("#5-2"), Some("#1-1"), Some("#0-3"), None]);
        let ingestion = IngestionReport {
            attempted: 3,
            succeeded: 3,
            ..Default::default()
        };
        let artifact = generator
            .generate(
                &document,
                &synthesis(),
                &consolidated,
                &ingestion,
                &Coordinate::new("#5-2"),
            )
            .await
            .unwrap();

        assert_eq!(
            artifact.related_coordinates,
            vec![Coordinate::new("#0-3"), Coordinate::new("#1-1")]
        );
        assert_eq!(artifact.title, "Analysis: Field Notes @ #5-2");
        assert_eq!(artifact.properties["mapping_count"], 4);
        assert_eq!(artifact.properties["actionable_summary"], "- do X");
        assert_eq!(artifact.properties["ingestion"]["succeeded"], 3);
        assert_eq!(artifact.properties["ingestion"]["skipped"], false);
        assert!(artifact
            .content_blocks
            .iter()
            .any(|b| b.heading == "Perspective" && b.body == "a considered perspective"));
    }

    #[tokio::test]
    async fn empty_perspective_fails_validation() {
        use async_trait::async_trait;

        struct EmptyExtractor;
        #[async_trait]
        impl SemanticExtractor for EmptyExtractor {
            async fn generate(
                &self,
                _kind: PromptKind,
                _system: &str,
                _user: &str,
                _params: GenerationParams,
            ) -> Result<String, PipelineError> {
                Ok("   ".to_owned())
            }
        }

        let generator = PayloadGenerator::new(Arc::new(EmptyExtractor));
        let document = Document::new("d1", "T", "body");
        let err = generator
            .generate(
                &document,
                &synthesis(),
                &consolidated_with_targets(&[]),
                &IngestionReport::skipped(),
                &Coordinate::new("#5-2"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::PayloadValidation { .. }));
    }
}
