//! Knowledge-graph context retrieval.
//!
//! The pipeline asks a [`GraphContextProvider`] for the neighborhood of the
//! run's target coordinate. The resulting [`GraphContext`] feeds the
//! analysis-mode context windows; when retrieval fails the orchestrator
//! degrades to an empty context with a warning rather than aborting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::Coordinate;

/// A single node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub coordinate: Coordinate,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl GraphNode {
    pub fn new(coordinate: impl Into<Coordinate>, name: impl Into<String>) -> Self {
        Self {
            coordinate: coordinate.into(),
            name: name.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The neighborhood of a target coordinate, plus any coordinate-logic notes
/// the provider attaches for the target's position in the structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphContext {
    #[serde(default)]
    pub focus: Option<GraphNode>,
    #[serde(default)]
    pub direct: Vec<GraphNode>,
    #[serde(default)]
    pub parents: Vec<GraphNode>,
    #[serde(default)]
    pub siblings: Vec<GraphNode>,
    #[serde(default)]
    pub logic_notes: Vec<String>,
}

impl GraphContext {
    pub fn is_empty(&self) -> bool {
        self.focus.is_none()
            && self.direct.is_empty()
            && self.parents.is_empty()
            && self.siblings.is_empty()
            && self.logic_notes.is_empty()
    }

    /// Every coordinate mentioned anywhere in the context, deduplicated in
    /// first-seen order.
    pub fn mentioned_coordinates(&self) -> Vec<Coordinate> {
        let mut seen: Vec<Coordinate> = Vec::new();
        let nodes = self
            .focus
            .iter()
            .chain(&self.direct)
            .chain(&self.parents)
            .chain(&self.siblings);
        for node in nodes {
            if !seen.contains(&node.coordinate) {
                seen.push(node.coordinate.clone());
            }
        }
        seen
    }

    /// Render the neighborhood as prompt-ready text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(focus) = &self.focus {
            out.push_str("Target node:\n");
            render_node(&mut out, focus);
        }
        for (label, nodes) in [
            ("Directly related", &self.direct),
            ("Parent nodes", &self.parents),
            ("Sibling nodes", &self.siblings),
        ] {
            if !nodes.is_empty() {
                out.push_str(label);
                out.push_str(":\n");
                for node in nodes {
                    render_node(&mut out, node);
                }
            }
        }
        if !self.logic_notes.is_empty() {
            out.push_str("Structural notes:\n");
            for note in &self.logic_notes {
                out.push_str("- ");
                out.push_str(note);
                out.push('\n');
            }
        }
        out
    }
}

fn render_node(out: &mut String, node: &GraphNode) {
    out.push_str("- ");
    out.push_str(node.coordinate.as_str());
    out.push(' ');
    out.push_str(&node.name);
    if let Some(description) = &node.description {
        out.push_str(": ");
        out.push_str(description);
    }
    out.push('\n');
}

/// Retrieves the knowledge-graph neighborhood of a coordinate.
#[async_trait]
pub trait GraphContextProvider: Send + Sync {
    /// Fetch the subgraph around `target`, following relations up to `depth`
    /// hops out.
    async fn relevant_subgraph(
        &self,
        target: &Coordinate,
        depth: u8,
    ) -> Result<GraphContext, PipelineError>;
}
