// SPDX-License-Identifier: MIT

//! Workflow diagram description
//!
//! The diagram is a plain node/edge description that a renderer can lay out.
//! Nodes are the distinct states appearing in the transitions, each decorated
//! with its [`Indicator`]; edges are the transitions themselves.
//!
//! # Example Output
//!
//! ```text
//! stateDiagram-v2
//!     draft : Draft ✓
//!     pending : Pending ?
//!     approved : Approved
//!     draft --> pending : Submit
//!     pending --> approved : Approve ⚙️
//! ```

use serde::Serialize;
use std::collections::HashSet;

use super::progress::{classify, Indicator};
use super::types::{StateHistoryEntry, Transition};

/// Marker appended to labels of conditional edges
pub const CONDITION_MARKER: &str = "⚙️";

/// A state box in the diagram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramNode {
    /// Stable identifier derived from the label
    pub id: String,
    pub label: String,
    pub indicator: Indicator,
}

impl DiagramNode {
    /// Label followed by the indicator glyph, if any
    pub fn decorated_label(&self) -> String {
        match self.indicator {
            Indicator::None => self.label.clone(),
            other => format!("{} {}", self.label, other.glyph()),
        }
    }
}

/// A transition arrow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramEdge {
    pub source: String,
    pub target: String,
    pub action: String,
    pub conditional: bool,
    pub allowed: Option<String>,
}

impl DiagramEdge {
    pub fn label(&self) -> String {
        if self.conditional {
            format!("{} {}", self.action, CONDITION_MARKER)
        } else {
            self.action.clone()
        }
    }
}

/// Nodes and edges for one document's workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowDiagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

/// Lowercased label with each run of whitespace replaced by `-`
pub fn node_id(label: &str) -> String {
    let mut id = String::with_capacity(label.len());
    let mut in_space = false;
    for c in label.chars() {
        if c.is_whitespace() {
            if !in_space {
                id.push('-');
            }
            in_space = true;
        } else {
            id.extend(c.to_lowercase());
            in_space = false;
        }
    }
    id
}

impl WorkflowDiagram {
    /// Build the diagram for `transitions`, classifying each state against `history`
    pub fn build(transitions: &[Transition], history: &[StateHistoryEntry]) -> Self {
        let mut seen = HashSet::new();
        let mut labels = Vec::new();
        for t in transitions {
            for state in [&t.state, &t.next_state] {
                if seen.insert(state.as_str()) {
                    labels.push(state.as_str());
                }
            }
        }

        let nodes = labels
            .into_iter()
            .map(|label| DiagramNode {
                id: node_id(label),
                label: label.to_string(),
                indicator: classify(label, history, transitions),
            })
            .collect();

        let edges = transitions
            .iter()
            .map(|t| DiagramEdge {
                source: node_id(&t.state),
                target: node_id(&t.next_state),
                action: t.action.clone(),
                conditional: t.guard().is_some(),
                allowed: t.allowed.clone(),
            })
            .collect();

        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Generate a Mermaid state diagram.
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["stateDiagram-v2".to_string()];

        for n in &self.nodes {
            lines.push(format!("    {} : {}", n.id, n.decorated_label()));
        }
        for e in &self.edges {
            let label = e.label();
            if label.is_empty() {
                lines.push(format!("    {} --> {}", e.source, e.target));
            } else {
                lines.push(format!("    {} --> {} : {}", e.source, e.target, label));
            }
        }

        lines.join("\n")
    }

    /// Generate a DOT graph for Graphviz.
    pub fn to_dot(&self) -> String {
        let mut lines = vec![
            "digraph workflow {".to_string(),
            "    rankdir=LR;".to_string(),
            "    node [shape=box];".to_string(),
            String::new(),
        ];

        for n in &self.nodes {
            let color = match n.indicator {
                Indicator::ReachedPositive => "green",
                Indicator::ReachedNegative => "red",
                Indicator::Reachable => "orange",
                Indicator::None => "black",
            };
            lines.push(format!(
                "    \"{}\" [label=\"{}\", color={}];",
                n.id,
                escape_dot(&n.decorated_label()),
                color
            ));
        }
        if !self.edges.is_empty() {
            lines.push(String::new());
        }
        for e in &self.edges {
            lines.push(format!(
                "    \"{}\" -> \"{}\" [label=\"{}\"];",
                e.source,
                e.target,
                escape_dot(&e.label())
            ));
        }

        lines.push("}".to_string());
        lines.join("\n")
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
